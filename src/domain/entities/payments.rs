use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub borrowing_id: Uuid,
    pub type_: String,
    pub status: String,
    pub session_id: Option<String>,
    pub session_url: Option<String>,
    pub money_to_pay: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row written in the same transaction as the inventory change, before any
/// checkout session exists for it.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub borrowing_id: Uuid,
    pub type_: String,
    pub status: String,
    pub session_id: Option<String>,
    pub session_url: Option<String>,
    pub money_to_pay: Decimal,
}

/// Upsert keyed by (borrowing_id, type): attaches a fresh session and resets
/// the row to pending. A `None` session clears the previous one.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = payments, treat_none_as_null = true)]
pub struct UpsertPaymentSessionEntity {
    pub borrowing_id: Uuid,
    pub type_: String,
    pub status: String,
    pub session_id: Option<String>,
    pub session_url: Option<String>,
    pub money_to_pay: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::{debug_query, insert_into, pg::Pg};
    use rust_decimal_macros::dec;

    #[test]
    fn parking_a_charge_overwrites_the_old_session() {
        let parked = UpsertPaymentSessionEntity {
            borrowing_id: Uuid::new_v4(),
            type_: "fine".to_string(),
            status: "expired".to_string(),
            session_id: None,
            session_url: None,
            money_to_pay: dec!(9.00),
            updated_at: Utc::now(),
        };

        let query = insert_into(payments::table)
            .values(&parked)
            .on_conflict((payments::borrowing_id, payments::type_))
            .do_update()
            .set(&parked);
        let sql = debug_query::<Pg, _>(&query).to_string();

        let (_, update_set) = sql
            .split_once("DO UPDATE SET")
            .expect("upsert renders an update clause");
        assert!(update_set.contains(r#""session_id" = "#), "{sql}");
        assert!(update_set.contains(r#""session_url" = "#), "{sql}");
    }
}
