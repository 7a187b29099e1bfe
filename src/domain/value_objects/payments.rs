use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::{
        borrowings::{BorrowingDto, BorrowingModel},
        enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
    },
};

pub const CANCEL_MESSAGE: &str =
    "Payment can be paid a bit later (the session is available for only 24h).";

/// Largest amount `payments.money_to_pay` (NUMERIC(7, 2)) can hold.
pub const MAX_CHARGE: Decimal = dec!(99999.99);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentModel {
    pub id: Uuid,
    pub borrowing_id: Uuid,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub session_id: Option<String>,
    pub session_url: Option<String>,
    pub money_to_pay: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentModel {
    fn from(value: PaymentEntity) -> Self {
        Self {
            id: value.id,
            borrowing_id: value.borrowing_id,
            payment_type: PaymentType::from_str(&value.type_).unwrap_or(PaymentType::Payment),
            status: PaymentStatus::from_str(&value.status).unwrap_or(PaymentStatus::Expired),
            session_id: value.session_id,
            session_url: value.session_url,
            money_to_pay: value.money_to_pay,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// A charge to record as a session-less pending row alongside a borrow or return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCharge {
    pub payment_type: PaymentType,
    pub money_to_pay: Decimal,
}

impl PendingCharge {
    pub fn to_entity(&self, borrowing_id: Uuid) -> InsertPaymentEntity {
        InsertPaymentEntity {
            borrowing_id,
            type_: self.payment_type.to_string(),
            status: PaymentStatus::Pending.to_string(),
            session_id: None,
            session_url: None,
            money_to_pay: self.money_to_pay,
        }
    }
}

/// Converts a currency amount to the gateway's minor units, rounding half
/// away from zero.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub borrowing_id: Uuid,
    pub session_url: Option<String>,
    pub session_id: Option<String>,
    pub money_to_pay: Decimal,
}

impl From<PaymentModel> for PaymentDto {
    fn from(value: PaymentModel) -> Self {
        Self {
            id: value.id,
            status: value.status,
            payment_type: value.payment_type,
            borrowing_id: value.borrowing_id,
            session_url: value.session_url,
            session_id: value.session_id,
            money_to_pay: value.money_to_pay,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentDetailDto {
    pub id: Uuid,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub borrowing: BorrowingDto,
    pub session_url: Option<String>,
    pub session_id: Option<String>,
    pub money_to_pay: Decimal,
}

impl From<(PaymentModel, BorrowingModel)> for PaymentDetailDto {
    fn from((payment, borrowing): (PaymentModel, BorrowingModel)) -> Self {
        Self {
            id: payment.id,
            status: payment.status,
            payment_type: payment.payment_type,
            borrowing: BorrowingDto::from(borrowing),
            session_url: payment.session_url,
            session_id: payment.session_id,
            money_to_pay: payment.money_to_pay,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentSuccessQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentMessageDto {
    pub message: String,
}

/// Tally of one pass over pending payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub expired: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_round_to_nearest_cent() {
        assert_eq!(to_minor_units(dec!(21.00)), Some(2100));
        assert_eq!(to_minor_units(dec!(9)), Some(900));
        assert_eq!(to_minor_units(dec!(0.125)), Some(13));
    }

    #[test]
    fn unknown_status_is_treated_as_expired() {
        let now = Utc::now();
        let entity = PaymentEntity {
            id: Uuid::new_v4(),
            borrowing_id: Uuid::new_v4(),
            type_: "fine".to_string(),
            status: "garbage".to_string(),
            session_id: None,
            session_url: None,
            money_to_pay: dec!(3),
            created_at: now,
            updated_at: now,
        };

        let model = PaymentModel::from(entity);
        assert_eq!(model.payment_type, PaymentType::Fine);
        assert_eq!(model.status, PaymentStatus::Expired);
    }
}
