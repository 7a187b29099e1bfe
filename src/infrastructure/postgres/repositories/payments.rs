use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::payments::{PaymentEntity, UpsertPaymentSessionEntity},
        repositories::payments::PaymentRepository,
        value_objects::enums::payment_statuses::PaymentStatus,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{borrowings, payments},
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn transition(&self, payment_id: Uuid, to: PaymentStatus) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(payments::table)
            .filter(payments::id.eq(payment_id))
            .filter(payments::status.eq(PaymentStatus::Pending.to_string()))
            .set((
                payments::status.eq(to.to_string()),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(updated == 1)
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn find_outstanding_for_user(&self, user_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .inner_join(borrowings::table)
            .filter(borrowings::user_id.eq(user_id))
            .filter(payments::status.eq_any(vec![
                PaymentStatus::Pending.to_string(),
                PaymentStatus::Expired.to_string(),
            ]))
            .select(PaymentEntity::as_select())
            .order(payments::created_at.asc())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert_session(
        &self,
        upsert_payment_session_entity: UpsertPaymentSessionEntity,
    ) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(payments::table)
            .values(&upsert_payment_session_entity)
            .on_conflict((payments::borrowing_id, payments::type_))
            .do_update()
            .set(&upsert_payment_session_entity)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_pending_by_session_id(&self, session_id: &str) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::session_id.eq(session_id))
            .filter(payments::status.eq(PaymentStatus::Pending.to_string()))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn mark_paid(&self, payment_id: Uuid) -> Result<bool> {
        self.transition(payment_id, PaymentStatus::Paid)
    }

    async fn mark_expired(&self, payment_id: Uuid) -> Result<bool> {
        self.transition(payment_id, PaymentStatus::Expired)
    }

    async fn list_pending(&self) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = payments::table
            .filter(payments::status.eq(PaymentStatus::Pending.to_string()))
            .select(PaymentEntity::as_select())
            .order(payments::created_at.asc())
            .load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_first_expired_for_user(&self, user_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .inner_join(borrowings::table)
            .filter(borrowings::user_id.eq(user_id))
            .filter(payments::status.eq(PaymentStatus::Expired.to_string()))
            .select(PaymentEntity::as_select())
            .order(payments::created_at.asc())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_payments(&self, user_id: Option<Uuid>) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let mut query = payments::table
            .inner_join(borrowings::table)
            .select(PaymentEntity::as_select())
            .into_boxed();

        if let Some(user_id) = user_id {
            query = query.filter(borrowings::user_id.eq(user_id));
        }

        let results = query
            .order(payments::created_at.desc())
            .load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::id.eq(payment_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
