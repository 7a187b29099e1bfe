use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::{PaymentEntity, UpsertPaymentSessionEntity};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    /// First pending or expired payment on any of the user's borrowings.
    async fn find_outstanding_for_user(&self, user_id: Uuid) -> Result<Option<PaymentEntity>>;

    async fn upsert_session(
        &self,
        upsert_payment_session_entity: UpsertPaymentSessionEntity,
    ) -> Result<PaymentEntity>;

    async fn find_pending_by_session_id(&self, session_id: &str) -> Result<Option<PaymentEntity>>;

    /// Pending -> paid. `false` when the row was no longer pending.
    async fn mark_paid(&self, payment_id: Uuid) -> Result<bool>;

    /// Pending -> expired. `false` when the row was no longer pending.
    async fn mark_expired(&self, payment_id: Uuid) -> Result<bool>;

    async fn list_pending(&self) -> Result<Vec<PaymentEntity>>;

    async fn find_first_expired_for_user(&self, user_id: Uuid) -> Result<Option<PaymentEntity>>;

    /// `None` lists every payment.
    async fn list_payments(&self, user_id: Option<Uuid>) -> Result<Vec<PaymentEntity>>;

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;
}
