use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        books::BookEntity,
        borrowings::{BorrowingEntity, InsertBorrowingEntity},
        payments::PaymentEntity,
    },
    value_objects::{borrowings::ListBorrowingsFilter, payments::PendingCharge},
};

#[automock]
#[async_trait]
pub trait BorrowingRepository {
    /// Decrements inventory, inserts the borrowing and its pending rental
    /// charge in one transaction. Returns the book as it stands after the
    /// decrement; `None` means the book had no copy left.
    async fn create_borrowing(
        &self,
        insert_borrowing_entity: InsertBorrowingEntity,
        rental_charge: PendingCharge,
    ) -> Result<Option<(BorrowingEntity, BookEntity, PaymentEntity)>>;

    /// Sets `actual_return_date` only if it is still null, increments
    /// inventory and records the fine (if any) in one transaction. `None`
    /// means another request returned it first.
    async fn return_borrowing(
        &self,
        borrowing_id: Uuid,
        returned_at: DateTime<Utc>,
        fine: Option<PendingCharge>,
    ) -> Result<Option<(BorrowingEntity, BookEntity, Option<PaymentEntity>)>>;

    async fn find_borrowing(
        &self,
        borrowing_id: Uuid,
    ) -> Result<Option<(BorrowingEntity, BookEntity)>>;

    async fn list_borrowings(
        &self,
        filter: &ListBorrowingsFilter,
    ) -> Result<Vec<(BorrowingEntity, BookEntity)>>;

    /// Active borrowings whose expected return date is before `cutoff`.
    async fn list_overdue(&self, cutoff: DateTime<Utc>)
    -> Result<Vec<(BorrowingEntity, BookEntity)>>;
}
