use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{Connection, OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            books::BookEntity,
            borrowings::{BorrowingEntity, InsertBorrowingEntity},
            payments::PaymentEntity,
        },
        repositories::borrowings::BorrowingRepository,
        value_objects::{borrowings::ListBorrowingsFilter, payments::PendingCharge},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{books, borrowings, payments},
    },
};

pub struct BorrowingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BorrowingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BorrowingRepository for BorrowingPostgres {
    async fn create_borrowing(
        &self,
        insert_borrowing_entity: InsertBorrowingEntity,
        rental_charge: PendingCharge,
    ) -> Result<Option<(BorrowingEntity, BookEntity, PaymentEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            // The inventory guard in the WHERE clause serializes concurrent
            // borrowers on the book row.
            let book = update(books::table)
                .filter(books::id.eq(insert_borrowing_entity.book_id))
                .filter(books::inventory.gt(0))
                .set(books::inventory.eq(books::inventory - 1))
                .returning(BookEntity::as_returning())
                .get_result::<BookEntity>(tx)
                .optional()?;

            let Some(book) = book else {
                return Ok(None);
            };

            let borrowing = insert_into(borrowings::table)
                .values(&insert_borrowing_entity)
                .returning(BorrowingEntity::as_returning())
                .get_result::<BorrowingEntity>(tx)?;

            let payment = insert_into(payments::table)
                .values(&rental_charge.to_entity(borrowing.id))
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(tx)?;

            Ok(Some((borrowing, book, payment)))
        })?;

        Ok(result)
    }

    async fn return_borrowing(
        &self,
        borrowing_id: Uuid,
        returned_at: DateTime<Utc>,
        fine: Option<PendingCharge>,
    ) -> Result<Option<(BorrowingEntity, BookEntity, Option<PaymentEntity>)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            let borrowing = update(borrowings::table)
                .filter(borrowings::id.eq(borrowing_id))
                .filter(borrowings::actual_return_date.is_null())
                .set(borrowings::actual_return_date.eq(Some(returned_at)))
                .returning(BorrowingEntity::as_returning())
                .get_result::<BorrowingEntity>(tx)
                .optional()?;

            let Some(borrowing) = borrowing else {
                return Ok(None);
            };

            let book = update(books::table)
                .filter(books::id.eq(borrowing.book_id))
                .set(books::inventory.eq(books::inventory + 1))
                .returning(BookEntity::as_returning())
                .get_result::<BookEntity>(tx)?;

            let fine_payment = match fine {
                Some(charge) => Some(
                    insert_into(payments::table)
                        .values(&charge.to_entity(borrowing.id))
                        .returning(PaymentEntity::as_returning())
                        .get_result::<PaymentEntity>(tx)?,
                ),
                None => None,
            };

            Ok(Some((borrowing, book, fine_payment)))
        })?;

        Ok(result)
    }

    async fn find_borrowing(
        &self,
        borrowing_id: Uuid,
    ) -> Result<Option<(BorrowingEntity, BookEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = borrowings::table
            .inner_join(books::table)
            .filter(borrowings::id.eq(borrowing_id))
            .select((BorrowingEntity::as_select(), BookEntity::as_select()))
            .first::<(BorrowingEntity, BookEntity)>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_borrowings(
        &self,
        filter: &ListBorrowingsFilter,
    ) -> Result<Vec<(BorrowingEntity, BookEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let mut query = borrowings::table
            .inner_join(books::table)
            .select((BorrowingEntity::as_select(), BookEntity::as_select()))
            .into_boxed();

        match filter.is_active {
            Some(true) => query = query.filter(borrowings::actual_return_date.is_null()),
            Some(false) => query = query.filter(borrowings::actual_return_date.is_not_null()),
            None => {}
        }

        if let Some(user_id) = filter.user_id {
            query = query.filter(borrowings::user_id.eq(user_id));
        }

        let results = query
            .order(borrowings::borrow_date.asc())
            .load::<(BorrowingEntity, BookEntity)>(&mut conn)?;

        Ok(results)
    }

    async fn list_overdue(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<(BorrowingEntity, BookEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = borrowings::table
            .inner_join(books::table)
            .filter(borrowings::actual_return_date.is_null())
            .filter(borrowings::expected_return_date.lt(cutoff))
            .select((BorrowingEntity::as_select(), BookEntity::as_select()))
            .order(borrowings::expected_return_date.asc())
            .load::<(BorrowingEntity, BookEntity)>(&mut conn)?;

        Ok(results)
    }
}
