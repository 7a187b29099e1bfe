use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::borrowings;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = borrowings)]
pub struct BorrowingEntity {
    pub id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub book_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = borrowings)]
pub struct InsertBorrowingEntity {
    pub borrow_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub book_id: Uuid,
    pub user_id: Uuid,
}
