use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::books;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = books)]
pub struct BookEntity {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub cover: String,
    pub inventory: i32,
    pub daily_fee: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = books)]
pub struct InsertBookEntity {
    pub title: String,
    pub author: String,
    pub cover: String,
    pub inventory: i32,
    pub daily_fee: Decimal,
}
