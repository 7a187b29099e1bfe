use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::books::{BookEntity, InsertBookEntity},
    value_objects::enums::cover_types::CoverType,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookModel {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub cover: CoverType,
    pub inventory: i32,
    pub daily_fee: Decimal,
}

impl From<BookEntity> for BookModel {
    fn from(value: BookEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            author: value.author,
            cover: CoverType::from_str(&value.cover).unwrap_or(CoverType::Soft),
            inventory: value.inventory,
            daily_fee: value.daily_fee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsertBookModel {
    pub title: String,
    pub author: String,
    pub cover: CoverType,
    pub inventory: i32,
    pub daily_fee: Decimal,
}

impl InsertBookModel {
    pub fn to_entity(&self) -> InsertBookEntity {
        InsertBookEntity {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            cover: self.cover.to_string(),
            inventory: self.inventory,
            daily_fee: self.daily_fee,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookDto {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub cover: CoverType,
    pub inventory: i32,
    pub daily_fee: Decimal,
}

impl From<BookModel> for BookDto {
    fn from(value: BookModel) -> Self {
        Self {
            id: value.id,
            title: value.title,
            author: value.author,
            cover: value.cover,
            inventory: value.inventory,
            daily_fee: value.daily_fee,
        }
    }
}
