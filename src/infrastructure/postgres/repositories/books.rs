use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, delete, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::books::{BookEntity, InsertBookEntity},
        repositories::books::BookRepository,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::books},
};

pub struct BookPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BookPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BookRepository for BookPostgres {
    async fn list_books(&self) -> Result<Vec<BookEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = books::table
            .select(BookEntity::as_select())
            .order(books::title.asc())
            .load::<BookEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_id(&self, book_id: Uuid) -> Result<Option<BookEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = books::table
            .filter(books::id.eq(book_id))
            .select(BookEntity::as_select())
            .first::<BookEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn insert_book(&self, insert_book_entity: InsertBookEntity) -> Result<BookEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(books::table)
            .values(&insert_book_entity)
            .returning(BookEntity::as_returning())
            .get_result::<BookEntity>(&mut conn)?;

        Ok(result)
    }

    async fn delete_book(&self, book_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(books::table.filter(books::id.eq(book_id))).execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
