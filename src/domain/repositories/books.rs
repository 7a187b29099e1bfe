use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::books::{BookEntity, InsertBookEntity};

#[automock]
#[async_trait]
pub trait BookRepository {
    async fn list_books(&self) -> Result<Vec<BookEntity>>;

    async fn find_by_id(&self, book_id: Uuid) -> Result<Option<BookEntity>>;

    async fn insert_book(&self, insert_book_entity: InsertBookEntity) -> Result<BookEntity>;

    /// Returns `false` when no row matched.
    async fn delete_book(&self, book_id: Uuid) -> Result<bool>;
}
