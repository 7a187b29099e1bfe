use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::books::BookRepository,
    value_objects::books::{BookModel, InsertBookModel},
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book not found")]
    BookNotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CatalogError::BookNotFound => StatusCode::NOT_FOUND,
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

pub struct BookUseCase<K>
where
    K: BookRepository + Send + Sync + 'static,
{
    book_repo: Arc<K>,
}

impl<K> BookUseCase<K>
where
    K: BookRepository + Send + Sync + 'static,
{
    pub fn new(book_repo: Arc<K>) -> Self {
        Self { book_repo }
    }

    pub async fn list_books(&self) -> CatalogResult<Vec<BookModel>> {
        let books = self.book_repo.list_books().await.map_err(|err| {
            error!(db_error = ?err, "books: failed to list books");
            CatalogError::Internal(err)
        })?;

        Ok(books.into_iter().map(BookModel::from).collect())
    }

    pub async fn get_book(&self, book_id: Uuid) -> CatalogResult<BookModel> {
        let book = self
            .book_repo
            .find_by_id(book_id)
            .await
            .map_err(|err| {
                error!(%book_id, db_error = ?err, "books: failed to load book");
                CatalogError::Internal(err)
            })?
            .ok_or(CatalogError::BookNotFound)?;

        Ok(BookModel::from(book))
    }

    pub async fn create_book(&self, insert_book_model: InsertBookModel) -> CatalogResult<BookModel> {
        validate_book(&insert_book_model)?;

        let book = self
            .book_repo
            .insert_book(insert_book_model.to_entity())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "books: failed to insert book");
                CatalogError::Internal(err)
            })?;

        info!(book_id = %book.id, title = %book.title, "books: book created");
        Ok(BookModel::from(book))
    }

    pub async fn delete_book(&self, book_id: Uuid) -> CatalogResult<()> {
        let deleted = self.book_repo.delete_book(book_id).await.map_err(|err| {
            error!(%book_id, db_error = ?err, "books: failed to delete book");
            CatalogError::Internal(err)
        })?;

        if !deleted {
            warn!(%book_id, "books: delete requested for unknown book");
            return Err(CatalogError::BookNotFound);
        }

        info!(%book_id, "books: book deleted");
        Ok(())
    }
}

fn validate_book(book: &InsertBookModel) -> CatalogResult<()> {
    if book.title.trim().is_empty() {
        return Err(CatalogError::Validation("title must not be empty".to_string()));
    }
    if book.author.trim().is_empty() {
        return Err(CatalogError::Validation("author must not be empty".to_string()));
    }
    if book.inventory < 0 {
        return Err(CatalogError::Validation(
            "inventory must not be negative".to_string(),
        ));
    }
    if book.daily_fee <= Decimal::ZERO || book.daily_fee.normalize().scale() > 2 {
        return Err(CatalogError::Validation(
            "daily_fee must be positive with at most 2 decimal places".to_string(),
        ));
    }
    Ok(())
}
