use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    application::usercases::books::BookUseCase,
    domain::{
        repositories::books::BookRepository,
        value_objects::books::{BookDto, InsertBookModel},
    },
    infrastructure::{
        axum_http::auth::AuthUser,
        postgres::{postgres_connection::PgPoolSquad, repositories::books::BookPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let book_repository = BookPostgres::new(Arc::clone(&db_pool));
    let book_usecase = BookUseCase::new(Arc::new(book_repository));

    router(Arc::new(book_usecase))
}

pub fn router<K>(book_usecase: Arc<BookUseCase<K>>) -> Router
where
    K: BookRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_books::<K>).post(create_book::<K>))
        .route("/:book_id", get(get_book::<K>).delete(delete_book::<K>))
        .with_state(book_usecase)
}

pub async fn list_books<K>(
    State(book_usecase): State<Arc<BookUseCase<K>>>,
    _auth: AuthUser,
) -> impl IntoResponse
where
    K: BookRepository + Send + Sync + 'static,
{
    match book_usecase.list_books().await {
        Ok(books) => {
            let books: Vec<BookDto> = books.into_iter().map(BookDto::from).collect();
            (StatusCode::OK, Json(books)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_book<K>(
    State(book_usecase): State<Arc<BookUseCase<K>>>,
    _auth: AuthUser,
    Path(book_id): Path<Uuid>,
) -> impl IntoResponse
where
    K: BookRepository + Send + Sync + 'static,
{
    match book_usecase.get_book(book_id).await {
        Ok(book) => (StatusCode::OK, Json(BookDto::from(book))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_book<K>(
    State(book_usecase): State<Arc<BookUseCase<K>>>,
    auth: AuthUser,
    Json(insert_book_model): Json<InsertBookModel>,
) -> impl IntoResponse
where
    K: BookRepository + Send + Sync + 'static,
{
    if let Err(err) = auth.require_staff() {
        return err.into_response();
    }

    match book_usecase.create_book(insert_book_model).await {
        Ok(book) => (StatusCode::CREATED, Json(BookDto::from(book))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn delete_book<K>(
    State(book_usecase): State<Arc<BookUseCase<K>>>,
    auth: AuthUser,
    Path(book_id): Path<Uuid>,
) -> impl IntoResponse
where
    K: BookRepository + Send + Sync + 'static,
{
    if let Err(err) = auth.require_staff() {
        return err.into_response();
    }

    match book_usecase.delete_book(book_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
