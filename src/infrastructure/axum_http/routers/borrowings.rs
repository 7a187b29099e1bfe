use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    application::usercases::{borrowings::BorrowingUseCase, checkout::CheckoutUseCase},
    domain::{
        repositories::{
            books::BookRepository, borrowings::BorrowingRepository, payments::PaymentRepository,
        },
        value_objects::borrowings::{
            BorrowingCheckoutDto, BorrowingDetailDto, BorrowingDto, CreateBorrowingRequest,
            ListBorrowingsQuery,
        },
    },
    infrastructure::{
        axum_http::auth::AuthUser,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                books::BookPostgres, borrowings::BorrowingPostgres, payments::PaymentPostgres,
            },
        },
    },
    observability::notifier::{NotificationSink, Notifier},
    payments::{gateway::PaymentGateway, stripe_client::StripeClient},
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    checkout: Arc<CheckoutUseCase<PaymentPostgres, StripeClient>>,
    notifier: Arc<Notifier>,
) -> Router {
    let borrowing_repository = BorrowingPostgres::new(Arc::clone(&db_pool));
    let book_repository = BookPostgres::new(Arc::clone(&db_pool));
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let borrowing_usecase = BorrowingUseCase::new(
        Arc::new(borrowing_repository),
        Arc::new(book_repository),
        Arc::new(payment_repository),
        checkout,
        notifier,
    );

    router(Arc::new(borrowing_usecase))
}

pub fn router<B, K, P, G, N>(borrowing_usecase: Arc<BorrowingUseCase<B, K, P, G, N>>) -> Router
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/",
            get(list_borrowings::<B, K, P, G, N>).post(create_borrowing::<B, K, P, G, N>),
        )
        .route("/:borrowing_id", get(get_borrowing::<B, K, P, G, N>))
        .route(
            "/:borrowing_id/return",
            post(return_borrowing::<B, K, P, G, N>),
        )
        .with_state(borrowing_usecase)
}

pub async fn list_borrowings<B, K, P, G, N>(
    State(borrowing_usecase): State<Arc<BorrowingUseCase<B, K, P, G, N>>>,
    auth: AuthUser,
    Query(query): Query<ListBorrowingsQuery>,
) -> impl IntoResponse
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match borrowing_usecase
        .list_borrowings(&auth.requester(), query.to_filter())
        .await
    {
        Ok(borrowings) => {
            let borrowings: Vec<BorrowingDto> =
                borrowings.into_iter().map(BorrowingDto::from).collect();
            (StatusCode::OK, Json(borrowings)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_borrowing<B, K, P, G, N>(
    State(borrowing_usecase): State<Arc<BorrowingUseCase<B, K, P, G, N>>>,
    auth: AuthUser,
    Path(borrowing_id): Path<Uuid>,
) -> impl IntoResponse
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match borrowing_usecase
        .get_borrowing(&auth.requester(), borrowing_id)
        .await
    {
        Ok(borrowing) => (StatusCode::OK, Json(BorrowingDetailDto::from(borrowing))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_borrowing<B, K, P, G, N>(
    State(borrowing_usecase): State<Arc<BorrowingUseCase<B, K, P, G, N>>>,
    auth: AuthUser,
    Json(request): Json<CreateBorrowingRequest>,
) -> impl IntoResponse
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match borrowing_usecase
        .create_borrowing(&auth.requester(), request)
        .await
    {
        Ok(outcome) => {
            (StatusCode::CREATED, Json(BorrowingCheckoutDto::from(outcome))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn return_borrowing<B, K, P, G, N>(
    State(borrowing_usecase): State<Arc<BorrowingUseCase<B, K, P, G, N>>>,
    auth: AuthUser,
    Path(borrowing_id): Path<Uuid>,
) -> impl IntoResponse
where
    B: BorrowingRepository + Send + Sync + 'static,
    K: BookRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match borrowing_usecase
        .return_borrowing(&auth.requester(), borrowing_id)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(BorrowingCheckoutDto::from(outcome))).into_response(),
        Err(err) => err.into_response(),
    }
}
