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
    application::usercases::{checkout::CheckoutUseCase, payments::PaymentUseCase},
    domain::{
        repositories::{borrowings::BorrowingRepository, payments::PaymentRepository},
        value_objects::payments::{
            PaymentDetailDto, PaymentDto, PaymentMessageDto, PaymentSuccessQuery,
        },
    },
    infrastructure::{
        axum_http::auth::AuthUser,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{borrowings::BorrowingPostgres, payments::PaymentPostgres},
        },
    },
    observability::notifier::{NotificationSink, Notifier},
    payments::{gateway::PaymentGateway, stripe_client::StripeClient},
};

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<StripeClient>,
    checkout: Arc<CheckoutUseCase<PaymentPostgres, StripeClient>>,
    notifier: Arc<Notifier>,
) -> Router {
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let borrowing_repository = BorrowingPostgres::new(Arc::clone(&db_pool));
    let payment_usecase = PaymentUseCase::new(
        Arc::new(payment_repository),
        Arc::new(borrowing_repository),
        gateway,
        checkout,
        notifier,
    );

    router(Arc::new(payment_usecase))
}

/// `/success` and `/cancel` are gateway redirect targets and carry no token.
pub fn router<P, B, G, N>(payment_usecase: Arc<PaymentUseCase<P, B, G, N>>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_payments::<P, B, G, N>))
        .route("/success", get(payment_success::<P, B, G, N>))
        .route("/cancel", get(payment_cancel::<P, B, G, N>))
        .route("/renew", post(renew_payment::<P, B, G, N>))
        .route("/:payment_id", get(get_payment::<P, B, G, N>))
        .with_state(payment_usecase)
}

pub async fn list_payments<P, B, G, N>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match payment_usecase.list_payments(&auth.requester()).await {
        Ok(payments) => {
            let payments: Vec<PaymentDto> = payments.into_iter().map(PaymentDto::from).collect();
            (StatusCode::OK, Json(payments)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn get_payment<P, B, G, N>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match payment_usecase
        .get_payment(&auth.requester(), payment_id)
        .await
    {
        Ok(detail) => (StatusCode::OK, Json(PaymentDetailDto::from(detail))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn payment_success<P, B, G, N>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    Query(query): Query<PaymentSuccessQuery>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match payment_usecase.confirm_session(&query.session_id).await {
        Ok(payment) => (StatusCode::OK, Json(PaymentDto::from(payment))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn payment_cancel<P, B, G, N>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    let message = payment_usecase.cancel_session().to_string();
    (StatusCode::OK, Json(PaymentMessageDto { message })).into_response()
}

pub async fn renew_payment<P, B, G, N>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, B, G, N>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match payment_usecase.renew_session(&auth.requester()).await {
        Ok(payment) => (StatusCode::OK, Json(PaymentDto::from(payment))).into_response(),
        Err(err) => err.into_response(),
    }
}
