use crate::{
    application::usercases::checkout::{CheckoutUrls, CheckoutUseCase},
    config::config_model::DotEnvyConfig,
    infrastructure::{
        axum_http::{auth::JwtSecret, default_routers, routers},
        postgres::{postgres_connection::PgPoolSquad, repositories::payments::PaymentPostgres},
    },
    observability::build_notifier,
    payments::{build_stripe_client, checkout_retry_policy},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let gateway = Arc::new(build_stripe_client(&config.stripe)?);
    let notifier = Arc::new(build_notifier(
        config.notifications.discord_webhook_url.clone(),
    )?);
    let checkout = Arc::new(CheckoutUseCase::new(
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&gateway),
        CheckoutUrls {
            success_url: config.stripe.success_url.clone(),
            cancel_url: config.stripe.cancel_url.clone(),
        },
        checkout_retry_policy(&config.stripe),
    ));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1/books", routers::books::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/v1/borrowings",
            routers::borrowings::routes(
                Arc::clone(&db_pool),
                Arc::clone(&checkout),
                Arc::clone(&notifier),
            ),
        )
        .nest(
            "/api/v1/payments",
            routers::payments::routes(
                Arc::clone(&db_pool),
                Arc::clone(&gateway),
                Arc::clone(&checkout),
                Arc::clone(&notifier),
            ),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(JwtSecret(Arc::from(
            config.auth.jwt_secret.as_str(),
        ))))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (config.server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl+C signal");
}
