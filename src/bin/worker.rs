use anyhow::Result;
use library_rental::{
    application::usercases::{
        checkout::{CheckoutUrls, CheckoutUseCase},
        overdue::OverdueUseCase,
        payments::PaymentUseCase,
    },
    config::config_loader,
    infrastructure::postgres::{
        postgres_connection,
        repositories::{borrowings::BorrowingPostgres, payments::PaymentPostgres},
    },
    observability::{self, build_notifier},
    payments::{build_stripe_client, checkout_retry_policy},
    worker::worker_loop::{WorkerIntervals, run_worker_loop},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("worker")?;

    let dotenvy_env = config_loader::load_worker()?;
    info!("ENV has been loaded");

    let db_pool = Arc::new(postgres_connection::establish_connection(
        &dotenvy_env.database.url,
    )?);
    info!("Postgres connection has been established");

    let gateway = Arc::new(build_stripe_client(&dotenvy_env.stripe)?);
    let notifier = Arc::new(build_notifier(
        dotenvy_env.notifications.discord_webhook_url.clone(),
    )?);
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let borrowing_repository = Arc::new(BorrowingPostgres::new(Arc::clone(&db_pool)));

    let checkout = Arc::new(CheckoutUseCase::new(
        Arc::clone(&payment_repository),
        Arc::clone(&gateway),
        CheckoutUrls {
            success_url: dotenvy_env.stripe.success_url.clone(),
            cancel_url: dotenvy_env.stripe.cancel_url.clone(),
        },
        checkout_retry_policy(&dotenvy_env.stripe),
    ));
    let payment_usecase = Arc::new(PaymentUseCase::new(
        payment_repository,
        Arc::clone(&borrowing_repository),
        gateway,
        checkout,
        Arc::clone(&notifier),
    ));
    let overdue_usecase = Arc::new(OverdueUseCase::new(borrowing_repository, notifier));

    // tokio intervals panic on a zero period.
    let intervals = WorkerIntervals {
        expired_sweep: Duration::from_secs(dotenvy_env.worker.expired_sweep_interval_secs.max(1)),
        overdue_check: Duration::from_secs(dotenvy_env.worker.overdue_check_interval_secs.max(1)),
    };

    run_worker_loop(payment_usecase, overdue_usecase, intervals).await
}
