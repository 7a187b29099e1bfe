use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::{
    application::usercases::{overdue::OverdueUseCase, payments::PaymentUseCase},
    domain::repositories::{borrowings::BorrowingRepository, payments::PaymentRepository},
    observability::notifier::NotificationSink,
    payments::gateway::PaymentGateway,
};

#[derive(Debug, Clone, Copy)]
pub struct WorkerIntervals {
    pub expired_sweep: Duration,
    pub overdue_check: Duration,
}

/// Runs the expired-session sweep and the overdue check on their own
/// intervals. A failing tick is logged and the loop keeps going.
pub async fn run_worker_loop<P, B, G, N>(
    payment_usecase: Arc<PaymentUseCase<P, B, G, N>>,
    overdue_usecase: Arc<OverdueUseCase<B, N>>,
    intervals: WorkerIntervals,
) -> Result<()>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    info!(
        expired_sweep_secs = intervals.expired_sweep.as_secs(),
        overdue_check_secs = intervals.overdue_check.as_secs(),
        "worker: loops starting"
    );

    let sweep_loop = tokio::spawn(sweep_forever(payment_usecase, intervals.expired_sweep));
    let overdue_loop = tokio::spawn(overdue_forever(overdue_usecase, intervals.overdue_check));

    tokio::select! {
        result = sweep_loop => result?,
        result = overdue_loop => result?,
    }

    Ok(())
}

async fn sweep_forever<P, B, G, N>(payment_usecase: Arc<PaymentUseCase<P, B, G, N>>, every: Duration)
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        sweep_tick(&payment_usecase).await;
    }
}

async fn overdue_forever<B, N>(overdue_usecase: Arc<OverdueUseCase<B, N>>, every: Duration)
where
    B: BorrowingRepository + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        overdue_tick(&overdue_usecase).await;
    }
}

pub async fn sweep_tick<P, B, G, N>(payment_usecase: &PaymentUseCase<P, B, G, N>)
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match payment_usecase.sweep_expired_sessions().await {
        Ok(report) => info!(
            checked = report.checked,
            expired = report.expired,
            failed = report.failed,
            "worker: expired session sweep done"
        ),
        Err(e) => error!("Error while sweeping expired payment sessions: {}", e),
    }
}

pub async fn overdue_tick<B, N>(overdue_usecase: &OverdueUseCase<B, N>)
where
    B: BorrowingRepository + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    match overdue_usecase.check_overdue().await {
        Ok(count) => info!(overdue = count, "worker: overdue check done"),
        Err(e) => error!("Error while checking overdue borrowings: {:#}", e),
    }
}
