use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, Utc};
use tracing::{info, warn};

use crate::{
    domain::{
        repositories::borrowings::BorrowingRepository, value_objects::borrowings::BorrowingModel,
    },
    observability::notifier::NotificationSink,
};

pub const NONE_OVERDUE_MESSAGE: &str = "No borrowings overdue today!";

pub struct OverdueUseCase<B, N>
where
    B: BorrowingRepository + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    borrowing_repo: Arc<B>,
    notifier: Arc<N>,
}

impl<B, N> OverdueUseCase<B, N>
where
    B: BorrowingRepository + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    pub fn new(borrowing_repo: Arc<B>, notifier: Arc<N>) -> Self {
        Self {
            borrowing_repo,
            notifier,
        }
    }

    /// Announces every active borrowing due today or earlier, then a summary.
    /// Read only. Returns how many were overdue.
    pub async fn check_overdue(&self) -> Result<usize> {
        self.check_overdue_at(Utc::now()).await
    }

    pub async fn check_overdue_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = start_of_next_day(now)?;
        let overdue = self
            .borrowing_repo
            .list_overdue(cutoff)
            .await
            .context("failed to list overdue borrowings")?;

        if overdue.is_empty() {
            info!("overdue: nothing overdue");
            self.notify(NONE_OVERDUE_MESSAGE.to_string()).await;
            return Ok(0);
        }

        let count = overdue.len();
        for row in overdue {
            let borrowing = BorrowingModel::from(row);
            self.notify(overdue_message(&borrowing)).await;
        }
        self.notify(format!("{count} total borrowings overdue today."))
            .await;

        info!(count, "overdue: notifications queued");
        Ok(count)
    }

    async fn notify(&self, text: String) {
        if let Err(err) = self.notifier.send(text).await {
            warn!(error = ?err, "overdue: notification failed");
        }
    }
}

/// Midnight UTC after `now`; anything expected before it is due today or earlier.
fn start_of_next_day(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    now.date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .context("date out of range")
}

fn overdue_message(borrowing: &BorrowingModel) -> String {
    format!(
        "Borrowing overdue:\nborrowing id: {}\nbook: {}\nuser: {}\nborrow date: {}\nexpected return date: {}",
        borrowing.id,
        borrowing.book.title,
        borrowing.user_id,
        borrowing.borrow_date.date_naive(),
        borrowing.expected_return_date.date_naive()
    )
}
