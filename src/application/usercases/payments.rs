use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usercases::checkout::CheckoutUseCase,
    domain::{
        repositories::{borrowings::BorrowingRepository, payments::PaymentRepository},
        value_objects::{
            borrowings::BorrowingModel,
            enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
            iam::Requester,
            payments::{CANCEL_MESSAGE, PaymentModel, SweepReport},
        },
    },
    observability::notifier::NotificationSink,
    payments::gateway::{GatewaySessionStatus, PaymentGateway},
};

/// Session-less pending rows younger than this may still be waiting for the
/// gateway call that follows the borrow/return commit.
const SESSIONLESS_GRACE_MINUTES: i64 = 15;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment not found")]
    PaymentNotFound,
    #[error("no pending payment for this session")]
    SessionNotFound,
    #[error("payment has not been completed yet")]
    PaymentNotSettled,
    #[error("checkout session has expired, renew the payment to get a new one")]
    SessionExpired,
    #[error("no expired payment to renew")]
    NoExpiredPayment,
    #[error("payment gateway unavailable, try again later")]
    GatewayUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::PaymentNotFound
            | PaymentError::SessionNotFound
            | PaymentError::NoExpiredPayment => StatusCode::NOT_FOUND,
            PaymentError::PaymentNotSettled | PaymentError::SessionExpired => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

pub struct PaymentUseCase<P, B, G, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    borrowing_repo: Arc<B>,
    gateway: Arc<G>,
    checkout: Arc<CheckoutUseCase<P, G>>,
    notifier: Arc<N>,
}

impl<P, B, G, N> PaymentUseCase<P, B, G, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    B: BorrowingRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        borrowing_repo: Arc<B>,
        gateway: Arc<G>,
        checkout: Arc<CheckoutUseCase<P, G>>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            payment_repo,
            borrowing_repo,
            gateway,
            checkout,
            notifier,
        }
    }

    pub async fn list_payments(&self, requester: &Requester) -> PaymentResult<Vec<PaymentModel>> {
        let user_id = requester.scope(None);
        let payments = self
            .payment_repo
            .list_payments(user_id)
            .await
            .map_err(|err| {
                error!(?user_id, db_error = ?err, "payments: failed to list payments");
                PaymentError::Internal(err)
            })?;

        Ok(payments.into_iter().map(PaymentModel::from).collect())
    }

    /// Payment with its borrowing. Someone else's payment reads as not found.
    pub async fn get_payment(
        &self,
        requester: &Requester,
        payment_id: Uuid,
    ) -> PaymentResult<(PaymentModel, BorrowingModel)> {
        let payment = self
            .payment_repo
            .find_payment(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "payments: failed to load payment");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::PaymentNotFound)?;

        let borrowing = self.load_borrowing(payment.borrowing_id).await?;
        if !requester.can_see(borrowing.user_id) {
            warn!(
                %payment_id,
                requester_id = %requester.user_id,
                "payments: payment requested by non-owner"
            );
            return Err(PaymentError::PaymentNotFound);
        }

        Ok((PaymentModel::from(payment), borrowing))
    }

    /// Settles the pending payment behind `session_id` once the gateway
    /// reports it paid. Only the first confirmation wins; later ones find no
    /// pending row and get `SessionNotFound`.
    pub async fn confirm_session(&self, session_id: &str) -> PaymentResult<PaymentModel> {
        let payment = self
            .payment_repo
            .find_pending_by_session_id(session_id)
            .await
            .map_err(|err| {
                error!(session_id, db_error = ?err, "payments: failed to look up session");
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(session_id, "payments: no pending payment for session");
                PaymentError::SessionNotFound
            })?;
        let mut payment = PaymentModel::from(payment);

        let status = self
            .gateway
            .retrieve_session(session_id)
            .await
            .map_err(|err| {
                error!(session_id, gateway_error = ?err, "payments: failed to retrieve session");
                PaymentError::GatewayUnavailable(err)
            })?;

        match status {
            GatewaySessionStatus::Open => {
                info!(session_id, payment_id = %payment.id, "payments: session still open");
                Err(PaymentError::PaymentNotSettled)
            }
            GatewaySessionStatus::Expired => {
                self.payment_repo
                    .mark_expired(payment.id)
                    .await
                    .map_err(PaymentError::Internal)?;
                info!(session_id, payment_id = %payment.id, "payments: session expired");
                Err(PaymentError::SessionExpired)
            }
            GatewaySessionStatus::Paid => {
                let settled = self
                    .payment_repo
                    .mark_paid(payment.id)
                    .await
                    .map_err(|err| {
                        error!(payment_id = %payment.id, db_error = ?err, "payments: failed to mark paid");
                        PaymentError::Internal(err)
                    })?;
                if !settled {
                    warn!(session_id, payment_id = %payment.id, "payments: confirmation lost the race");
                    return Err(PaymentError::SessionNotFound);
                }

                payment.status = PaymentStatus::Paid;
                info!(
                    session_id,
                    payment_id = %payment.id,
                    money_to_pay = %payment.money_to_pay,
                    "payments: payment settled"
                );
                self.notify(payment_success_message(&payment)).await;
                Ok(payment)
            }
        }
    }

    pub fn cancel_session(&self) -> &'static str {
        CANCEL_MESSAGE
    }

    /// Opens a fresh session for the requester's first expired payment.
    pub async fn renew_session(&self, requester: &Requester) -> PaymentResult<PaymentModel> {
        let user_id = requester.user_id;
        let expired = self
            .payment_repo
            .find_first_expired_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "payments: failed to look up expired payment");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NoExpiredPayment)?;
        let expired = PaymentModel::from(expired);

        let borrowing = self.load_borrowing(expired.borrowing_id).await?;
        let duration_days = match expired.payment_type {
            PaymentType::Payment => borrowing.get_borrowing_days(),
            PaymentType::Fine => borrowing.get_overdue_days().unwrap_or_default(),
        };

        info!(%user_id, payment_id = %expired.id, "payments: renewing expired session");
        self.checkout
            .create_session(
                &borrowing,
                &requester.email,
                expired.payment_type,
                expired.money_to_pay,
                duration_days,
            )
            .await
    }

    /// Expires pending rows whose gateway session has expired, plus stale
    /// rows that never got a session. A failing row is counted and skipped.
    pub async fn sweep_expired_sessions(&self) -> PaymentResult<SweepReport> {
        let pending = self.payment_repo.list_pending().await.map_err(|err| {
            error!(db_error = ?err, "payments: failed to list pending payments");
            PaymentError::Internal(err)
        })?;

        let stale_before = Utc::now() - Duration::minutes(SESSIONLESS_GRACE_MINUTES);
        let mut report = SweepReport::default();

        for payment in pending {
            report.checked += 1;

            let gateway_expired = match payment.session_id.as_deref() {
                None => payment.updated_at < stale_before,
                Some(session_id) => match self.gateway.retrieve_session(session_id).await {
                    Ok(status) => status == GatewaySessionStatus::Expired,
                    Err(err) => {
                        warn!(
                            payment_id = %payment.id,
                            session_id,
                            gateway_error = ?err,
                            "payments: sweep could not retrieve session"
                        );
                        report.failed += 1;
                        continue;
                    }
                },
            };

            if !gateway_expired {
                continue;
            }

            match self.payment_repo.mark_expired(payment.id).await {
                Ok(true) => report.expired += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(payment_id = %payment.id, db_error = ?err, "payments: sweep failed to expire row");
                    report.failed += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            expired = report.expired,
            failed = report.failed,
            "payments: expired session sweep finished"
        );
        Ok(report)
    }

    async fn load_borrowing(&self, borrowing_id: Uuid) -> PaymentResult<BorrowingModel> {
        let (borrowing, book) = self
            .borrowing_repo
            .find_borrowing(borrowing_id)
            .await
            .map_err(|err| {
                error!(%borrowing_id, db_error = ?err, "payments: failed to load borrowing");
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| PaymentError::Internal(anyhow!("borrowing {borrowing_id} missing")))?;

        Ok(BorrowingModel::from((borrowing, book)))
    }

    async fn notify(&self, text: String) {
        if let Err(err) = self.notifier.send(text).await {
            warn!(error = ?err, "payments: notification failed");
        }
    }
}

fn payment_success_message(payment: &PaymentModel) -> String {
    format!(
        "Payment received:\npayment id: {}\ntype: {}\namount: {}\nborrowing id: {}",
        payment.id, payment.payment_type, payment.money_to_pay, payment.borrowing_id
    )
}
