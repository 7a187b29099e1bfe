use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::usercases::payments::{PaymentError, PaymentResult},
    domain::{
        entities::payments::UpsertPaymentSessionEntity,
        repositories::payments::PaymentRepository,
        value_objects::{
            borrowings::BorrowingModel,
            enums::{payment_statuses::PaymentStatus, payment_types::PaymentType},
            payments::{PaymentModel, to_minor_units},
        },
    },
    payments::{
        gateway::{self, CheckoutRequest, PaymentGateway},
        retry::RetryPolicy,
    },
};

#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Attaches hosted checkout sessions to payment rows. Shared by the borrow,
/// return and renew flows.
pub struct CheckoutUseCase<P, G>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    gateway: Arc<G>,
    urls: CheckoutUrls,
    retry_policy: RetryPolicy,
}

impl<P, G> CheckoutUseCase<P, G>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        gateway: Arc<G>,
        urls: CheckoutUrls,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            payment_repo,
            gateway,
            urls,
            retry_policy,
        }
    }

    /// Requests a session for `amount` and upserts the (borrowing, type) row
    /// as pending with the new session. When the gateway keeps failing the
    /// row is parked as expired, without a session, so the user can renew it
    /// later. `customer` names the payer on the line item.
    pub async fn create_session(
        &self,
        borrowing: &BorrowingModel,
        customer: &str,
        payment_type: PaymentType,
        amount: Decimal,
        duration_days: i64,
    ) -> PaymentResult<PaymentModel> {
        let request = self.checkout_request(borrowing, customer, payment_type, amount, duration_days)?;

        let session = self
            .retry_policy
            .run("stripe: create checkout session", gateway::is_transient, || {
                self.gateway.create_session(request.clone())
            })
            .await;

        let session = match session {
            Ok(session) => session,
            Err(err) => {
                error!(
                    borrowing_id = %borrowing.id,
                    %payment_type,
                    gateway_error = ?err,
                    "checkout: gateway unavailable, parking charge as expired"
                );
                self.save(UpsertPaymentSessionEntity {
                    borrowing_id: borrowing.id,
                    type_: payment_type.to_string(),
                    status: PaymentStatus::Expired.to_string(),
                    session_id: None,
                    session_url: None,
                    money_to_pay: amount,
                    updated_at: Utc::now(),
                })
                .await?;
                return Err(PaymentError::GatewayUnavailable(err));
            }
        };

        let payment = self
            .save(UpsertPaymentSessionEntity {
                borrowing_id: borrowing.id,
                type_: payment_type.to_string(),
                status: PaymentStatus::Pending.to_string(),
                session_id: Some(session.session_id),
                session_url: Some(session.session_url),
                money_to_pay: amount,
                updated_at: Utc::now(),
            })
            .await?;

        info!(
            borrowing_id = %borrowing.id,
            payment_id = %payment.id,
            %payment_type,
            money_to_pay = %amount,
            "checkout: session attached"
        );
        Ok(payment)
    }

    fn checkout_request(
        &self,
        borrowing: &BorrowingModel,
        customer: &str,
        payment_type: PaymentType,
        amount: Decimal,
        duration_days: i64,
    ) -> PaymentResult<CheckoutRequest> {
        let unit_amount_cents = to_minor_units(amount)
            .ok_or_else(|| PaymentError::Internal(anyhow!("amount {amount} out of range")))?;
        let title = &borrowing.book.title;

        Ok(CheckoutRequest {
            name: format!("{} fee for book: '{}'", payment_type.label(), title),
            description: format!(
                "User '{}' book '{}' for '{}' days.",
                customer, title, duration_days
            ),
            unit_amount_cents,
            success_url: self.urls.success_url.clone(),
            cancel_url: self.urls.cancel_url.clone(),
            idempotency_key: format!(
                "checkout-{}-{}-{}",
                borrowing.id,
                payment_type,
                Uuid::new_v4()
            ),
        })
    }

    async fn save(&self, entity: UpsertPaymentSessionEntity) -> PaymentResult<PaymentModel> {
        let borrowing_id = entity.borrowing_id;
        let payment = self
            .payment_repo
            .upsert_session(entity)
            .await
            .map_err(|err| {
                error!(%borrowing_id, db_error = ?err, "checkout: failed to upsert payment session");
                PaymentError::Internal(err)
            })?;

        Ok(PaymentModel::from(payment))
    }
}
