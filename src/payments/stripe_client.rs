use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::error;

use crate::payments::gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewaySessionStatus, PaymentGateway,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Minimal Stripe Checkout client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    /// `open`, `complete` or `expired`.
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: Option<String>,
}

impl StripeCheckoutSession {
    pub fn gateway_status(&self) -> GatewaySessionStatus {
        match (self.payment_status.as_deref(), self.status.as_deref()) {
            (Some("paid") | Some("no_payment_required"), _) => GatewaySessionStatus::Paid,
            (_, Some("expired")) => GatewaySessionStatus::Expired,
            _ => GatewaySessionStatus::Open,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, currency: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build stripe http client")?;

        Ok(Self {
            http,
            secret_key,
            currency,
        })
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => (
                    envelope.error.type_,
                    envelope.error.code,
                    envelope.error.message,
                ),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_message = ?stripe_error_message,
            context = %context,
            "stripe api request failed"
        );

        Err(GatewayError::Rejected {
            context: context.to_string(),
            status: status.as_u16(),
            request_id,
        }
        .into())
    }

    /// Creates a one-off payment Checkout Session with inline price data.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<StripeCheckoutSession> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let body: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                request.unit_amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                request.description.clone(),
            ),
            (
                "success_url",
                format!("{}?session_id={{CHECKOUT_SESSION_ID}}", request.success_url),
            ),
            ("cancel_url", request.cancel_url.clone()),
        ];

        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(IDEMPOTENCY_KEY, &request.idempotency_key)
            .form(&body)
            .send()
            .await
            .map_err(GatewayError::Transport)?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let session: StripeCheckoutSession = resp.json().await?;
        Ok(session)
    }

    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession> {
        // https://stripe.com/docs/api/checkout/sessions/retrieve
        let resp = self
            .http
            .get(format!("{STRIPE_API_BASE}/checkout/sessions/{session_id}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(GatewayError::Transport)?;
        let resp = Self::ensure_success(resp, "retrieve checkout session").await?;

        let session: StripeCheckoutSession = resp.json().await?;
        Ok(session)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let session = self.create_checkout_session(&request).await?;
        let session_url = session
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))?;

        Ok(CheckoutSession {
            session_id: session.id,
            session_url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySessionStatus> {
        let session = self.retrieve_checkout_session(session_id).await?;
        Ok(session.gateway_status())
    }
}
