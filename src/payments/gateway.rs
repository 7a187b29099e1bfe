use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub name: String,
    pub description: String,
    pub unit_amount_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
    /// Same value on every attempt for one charge, so a retried create
    /// returns the session the provider may already have opened.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub session_url: String,
}

/// Settlement state of a hosted checkout session as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewaySessionStatus {
    Open,
    Paid,
    Expired,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider unreachable")]
    Transport(#[source] reqwest::Error),

    #[error("payment provider rejected {context} (status {status}, request_id={request_id:?})")]
    Rejected {
        context: String,
        status: u16,
        request_id: Option<String>,
    },
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Only network failures and 5xx/429 answers are worth another attempt.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<GatewayError>()
        .is_some_and(GatewayError::is_transient)
}

/// Hosted checkout provider. Every call is untrusted network I/O.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySessionStatus>;
}
