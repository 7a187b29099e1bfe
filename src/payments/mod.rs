pub mod gateway;
pub mod retry;
pub mod stripe_client;

use std::time::Duration;

use anyhow::Result;

use crate::config::config_model::Stripe;
use retry::RetryPolicy;
use stripe_client::StripeClient;

pub fn build_stripe_client(stripe: &Stripe) -> Result<StripeClient> {
    StripeClient::new(
        stripe.secret_key.clone(),
        stripe.currency.clone(),
        Duration::from_secs(stripe.timeout_secs),
    )
}

/// `STRIPE_MAX_RETRIES` counts retries, so the first call comes on top.
pub fn checkout_retry_policy(stripe: &Stripe) -> RetryPolicy {
    RetryPolicy::default().with_max_attempts(stripe.max_retries.saturating_add(1))
}
