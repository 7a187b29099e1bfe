mod config;
mod discord;
pub mod notifier;

use anyhow::Result;
use config::ServiceContext;
use discord::DiscordWebhookProvider;
use notifier::{NotificationProvider, Notifier};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

pub fn init_observability(component: &str) -> Result<()> {
    let service_context = ServiceContext::from_env(component);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ` shows up as an offset in log timestamps.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    info!(
        service = %service_context.service_name,
        environment = %service_context.environment,
        component = %service_context.component,
        "Observability initialized"
    );

    Ok(())
}

/// Builds the notification queue; without a webhook notifications are only logged.
pub fn build_notifier(discord_webhook_url: Option<Url>) -> Result<Notifier> {
    let mut providers: Vec<Arc<dyn NotificationProvider>> = Vec::new();

    match discord_webhook_url {
        Some(webhook_url) => {
            providers.push(Arc::new(DiscordWebhookProvider::new(webhook_url)?));
            info!("Discord notifications enabled");
        }
        None => info!("Discord notifications disabled; notifications are logged only"),
    }

    Ok(Notifier::new(providers))
}
