use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

const QUEUE_CAPACITY: usize = 256;

/// Outbound text alerts (new borrowing, overdue, payment success).
#[automock]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: String) -> Result<()>;
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<()>;
    fn provider_name(&self) -> &'static str;
}

/// Queues notifications and delivers them from a background task, so callers
/// never wait on the provider.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<String>,
}

impl Notifier {
    /// Must be called inside a tokio runtime.
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                info!(notification = %text, "notification dispatched");
                for provider in &providers {
                    if let Err(error) = provider.deliver(&text).await {
                        warn!(
                            provider = provider.provider_name(),
                            error = %error,
                            "Notification provider failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn try_notify(&self, text: String) {
        match self.tx.try_send(text) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification queue full; dropping notification");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Notification queue closed; dropping notification");
            }
        }
    }
}

#[async_trait]
impl NotificationSink for Notifier {
    async fn send(&self, text: String) -> Result<()> {
        self.try_notify(text);
        Ok(())
    }
}
