use url::Url;

/// HTTP backend settings.
#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub stripe: Stripe,
    pub notifications: Notifications,
}

/// Background worker settings; no HTTP listener and no token checks.
#[derive(Debug, Clone)]
pub struct WorkerDotEnvyConfig {
    pub database: Database,
    pub stripe: Stripe,
    pub notifications: Notifications,
    pub worker: Worker,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    pub discord_webhook_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct Worker {
    pub expired_sweep_interval_secs: u64,
    pub overdue_check_interval_secs: u64,
}
