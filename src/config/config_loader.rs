use anyhow::{Context, Result};
use url::Url;

use super::config_model::{
    Auth, Database, DotEnvyConfig, Notifications, Server, Stripe, Worker, WorkerDotEnvyConfig,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    backend_from(&|key| std::env::var(key).ok())
}

pub fn load_worker() -> Result<WorkerDotEnvyConfig> {
    dotenvy::dotenv().ok();
    worker_from(&|key| std::env::var(key).ok())
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn backend_from(env: Lookup) -> Result<DotEnvyConfig> {
    let server = Server {
        port: required(env, "SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is invalid")?,
        body_limit: required(env, "SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required(env, "SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let auth = Auth {
        jwt_secret: required(env, "JWT_SECRET")?,
    };

    Ok(DotEnvyConfig {
        server,
        database: database(env)?,
        auth,
        stripe: stripe(env)?,
        notifications: notifications(env)?,
    })
}

fn worker_from(env: Lookup) -> Result<WorkerDotEnvyConfig> {
    let worker = Worker {
        expired_sweep_interval_secs: env("EXPIRED_SWEEP_INTERVAL")
            .unwrap_or_else(|| "300".to_string())
            .parse()
            .context("EXPIRED_SWEEP_INTERVAL is invalid")?,
        overdue_check_interval_secs: env("OVERDUE_CHECK_INTERVAL")
            .unwrap_or_else(|| "86400".to_string())
            .parse()
            .context("OVERDUE_CHECK_INTERVAL is invalid")?,
    };

    Ok(WorkerDotEnvyConfig {
        database: database(env)?,
        stripe: stripe(env)?,
        notifications: notifications(env)?,
        worker,
    })
}

fn database(env: Lookup) -> Result<Database> {
    Ok(Database {
        url: required(env, "DATABASE_URL")?,
    })
}

fn stripe(env: Lookup) -> Result<Stripe> {
    Ok(Stripe {
        secret_key: required(env, "STRIPE_SECRET_KEY")?,
        success_url: required(env, "STRIPE_SUCCESS_URL")?,
        cancel_url: required(env, "STRIPE_CANCEL_URL")?,
        currency: env("STRIPE_CURRENCY").unwrap_or_else(|| "usd".to_string()),
        timeout_secs: env("STRIPE_TIMEOUT")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("STRIPE_TIMEOUT is invalid")?,
        max_retries: env("STRIPE_MAX_RETRIES")
            .unwrap_or_else(|| "3".to_string())
            .parse()
            .context("STRIPE_MAX_RETRIES is invalid")?,
    })
}

fn notifications(env: Lookup) -> Result<Notifications> {
    let discord_webhook_url = match env("DISCORD_WEBHOOK_URL") {
        Some(raw) if !raw.trim().is_empty() => {
            Some(Url::parse(raw.trim()).context("DISCORD_WEBHOOK_URL is invalid")?)
        }
        _ => None,
    };

    Ok(Notifications {
        discord_webhook_url,
    })
}

fn required(env: Lookup, key: &str) -> Result<String> {
    env(key).with_context(|| format!("{key} is not set"))
}
