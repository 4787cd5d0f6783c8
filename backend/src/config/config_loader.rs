use std::{env, str::FromStr};

use anyhow::{Context, Result, bail};
use paygate::payments::paystack_client::DEFAULT_BASE_URL;

use super::config_model::{BackendServer, Database, DotEnvyConfig, Paystack, Webhook};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| env::var(key).ok())
}

/// Builds the config from any key lookup; `load` uses the process environment.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let optional = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let required = |key: &str| optional(key).with_context(|| format!("{key} is required"));

    let backend_server = BackendServer {
        port: parse_or(&optional, "SERVER_PORT", 8000)?,
        body_limit: parse_or(&optional, "SERVER_BODY_LIMIT", 2)?,
        timeout: parse_or(&optional, "SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let secret_key = required("PAYSTACK_SECRET_KEY")?;
    let paystack = Paystack {
        public_key: optional("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
        base_url: optional("PAYSTACK_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        timeout_secs: parse_or(&optional, "PAYSTACK_TIMEOUT_SECS", 30)?,
        webhook_secret: optional("PAYSTACK_WEBHOOK_SECRET").unwrap_or_else(|| secret_key.clone()),
        currency: optional("PAYMENT_CURRENCY")
            .map(|currency| currency.to_ascii_uppercase())
            .unwrap_or_else(|| "NGN".to_string()),
        secret_key,
    };

    let webhook = Webhook {
        apply_failure_events: match optional("WEBHOOK_APPLY_FAILURE_EVENTS") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("WEBHOOK_APPLY_FAILURE_EVENTS is invalid: {raw}"))?,
            None => true,
        },
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        paystack,
        webhook,
    })
}

fn parse_or<T, F>(optional: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} is invalid: {raw}")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => bail!("expected a boolean"),
    }
}
