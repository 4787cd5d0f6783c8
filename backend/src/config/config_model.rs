use std::fmt;

use paygate::domain::value_objects::webhooks::WebhookEventPolicy;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub paystack: Paystack,
    pub webhook: Webhook,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// Seconds
    pub timeout: u64,
}

#[derive(Clone)]
pub struct Database {
    pub url: String,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URL usually embeds the password.
        f.debug_struct("Database").field("url", &"<redacted>").finish()
    }
}

#[derive(Clone)]
pub struct Paystack {
    pub secret_key: String,
    pub public_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub webhook_secret: String,
    pub currency: String,
}

impl fmt::Debug for Paystack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paystack")
            .field("secret_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("webhook_secret", &"<redacted>")
            .field("currency", &self.currency)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Webhook {
    pub apply_failure_events: bool,
}

impl Webhook {
    pub fn policy(&self) -> WebhookEventPolicy {
        WebhookEventPolicy {
            apply_failure_events: self.apply_failure_events,
        }
    }
}
