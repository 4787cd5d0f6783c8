use std::fmt;

use anyhow::Result;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use tracing::warn;

use crate::domain::value_objects::webhooks::PaystackWebhookEvent;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    MalformedPayload(String),
}

/// Checks `x-paystack-signature`: hex HMAC-SHA512 of the raw body keyed with the shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    keyed: HmacSha512,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self> {
        let keyed = HmacSha512::new_from_slice(secret.as_bytes())
            .map_err(|err| anyhow::anyhow!("invalid webhook secret: {err}"))?;
        Ok(Self { keyed })
    }

    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.keyed.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison. A signature that is not hex, or has the wrong length, is simply invalid.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };
        let mut mac = self.keyed.clone();
        mac.update(payload);
        mac.verify_slice(&provided).is_ok()
    }

    /// Verifies the raw bytes first and only then parses them.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> std::result::Result<PaystackWebhookEvent, WebhookError> {
        if !self.verify(payload, signature) {
            warn!(
                payload_len = payload.len(),
                "webhook_signature: signature verification failed"
            );
            return Err(WebhookError::InvalidSignature);
        }

        serde_json::from_slice::<PaystackWebhookEvent>(payload)
            .map_err(|err| WebhookError::MalformedPayload(err.to_string()))
    }
}
