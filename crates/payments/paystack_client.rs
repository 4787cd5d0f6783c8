use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{
    StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaystackError {
    #[error("paystack rejected the request: {0}")]
    InvalidRequest(String),
    #[error("transaction not found at paystack")]
    NotFound,
    #[error("paystack is unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected paystack response: {0}")]
    Decode(String),
}

pub type PaystackResult<T> = std::result::Result<T, PaystackError>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InitializeTransactionRequest {
    pub email: String,
    /// Minor units.
    pub amount: i64,
    pub reference: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializedTransaction {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTransaction {
    pub reference: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub channel: Option<String>,
    pub gateway_response: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
struct PaystackEnvelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    reference: String,
    status: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    paid_at: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    gateway_response: Option<String>,
}

/// Paystack transaction API over reqwest. Calls are never retried here.
pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl PaystackClient {
    pub fn new(secret_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport_error(err: reqwest::Error, context: &str) -> PaystackError {
        // reqwest errors carry the URL, never the headers.
        error!(
            error = %err,
            timeout = err.is_timeout(),
            context = %context,
            "paystack request did not complete"
        );
        PaystackError::Unavailable(format!("{context}: {err}"))
    }

    /// Unwraps the `{status, message, data}` envelope, classifying failures.
    async fn ensure_success(resp: reqwest::Response, context: &str) -> PaystackResult<Value> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| Self::transport_error(err, context))?;
        let envelope = serde_json::from_str::<PaystackEnvelope>(&body).ok();
        let message = envelope
            .as_ref()
            .map(|envelope| envelope.message.clone())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| status.to_string());

        if status.is_server_error() {
            error!(
                status = %status,
                paystack_message = %message,
                context = %context,
                "paystack api request failed"
            );
            return Err(PaystackError::Unavailable(format!(
                "{context}: status {status}"
            )));
        }

        if status == StatusCode::NOT_FOUND
            || (status.is_client_error() && message.to_ascii_lowercase().contains("not found"))
        {
            warn!(status = %status, context = %context, "paystack: transaction not found");
            return Err(PaystackError::NotFound);
        }

        if status.is_client_error() {
            warn!(
                status = %status,
                paystack_message = %message,
                context = %context,
                "paystack api rejected request"
            );
            return Err(PaystackError::InvalidRequest(message));
        }

        let envelope = envelope.ok_or_else(|| {
            error!(status = %status, context = %context, response_body = %body, "paystack: undecodable response");
            PaystackError::Decode(format!("{context}: response is not a paystack envelope"))
        })?;

        if !envelope.status {
            warn!(
                paystack_message = %message,
                context = %context,
                "paystack api returned status=false"
            );
            return Err(PaystackError::InvalidRequest(message));
        }

        Ok(envelope.data)
    }

    /// https://paystack.com/docs/api/transaction/#initialize
    pub async fn initialize_transaction(
        &self,
        request: &InitializeTransactionRequest,
    ) -> PaystackResult<InitializedTransaction> {
        info!(
            reference = %request.reference,
            amount_minor = request.amount,
            currency = %request.currency,
            "paystack: initializing transaction"
        );

        let resp = self
            .http
            .post(self.url("/transaction/initialize"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| Self::transport_error(err, "initialize transaction"))?;
        let data = Self::ensure_success(resp, "initialize transaction").await?;

        let parsed: InitializeData = serde_json::from_value(data.clone())
            .map_err(|err| PaystackError::Decode(format!("initialize transaction: {err}")))?;

        info!(reference = %parsed.reference, "paystack: transaction initialized");
        Ok(InitializedTransaction {
            reference: parsed.reference,
            authorization_url: parsed.authorization_url,
            access_code: parsed.access_code,
            raw: data,
        })
    }

    /// https://paystack.com/docs/api/transaction/#verify
    pub async fn verify_transaction(&self, reference: &str) -> PaystackResult<VerifiedTransaction> {
        info!(%reference, "paystack: verifying transaction");

        let resp = self
            .http
            .get(self.url(&format!("/transaction/verify/{reference}")))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(|err| Self::transport_error(err, "verify transaction"))?;
        let data = Self::ensure_success(resp, "verify transaction").await?;

        let parsed: VerifyData = serde_json::from_value(data.clone())
            .map_err(|err| PaystackError::Decode(format!("verify transaction: {err}")))?;

        info!(
            reference = %parsed.reference,
            status = %parsed.status,
            amount_minor = parsed.amount,
            "paystack: verification result"
        );
        Ok(VerifiedTransaction {
            paid_at: parsed
                .paid_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|paid_at| paid_at.with_timezone(&Utc)),
            reference: parsed.reference,
            status: parsed.status,
            amount_minor: parsed.amount,
            currency: parsed.currency,
            channel: parsed.channel,
            gateway_response: parsed.gateway_response,
            raw: data,
        })
    }
}
