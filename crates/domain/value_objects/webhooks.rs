use serde::Deserialize;
use serde_json::Value;

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

pub const CHARGE_SUCCESS: &str = "charge.success";
pub const CHARGE_FAILED: &str = "charge.failed";

/// Envelope of every Paystack webhook delivery.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaystackWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// The fields of a `charge.*` event's `data` object that reconciliation reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeEventData {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
}

impl PaystackWebhookEvent {
    pub fn charge_data(&self) -> ChargeEventData {
        serde_json::from_value(self.data.clone()).unwrap_or_default()
    }

    /// Non-empty `data.reference`, if present.
    pub fn reference(&self) -> Option<String> {
        self.charge_data()
            .reference
            .map(|reference| reference.trim().to_string())
            .filter(|reference| !reference.is_empty())
    }
}

/// Which webhook events move a payment, and where to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookEventPolicy {
    pub apply_failure_events: bool,
}

impl Default for WebhookEventPolicy {
    fn default() -> Self {
        Self {
            apply_failure_events: true,
        }
    }
}

impl WebhookEventPolicy {
    pub fn target_for(&self, event: &str) -> Option<PaymentStatus> {
        match event {
            CHARGE_SUCCESS => Some(PaymentStatus::Success),
            CHARGE_FAILED if self.apply_failure_events => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// How a verified webhook delivery was acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    Applied { reference: String, status: PaymentStatus },
    AlreadyReconciled { reference: String },
    UnknownReference { reference: String },
    Ignored { event: String },
}
