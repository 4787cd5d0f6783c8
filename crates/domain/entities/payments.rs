use anyhow::Result;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::payment_statuses::PaymentStatus,
    infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub reference: String,
    pub customer_email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub webhook_received: bool,
    pub webhook_verified: bool,
    pub gateway_response: serde_json::Value,
    pub metadata: serde_json::Value,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    pub fn payment_status(&self) -> Result<PaymentStatus> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub reference: String,
    pub customer_email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub gateway_response: serde_json::Value,
    pub metadata: serde_json::Value,
}

pub type NewPaymentEntity = InsertPaymentEntity;

/// Columns written when a reconciliation transition is applied.
/// `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
pub struct PaymentTransitionChangeset {
    pub status: String,
    pub webhook_received: Option<bool>,
    pub webhook_verified: Option<bool>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub gateway_response: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransitionChangeset {
    /// Writes the changeset onto an in-memory copy of the row, mirroring the SQL update.
    pub fn apply_to(&self, payment: &mut PaymentEntity) {
        payment.status = self.status.clone();
        if let Some(received) = self.webhook_received {
            payment.webhook_received = received;
        }
        if let Some(verified) = self.webhook_verified {
            payment.webhook_verified = verified;
        }
        if let Some(paid_at) = self.paid_at {
            payment.paid_at = Some(paid_at);
        }
        if let Some(reason) = &self.failure_reason {
            payment.failure_reason = Some(reason.clone());
        }
        payment.gateway_response = self.gateway_response.clone();
        payment.updated_at = self.updated_at;
    }
}
