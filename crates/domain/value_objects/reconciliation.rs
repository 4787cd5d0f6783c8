use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::{
    entities::payments::{PaymentEntity, PaymentTransitionChangeset},
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    Webhook,
    Verification,
}

impl TransitionSource {
    /// Key under which the gateway payload is kept in `gateway_response`.
    pub fn response_key(&self) -> &'static str {
        match self {
            TransitionSource::Webhook => "webhook",
            TransitionSource::Verification => "verification",
        }
    }
}

/// A gateway-reported state change for one payment reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTransition {
    pub source: TransitionSource,
    pub target: PaymentStatus,
    pub reported_amount_minor: Option<i64>,
    pub failure_reason: Option<String>,
    pub gateway_payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPlan {
    AlreadyTerminal,
    NotAdvancing,
    Apply(PaymentTransitionChangeset),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Applied(PaymentEntity),
    AlreadyTerminal(PaymentEntity),
    NotAdvancing(PaymentEntity),
    UnknownReference,
}

impl ReconcileOutcome {
    pub fn payment(&self) -> Option<&PaymentEntity> {
        match self {
            ReconcileOutcome::Applied(payment)
            | ReconcileOutcome::AlreadyTerminal(payment)
            | ReconcileOutcome::NotAdvancing(payment) => Some(payment),
            ReconcileOutcome::UnknownReference => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied(_))
    }
}

/// Decides what a transition does to the locked row. Callers must hold the row lock
/// between reading `current` and writing the returned changeset.
pub fn plan_transition(
    current: &PaymentEntity,
    transition: &PaymentTransition,
    now: DateTime<Utc>,
) -> Result<TransitionPlan> {
    let current_status = current.payment_status()?;
    if current_status.is_terminal() {
        return Ok(TransitionPlan::AlreadyTerminal);
    }

    let (target, failure_reason) = match (transition.target, transition.reported_amount_minor) {
        (PaymentStatus::Success, Some(reported)) if reported != current.amount_minor => (
            PaymentStatus::Failed,
            Some(format!(
                "amount mismatch: expected {}, got {}",
                current.amount_minor, reported
            )),
        ),
        (target, _) => (target, transition.failure_reason.clone()),
    };

    if !current_status.can_advance_to(target) {
        return Ok(TransitionPlan::NotAdvancing);
    }

    let mut gateway_response = match &current.gateway_response {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    gateway_response.insert(
        transition.source.response_key().to_string(),
        transition.gateway_payload.clone(),
    );

    Ok(TransitionPlan::Apply(PaymentTransitionChangeset {
        status: target.to_string(),
        webhook_received: (transition.source == TransitionSource::Webhook
            && !current.webhook_received)
            .then_some(true),
        webhook_verified: (!current.webhook_verified).then_some(true),
        paid_at: (target == PaymentStatus::Success).then_some(now),
        failure_reason: if target == PaymentStatus::Success {
            None
        } else {
            failure_reason
        },
        gateway_response: Value::Object(gateway_response),
        updated_at: now,
    }))
}

/// Maps the `status` reported by the gateway's verify endpoint.
pub fn target_for_gateway_status(status: &str) -> Option<PaymentStatus> {
    match status.trim().to_ascii_lowercase().as_str() {
        "success" => Some(PaymentStatus::Success),
        "failed" => Some(PaymentStatus::Failed),
        "abandoned" => Some(PaymentStatus::Abandoned),
        "ongoing" | "pending" | "processing" | "queued" => Some(PaymentStatus::Processing),
        _ => None,
    }
}
