use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Payment standing of a customer, independent of any single payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl ProfilePaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfilePaymentStatus::Pending => "pending",
            ProfilePaymentStatus::Completed => "completed",
            ProfilePaymentStatus::Failed => "failed",
            ProfilePaymentStatus::Refunded => "refunded",
        }
    }
}

impl Display for ProfilePaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
