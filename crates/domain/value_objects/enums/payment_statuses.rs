use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Cancelled,
    Abandoned,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 6] = [
        PaymentStatus::Pending,
        PaymentStatus::Processing,
        PaymentStatus::Success,
        PaymentStatus::Failed,
        PaymentStatus::Cancelled,
        PaymentStatus::Abandoned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Abandoned => "abandoned",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::Abandoned => "Abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Success
                | PaymentStatus::Failed
                | PaymentStatus::Cancelled
                | PaymentStatus::Abandoned
        )
    }

    fn rank(&self) -> u8 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::Processing => 1,
            _ => 2,
        }
    }

    /// A status only moves forward, and never away from a terminal state.
    pub fn can_advance_to(&self, next: PaymentStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| anyhow::anyhow!("unknown payment status: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_stored_value() {
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn pending_can_jump_straight_to_a_terminal_state() {
        assert!(PaymentStatus::Pending.can_advance_to(PaymentStatus::Success));
        assert!(PaymentStatus::Pending.can_advance_to(PaymentStatus::Abandoned));
        assert!(PaymentStatus::Pending.can_advance_to(PaymentStatus::Processing));
    }

    #[test]
    fn never_regresses() {
        assert!(!PaymentStatus::Processing.can_advance_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Processing.can_advance_to(PaymentStatus::Processing));
        assert!(PaymentStatus::Processing.can_advance_to(PaymentStatus::Failed));
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
            PaymentStatus::Abandoned,
        ] {
            assert!(terminal.is_terminal());
            for next in PaymentStatus::ALL {
                assert!(!terminal.can_advance_to(next));
            }
        }
    }
}
