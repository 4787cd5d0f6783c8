pub mod amounts;
pub mod enums;
pub mod payments;
pub mod reconciliation;
pub mod webhooks;
