pub mod payment_statuses;
pub mod profile_payment_statuses;
