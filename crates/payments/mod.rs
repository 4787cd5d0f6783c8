pub mod paystack_client;
pub mod webhook_signature;
