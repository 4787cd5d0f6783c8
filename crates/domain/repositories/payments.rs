use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::{
        customer_profiles::CustomerProfileEntity,
        payments::{NewPaymentEntity, PaymentEntity},
    },
    value_objects::{
        payments::PaymentFilter,
        reconciliation::{PaymentTransition, ReconcileOutcome},
    },
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    /// Inserts a pending payment and makes sure its customer has a profile.
    async fn create_payment(&self, payment: NewPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentEntity>>;

    /// Newest first.
    async fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<PaymentEntity>>;

    /// `(status, count)` for every status that has at least one payment.
    async fn count_by_status(&self) -> Result<Vec<(String, i64)>>;

    async fn find_customer_profile(&self, email: &str) -> Result<Option<CustomerProfileEntity>>;

    /// Applies `transition` to the payment under an exclusive row lock, at most once.
    async fn reconcile(
        &self,
        reference: &str,
        transition: PaymentTransition,
    ) -> Result<ReconcileOutcome>;
}
