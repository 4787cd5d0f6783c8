use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use paygate::{
    domain::{
        entities::payments::{NewPaymentEntity, PaymentEntity},
        repositories::payments::PaymentRepository,
        value_objects::{
            enums::payment_statuses::PaymentStatus,
            payments::{
                FieldErrors, InitializePaymentModel, PaymentCallbackDto, PaymentCallbackQuery,
                PaymentDetailDto, PaymentFilter, PaymentListItemDto, PaymentListQuery,
                PaymentStatsDto, PaymentSummaryDto, PaymentVerificationDto, RECENT_PAYMENTS_LIMIT,
                RecentPaymentDto, generate_reference,
            },
            reconciliation::{
                PaymentTransition, ReconcileOutcome, TransitionSource, target_for_gateway_status,
            },
            webhooks::{WebhookAck, WebhookEventPolicy},
        },
    },
    payments::{
        paystack_client::{
            InitializeTransactionRequest, InitializedTransaction, PaystackClient, PaystackError,
            PaystackResult, VerifiedTransaction,
        },
        webhook_signature::{WebhookError, WebhookVerifier},
    },
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaystackGateway: Send + Sync {
    async fn initialize_transaction(
        &self,
        request: &InitializeTransactionRequest,
    ) -> PaystackResult<InitializedTransaction>;

    async fn verify_transaction(&self, reference: &str) -> PaystackResult<VerifiedTransaction>;
}

#[async_trait]
impl PaystackGateway for PaystackClient {
    async fn initialize_transaction(
        &self,
        request: &InitializeTransactionRequest,
    ) -> PaystackResult<InitializedTransaction> {
        self.initialize_transaction(request).await
    }

    async fn verify_transaction(&self, reference: &str) -> PaystackResult<VerifiedTransaction> {
        self.verify_transaction(reference).await
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid request data")]
    InvalidRequest(FieldErrors),
    #[error("Invalid payload: {0}")]
    MalformedPayload(String),
    #[error("Invalid signature")]
    Forbidden,
    #[error("Payment not found")]
    UnknownReference,
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("payment gateway error: {0}")]
    Gateway(String),
    #[error("failed to persist payment")]
    PersistFailure(#[source] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::InvalidRequest(_) | PaymentError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::Forbidden => StatusCode::FORBIDDEN,
            PaymentError::UnknownReference => StatusCode::NOT_FOUND,
            PaymentError::GatewayUnavailable(_)
            | PaymentError::Gateway(_)
            | PaymentError::PersistFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn required(field: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec!["This field is required.".to_string()]);
        PaymentError::InvalidRequest(errors)
    }
}

impl From<PaystackError> for PaymentError {
    fn from(err: PaystackError) -> Self {
        match err {
            PaystackError::Unavailable(message) | PaystackError::Decode(message) => {
                PaymentError::GatewayUnavailable(message)
            }
            PaystackError::NotFound => PaymentError::UnknownReference,
            PaystackError::InvalidRequest(message) => PaymentError::Gateway(message),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

pub struct PaymentUseCase<R, G>
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    payment_repo: Arc<R>,
    paystack: Arc<G>,
    webhook_verifier: WebhookVerifier,
    webhook_policy: WebhookEventPolicy,
    currency: String,
}

impl<R, G> PaymentUseCase<R, G>
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<R>,
        paystack: Arc<G>,
        webhook_verifier: WebhookVerifier,
        webhook_policy: WebhookEventPolicy,
        currency: String,
    ) -> Self {
        Self {
            payment_repo,
            paystack,
            webhook_verifier,
            webhook_policy,
            currency,
        }
    }

    pub async fn initialize(&self, model: InitializePaymentModel) -> UseCaseResult<PaymentSummaryDto> {
        let request = model.validate().map_err(|errors| {
            info!(fields = ?errors.keys().collect::<Vec<_>>(), "payments: initialize request rejected");
            PaymentError::InvalidRequest(errors)
        })?;

        let reference = generate_reference(Utc::now());
        info!(
            %reference,
            customer_email = %request.email,
            amount_minor = request.amount_minor,
            "payments: initializing payment"
        );

        // No row exists until the gateway has accepted the transaction.
        let initialized = self
            .paystack
            .initialize_transaction(&InitializeTransactionRequest {
                email: request.email.clone(),
                amount: request.amount_minor,
                reference: reference.clone(),
                currency: self.currency.clone(),
                callback_url: request.callback_url.clone(),
                metadata: request.metadata.clone(),
            })
            .await
            .map_err(|err| {
                error!(%reference, gateway_error = %err, "payments: gateway initialize failed");
                PaymentError::from(err)
            })?;

        let payment = self
            .payment_repo
            .create_payment(NewPaymentEntity {
                reference: reference.clone(),
                customer_email: request.email,
                amount_minor: request.amount_minor,
                currency: self.currency.clone(),
                status: PaymentStatus::Pending.to_string(),
                authorization_url: Some(initialized.authorization_url),
                access_code: Some(initialized.access_code),
                gateway_response: json!({ "initialize": initialized.raw }),
                metadata: request.metadata,
            })
            .await
            .map_err(|err| {
                error!(%reference, db_error = ?err, "payments: failed to store initialized payment");
                PaymentError::PersistFailure(err)
            })?;

        info!(%reference, payment_id = %payment.id, "payments: payment initialized");
        Ok(PaymentSummaryDto::from(payment))
    }

    /// Verifies the raw body against the signature before anything else reads it.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<WebhookAck> {
        let Some(signature) = signature else {
            warn!(payload_len = payload.len(), "payments: webhook without signature header");
            return Err(PaymentError::Forbidden);
        };

        let event = self
            .webhook_verifier
            .verify_and_parse(payload, signature)
            .map_err(|err| match err {
                WebhookError::InvalidSignature => PaymentError::Forbidden,
                WebhookError::MalformedPayload(message) => {
                    warn!(error = %message, "payments: signed webhook body is not valid json");
                    PaymentError::MalformedPayload(message)
                }
            })?;

        let Some(target) = self.webhook_policy.target_for(&event.event) else {
            info!(event = %event.event, "payments: webhook event ignored");
            return Ok(WebhookAck::Ignored { event: event.event });
        };

        let Some(reference) = event.reference() else {
            warn!(event = %event.event, "payments: webhook event has no reference");
            return Err(PaymentError::MalformedPayload(
                "data.reference is required".to_string(),
            ));
        };

        let charge = event.charge_data();
        let failure_reason = (target != PaymentStatus::Success).then(|| {
            charge
                .gateway_response
                .clone()
                .unwrap_or_else(|| format!("{} received", event.event))
        });
        let transition = PaymentTransition {
            source: TransitionSource::Webhook,
            target,
            reported_amount_minor: charge.amount,
            failure_reason,
            gateway_payload: event.data.clone(),
        };

        info!(%reference, event = %event.event, target = %target, "payments: reconciling webhook");
        let outcome = self.reconcile(&reference, transition).await?;

        match outcome {
            ReconcileOutcome::Applied(payment) => {
                let status = payment
                    .payment_status()
                    .map_err(PaymentError::PersistFailure)?;
                info!(%reference, %status, "payments: webhook applied");
                Ok(WebhookAck::Applied { reference, status })
            }
            ReconcileOutcome::AlreadyTerminal(payment) | ReconcileOutcome::NotAdvancing(payment) => {
                info!(
                    %reference,
                    status = %payment.status,
                    "payments: webhook already reconciled, nothing to do"
                );
                Ok(WebhookAck::AlreadyReconciled { reference })
            }
            ReconcileOutcome::UnknownReference => {
                warn!(%reference, "payments: webhook for unknown reference acknowledged");
                Ok(WebhookAck::UnknownReference { reference })
            }
        }
    }

    /// Asks the gateway directly. No row lock is held while the gateway call is in flight.
    pub async fn verify(&self, reference: &str) -> UseCaseResult<PaymentVerificationDto> {
        let payment = self.find(reference).await?;

        let verified = self
            .paystack
            .verify_transaction(reference)
            .await
            .map_err(|err| {
                error!(%reference, gateway_error = %err, "payments: gateway verify failed");
                PaymentError::from(err)
            })?;

        let (payment, reconciled) = match target_for_gateway_status(&verified.status) {
            None => {
                info!(
                    %reference,
                    gateway_status = %verified.status,
                    "payments: gateway status has no local transition"
                );
                (payment, false)
            }
            Some(target) => {
                let failure_reason = (target != PaymentStatus::Success).then(|| {
                    verified
                        .gateway_response
                        .clone()
                        .unwrap_or_else(|| format!("gateway reported {}", verified.status))
                });
                let transition = PaymentTransition {
                    source: TransitionSource::Verification,
                    target,
                    reported_amount_minor: Some(verified.amount_minor),
                    failure_reason,
                    gateway_payload: verified.raw.clone(),
                };

                match self.reconcile(reference, transition).await? {
                    ReconcileOutcome::Applied(payment) => {
                        info!(%reference, status = %payment.status, "payments: verification applied");
                        (payment, true)
                    }
                    ReconcileOutcome::AlreadyTerminal(payment)
                    | ReconcileOutcome::NotAdvancing(payment) => (payment, false),
                    ReconcileOutcome::UnknownReference => return Err(PaymentError::UnknownReference),
                }
            }
        };

        Ok(PaymentVerificationDto {
            reference: payment.reference,
            status: payment.status,
            amount: payment.amount_minor,
            currency: payment.currency,
            customer_email: payment.customer_email,
            paid_at: payment.paid_at,
            reconciled,
            verification_data: verified.raw,
        })
    }

    pub async fn list(&self, query: PaymentListQuery) -> UseCaseResult<Vec<PaymentListItemDto>> {
        let filter = query.into_filter().map_err(PaymentError::InvalidRequest)?;
        let payments = self.load_payments(filter).await?;
        info!(count = payments.len(), "payments: list loaded");
        Ok(payments.into_iter().map(PaymentListItemDto::from).collect())
    }

    pub async fn detail(&self, reference: &str) -> UseCaseResult<PaymentDetailDto> {
        let payment = self.find(reference).await?;
        let profile = self
            .payment_repo
            .find_customer_profile(&payment.customer_email)
            .await
            .map_err(|err| {
                error!(%reference, db_error = ?err, "payments: failed to load customer profile");
                PaymentError::PersistFailure(err)
            })?;

        let mut detail = PaymentDetailDto::from(payment);
        detail.customer_payment_status = profile.map(|profile| profile.payment_status);
        Ok(detail)
    }

    pub async fn callback(&self, query: PaymentCallbackQuery) -> UseCaseResult<PaymentCallbackDto> {
        let reference = query
            .resolved_reference()
            .ok_or_else(|| PaymentError::required("reference"))?;
        let payment = self.find(&reference).await?;
        info!(%reference, status = %payment.status, "payments: customer returned from checkout");
        Ok(PaymentCallbackDto::from(payment))
    }

    pub async fn stats(&self) -> UseCaseResult<PaymentStatsDto> {
        let counts = self.payment_repo.count_by_status().await.map_err(|err| {
            error!(db_error = ?err, "payments: failed to count payments");
            PaymentError::PersistFailure(err)
        })?;

        let recent_payments = self
            .load_payments(PaymentFilter {
                limit: RECENT_PAYMENTS_LIMIT,
                ..PaymentFilter::default()
            })
            .await?
            .into_iter()
            .map(RecentPaymentDto::from)
            .collect();

        Ok(PaymentStatsDto::from_counts(counts, recent_payments))
    }

    async fn find(&self, reference: &str) -> UseCaseResult<PaymentEntity> {
        self.payment_repo
            .find_by_reference(reference)
            .await
            .map_err(|err| {
                error!(%reference, db_error = ?err, "payments: failed to load payment");
                PaymentError::PersistFailure(err)
            })?
            .ok_or_else(|| {
                info!(%reference, "payments: payment not found");
                PaymentError::UnknownReference
            })
    }

    async fn load_payments(&self, filter: PaymentFilter) -> UseCaseResult<Vec<PaymentEntity>> {
        self.payment_repo.list_payments(filter).await.map_err(|err| {
            error!(db_error = ?err, "payments: failed to list payments");
            PaymentError::PersistFailure(err)
        })
    }

    async fn reconcile(
        &self,
        reference: &str,
        transition: PaymentTransition,
    ) -> UseCaseResult<ReconcileOutcome> {
        self.payment_repo
            .reconcile(reference, transition)
            .await
            .map_err(|err| {
                error!(%reference, db_error = ?err, "payments: reconciliation was not persisted");
                PaymentError::PersistFailure(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use paygate::domain::{
        entities::customer_profiles::CustomerProfileEntity,
        repositories::payments::MockPaymentRepository,
        value_objects::{
            reconciliation::{TransitionPlan, plan_transition},
            webhooks::CHARGE_SUCCESS,
        },
    };
    use serde_json::Value;
    use uuid::Uuid;

    const WEBHOOK_SECRET: &str = "sk_test_webhook";
    const REFERENCE: &str = "PAY_20240122123456_ABC12345";

    fn pending_payment() -> PaymentEntity {
        let created_at = Utc::now() - Duration::minutes(2);
        PaymentEntity {
            id: Uuid::new_v4(),
            reference: REFERENCE.to_string(),
            customer_email: "a@b.com".to_string(),
            amount_minor: 100_000,
            currency: "NGN".to_string(),
            status: PaymentStatus::Pending.to_string(),
            authorization_url: Some("https://checkout.paystack.com/xyz".to_string()),
            access_code: Some("xyz".to_string()),
            webhook_received: false,
            webhook_verified: false,
            gateway_response: json!({}),
            metadata: json!({}),
            failure_reason: None,
            paid_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn applied(mut payment: PaymentEntity, transition: &PaymentTransition) -> ReconcileOutcome {
        match plan_transition(&payment, transition, Utc::now()).unwrap() {
            TransitionPlan::Apply(changes) => {
                changes.apply_to(&mut payment);
                ReconcileOutcome::Applied(payment)
            }
            TransitionPlan::AlreadyTerminal => ReconcileOutcome::AlreadyTerminal(payment),
            TransitionPlan::NotAdvancing => ReconcileOutcome::NotAdvancing(payment),
        }
    }

    fn usecase(
        repo: MockPaymentRepository,
        gateway: MockPaystackGateway,
    ) -> PaymentUseCase<MockPaymentRepository, MockPaystackGateway> {
        PaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
            WebhookEventPolicy::default(),
            "NGN".to_string(),
        )
    }

    fn signed(body: &Value) -> (Vec<u8>, String) {
        let payload = serde_json::to_vec(body).unwrap();
        let signature = WebhookVerifier::new(WEBHOOK_SECRET).unwrap().sign(&payload);
        (payload, signature)
    }

    fn verified(status: &str, amount_minor: i64) -> VerifiedTransaction {
        VerifiedTransaction {
            reference: REFERENCE.to_string(),
            status: status.to_string(),
            amount_minor,
            currency: "NGN".to_string(),
            paid_at: Some(Utc::now()),
            channel: Some("card".to_string()),
            gateway_response: Some("Approved".to_string()),
            raw: json!({"reference": REFERENCE, "status": status, "amount": amount_minor}),
        }
    }

    #[tokio::test]
    async fn initialize_creates_pending_payment_after_gateway_accepts() {
        let mut gateway = MockPaystackGateway::new();
        gateway
            .expect_initialize_transaction()
            .withf(|request| {
                request.amount == 100_000
                    && request.currency == "NGN"
                    && request.reference.starts_with("PAY_")
                    && request.callback_url.is_none()
            })
            .times(1)
            .returning(|request| {
                Ok(InitializedTransaction {
                    reference: request.reference.clone(),
                    authorization_url: "https://checkout.paystack.com/xyz".to_string(),
                    access_code: "xyz".to_string(),
                    raw: json!({"access_code": "xyz"}),
                })
            });

        let mut repo = MockPaymentRepository::new();
        repo.expect_create_payment()
            .withf(|payment| {
                payment.status == "pending"
                    && payment.amount_minor == 100_000
                    && payment.gateway_response["initialize"]["access_code"] == "xyz"
            })
            .times(1)
            .returning(|payment| {
                let mut entity = pending_payment();
                entity.reference = payment.reference;
                Ok(entity)
            });

        let summary = usecase(repo, gateway)
            .initialize(InitializePaymentModel {
                email: Some(json!("a@b.com")),
                amount: Some(json!("1000.00")),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(summary.reference.starts_with("PAY_"));
        assert_eq!(summary.status, "pending");
        assert_eq!(summary.amount_display, "1000.00");
    }

    #[tokio::test]
    async fn initialize_rejects_invalid_input_without_side_effects() {
        let err = usecase(MockPaymentRepository::new(), MockPaystackGateway::new())
            .initialize(InitializePaymentModel {
                email: Some(json!("invalid-email")),
                amount: Some(json!("invalid-amount")),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            PaymentError::InvalidRequest(errors) => {
                assert!(errors.contains_key("email"));
                assert!(errors.contains_key("amount"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_failure_on_initialize_stores_nothing() {
        let mut gateway = MockPaystackGateway::new();
        gateway
            .expect_initialize_transaction()
            .returning(|_| Err(PaystackError::Unavailable("timed out".to_string())));

        let err = usecase(MockPaymentRepository::new(), gateway)
            .initialize(InitializePaymentModel {
                email: Some(json!("a@b.com")),
                amount: Some(json!(1000)),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::GatewayUnavailable(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn webhook_signature_is_checked_before_anything_else() {
        let body = json!({"event": CHARGE_SUCCESS, "data": {"reference": REFERENCE}});
        let (payload, _) = signed(&body);
        let usecase = usecase(MockPaymentRepository::new(), MockPaystackGateway::new());

        let missing = usecase.handle_webhook(&payload, None).await.unwrap_err();
        assert!(matches!(missing, PaymentError::Forbidden));

        let wrong = usecase
            .handle_webhook(&payload, Some("deadbeef"))
            .await
            .unwrap_err();
        assert_eq!(wrong.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_charge_success_is_applied() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_reconcile()
            .withf(|reference, transition| {
                reference == REFERENCE
                    && transition.source == TransitionSource::Webhook
                    && transition.target == PaymentStatus::Success
                    && transition.reported_amount_minor == Some(100_000)
            })
            .times(1)
            .returning(|_, transition| Ok(applied(pending_payment(), &transition)));

        let (payload, signature) = signed(&json!({
            "event": CHARGE_SUCCESS,
            "data": {"reference": REFERENCE, "amount": 100000, "status": "success"}
        }));
        let ack = usecase(repo, MockPaystackGateway::new())
            .handle_webhook(&payload, Some(&signature))
            .await
            .unwrap();

        assert_eq!(
            ack,
            WebhookAck::Applied {
                reference: REFERENCE.to_string(),
                status: PaymentStatus::Success
            }
        );
    }

    #[tokio::test]
    async fn webhook_without_reference_is_malformed() {
        let (payload, signature) = signed(&json!({"event": CHARGE_SUCCESS, "data": {}}));
        let err = usecase(MockPaymentRepository::new(), MockPaystackGateway::new())
            .handle_webhook(&payload, Some(&signature))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::MalformedPayload(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unhandled_events_are_acknowledged() {
        let (payload, signature) = signed(&json!({"event": "transfer.success", "data": {}}));
        let ack = usecase(MockPaymentRepository::new(), MockPaystackGateway::new())
            .handle_webhook(&payload, Some(&signature))
            .await
            .unwrap();

        assert_eq!(
            ack,
            WebhookAck::Ignored {
                event: "transfer.success".to_string()
            }
        );
    }

    #[tokio::test]
    async fn webhook_persist_failure_is_not_acknowledged() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_reconcile()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));

        let (payload, signature) = signed(&json!({
            "event": CHARGE_SUCCESS,
            "data": {"reference": REFERENCE, "amount": 100000}
        }));
        let err = usecase(repo, MockPaystackGateway::new())
            .handle_webhook(&payload, Some(&signature))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::PersistFailure(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn webhook_for_unknown_reference_is_acknowledged() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_reconcile()
            .returning(|_, _| Ok(ReconcileOutcome::UnknownReference));

        let (payload, signature) = signed(&json!({
            "event": CHARGE_SUCCESS,
            "data": {"reference": "PAY_UNKNOWN"}
        }));
        let ack = usecase(repo, MockPaystackGateway::new())
            .handle_webhook(&payload, Some(&signature))
            .await
            .unwrap();

        assert_eq!(
            ack,
            WebhookAck::UnknownReference {
                reference: "PAY_UNKNOWN".to_string()
            }
        );
    }

    #[tokio::test]
    async fn verify_reconciles_through_the_same_transition() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_reference()
            .withf(|reference| reference == REFERENCE)
            .returning(|_| Ok(Some(pending_payment())));
        repo.expect_reconcile()
            .withf(|_, transition| {
                transition.source == TransitionSource::Verification
                    && transition.target == PaymentStatus::Success
            })
            .times(1)
            .returning(|_, transition| Ok(applied(pending_payment(), &transition)));

        let mut gateway = MockPaystackGateway::new();
        gateway
            .expect_verify_transaction()
            .withf(|reference| reference == REFERENCE)
            .times(1)
            .returning(|_| Ok(verified("success", 100_000)));

        let result = usecase(repo, gateway).verify(REFERENCE).await.unwrap();

        assert!(result.reconciled);
        assert_eq!(result.status, "success");
        assert!(result.paid_at.is_some());
        assert_eq!(result.verification_data["amount"], 100_000);
    }

    #[tokio::test]
    async fn verify_with_unmapped_gateway_status_changes_nothing() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_reference()
            .returning(|_| Ok(Some(pending_payment())));
        repo.expect_reconcile().never();

        let mut gateway = MockPaystackGateway::new();
        gateway
            .expect_verify_transaction()
            .returning(|_| Ok(verified("reversed", 100_000)));

        let result = usecase(repo, gateway).verify(REFERENCE).await.unwrap();
        assert!(!result.reconciled);
        assert_eq!(result.status, "pending");
    }

    #[tokio::test]
    async fn verify_unknown_reference_never_calls_gateway() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_reference().returning(|_| Ok(None));
        let mut gateway = MockPaystackGateway::new();
        gateway.expect_verify_transaction().never();

        let err = usecase(repo, gateway).verify("PAY_NOPE").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn detail_includes_profile_status() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_reference()
            .returning(|_| Ok(Some(pending_payment())));
        repo.expect_find_customer_profile()
            .withf(|email| email == "a@b.com")
            .returning(|email| {
                Ok(Some(CustomerProfileEntity {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    payment_status: "pending".to_string(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }))
            });

        let detail = usecase(repo, MockPaystackGateway::new())
            .detail(REFERENCE)
            .await
            .unwrap();
        assert_eq!(detail.customer_payment_status.as_deref(), Some("pending"));
    }

    #[tokio::test]
    async fn callback_requires_a_reference() {
        let err = usecase(MockPaymentRepository::new(), MockPaystackGateway::new())
            .callback(PaymentCallbackQuery::default())
            .await
            .unwrap_err();

        match err {
            PaymentError::InvalidRequest(errors) => assert!(errors.contains_key("reference")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stats_report_every_status() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_count_by_status().returning(|| {
            Ok(vec![("success".to_string(), 3), ("pending".to_string(), 2)])
        });
        repo.expect_list_payments()
            .withf(|filter| filter.limit == RECENT_PAYMENTS_LIMIT && filter.status.is_none())
            .returning(|_| Ok(vec![pending_payment()]));

        let stats = usecase(repo, MockPaystackGateway::new())
            .stats()
            .await
            .unwrap();

        assert_eq!(stats.total_payments, 5);
        assert_eq!(stats.successful_payments, 3);
        assert_eq!(stats.by_status["success"], 3);
        assert_eq!(stats.by_status["failed"], 0);
        assert_eq!(stats.by_status.len(), PaymentStatus::ALL.len());
        assert_eq!(stats.recent_payments.len(), 1);
    }
}
