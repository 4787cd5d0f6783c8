use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use paygate::{
    domain::{
        repositories::payments::PaymentRepository,
        value_objects::{
            payments::{InitializePaymentModel, PaymentCallbackQuery, PaymentListQuery},
            webhooks::WebhookAck,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::payments::PaymentPostgres,
    },
    payments::{paystack_client::PaystackClient, webhook_signature::WebhookVerifier},
};

use crate::{
    axum_http::error_responses::webhook_error_response,
    config::config_model::DotEnvyConfig,
    usecases::payments::{PaymentError, PaymentUseCase, PaystackGateway},
};
use tracing::info;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const FALLBACK_SIGNATURE_HEADER: &str = "x-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Result<Router> {
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let paystack_client = PaystackClient::new(
        config.paystack.secret_key.clone(),
        config.paystack.base_url.clone(),
        Duration::from_secs(config.paystack.timeout_secs),
    )?;
    let webhook_verifier = WebhookVerifier::new(&config.paystack.webhook_secret)?;

    let payments_usecase = PaymentUseCase::new(
        Arc::new(payment_repository),
        Arc::new(paystack_client),
        webhook_verifier,
        config.webhook.policy(),
        config.paystack.currency.clone(),
    );

    Ok(router(Arc::new(payments_usecase)))
}

pub fn router<R, G>(payments_usecase: Arc<PaymentUseCase<R, G>>) -> Router
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_payments))
        .route("/initiate", post(initiate_payment))
        .route("/webhook", post(paystack_webhook))
        .route("/verify/:reference", get(verify_payment))
        .route("/callback", get(payment_callback))
        .route("/stats", get(payment_stats))
        .route("/:reference", get(payment_detail))
        .with_state(payments_usecase)
}

/// Takes the raw body so that malformed or mistyped JSON still gets the field-error shape.
pub async fn initiate_payment<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
    body: Bytes,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    let model = match InitializePaymentModel::from_json_body(&body) {
        Ok(model) => model,
        Err(errors) => {
            info!(body_len = body.len(), "payments router: initiate body is not a json object");
            return PaymentError::InvalidRequest(errors).into_response();
        }
    };

    match payments_usecase.initialize(model).await {
        Ok(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn paystack_webhook<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(FALLBACK_SIGNATURE_HEADER))
        .and_then(|value| value.to_str().ok());

    match payments_usecase.handle_webhook(&body, signature).await {
        Ok(WebhookAck::Ignored { .. }) => (StatusCode::OK, "Event ignored").into_response(),
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => webhook_error_response(&err),
    }
}

pub async fn verify_payment<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
    Path(reference): Path<String>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    match payments_usecase.verify(&reference).await {
        Ok(verification) => Json(verification).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_payments<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
    Query(query): Query<PaymentListQuery>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    match payments_usecase.list(query).await {
        Ok(payments) => Json(payments).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn payment_detail<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
    Path(reference): Path<String>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    match payments_usecase.detail(&reference).await {
        Ok(detail) => Json(detail).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn payment_callback<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
    Query(query): Query<PaymentCallbackQuery>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    match payments_usecase.callback(query).await {
        Ok(callback) => Json(callback).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn payment_stats<R, G>(
    State(payments_usecase): State<Arc<PaymentUseCase<R, G>>>,
) -> Response
where
    R: PaymentRepository + Send + Sync + 'static,
    G: PaystackGateway + Send + Sync + 'static,
{
    match payments_usecase.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => err.into_response(),
    }
}
