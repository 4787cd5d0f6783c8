use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use paygate::domain::value_objects::payments::FieldErrors;
use serde::Serialize;

use crate::usecases::payments::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            error: error.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            PaymentError::InvalidRequest(details) => ErrorResponse {
                details: Some(details),
                ..ErrorResponse::new(status, "Invalid request data")
            },
            PaymentError::MalformedPayload(_) => ErrorResponse::new(status, "Invalid payload"),
            PaymentError::Forbidden => ErrorResponse::new(status, "Invalid signature"),
            PaymentError::UnknownReference => ErrorResponse::new(status, "Payment not found"),
            // Gateway and database causes are logged where they happen, not echoed.
            PaymentError::GatewayUnavailable(_) => {
                ErrorResponse::new(status, "Payment gateway unavailable")
            }
            PaymentError::Gateway(_) => ErrorResponse::new(status, "Payment gateway error"),
            PaymentError::PersistFailure(_) => ErrorResponse::new(status, "Internal server error"),
        };

        (status, Json(body)).into_response()
    }
}

/// Plain-text rendering used for webhook deliveries.
pub fn webhook_error_response(err: &PaymentError) -> Response {
    let text = match err {
        PaymentError::Forbidden => "Invalid signature",
        PaymentError::MalformedPayload(_) => "Invalid payload",
        _ => "Webhook processing failed",
    };
    (err.status_code(), text).into_response()
}
