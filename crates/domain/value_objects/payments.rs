use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity,
    value_objects::{amounts, enums::payment_statuses::PaymentStatus},
};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;
pub const RECENT_PAYMENTS_LIMIT: i64 = 5;

/// Field name to the list of problems found with it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// `PAY_<YYYYmmddHHMMSS>_<8 uppercase hex>`
pub fn generate_reference(now: DateTime<Utc>) -> String {
    let unique = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
    format!("PAY_{}_{}", now.format("%Y%m%d%H%M%S"), unique)
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

/// Body of `POST /payments/initiate` before validation. Fields stay untyped so that a
/// wrong JSON type is reported against the field instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializePaymentModel {
    pub email: Option<Value>,
    pub amount: Option<Value>,
    pub callback_url: Option<Value>,
    pub metadata: Option<Value>,
}

fn non_field_error(message: String) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert("non_field_errors".to_string(), vec![message]);
    errors
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPaymentRequest {
    pub email: String,
    pub amount_minor: i64,
    pub callback_url: Option<String>,
    pub metadata: Value,
}

impl InitializePaymentModel {
    /// Parses a raw request body. Anything that is not a JSON object is a non-field error.
    pub fn from_json_body(body: &[u8]) -> Result<Self, FieldErrors> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|err| non_field_error(format!("JSON parse error - {err}")))?;

        if !value.is_object() {
            return Err(non_field_error(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(&value)
            )));
        }

        serde_json::from_value(value).map_err(|err| non_field_error(err.to_string()))
    }

    pub fn validate(self) -> Result<ValidatedPaymentRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut reject = |field: &str, message: String| {
            errors.entry(field.to_string()).or_default().push(message);
        };

        let email = match self.email {
            None | Some(Value::Null) => {
                reject("email", "This field is required.".to_string());
                None
            }
            Some(Value::String(email)) => {
                let email = email.trim().to_string();
                if email.is_empty() {
                    reject("email", "This field may not be blank.".to_string());
                    None
                } else if !is_valid_email(&email) {
                    reject("email", "Enter a valid email address.".to_string());
                    None
                } else {
                    Some(email)
                }
            }
            Some(_) => {
                reject("email", "Not a valid string.".to_string());
                None
            }
        };

        let amount_minor = match &self.amount {
            None | Some(Value::Null) => {
                reject("amount", "This field is required.".to_string());
                None
            }
            Some(raw) => match amounts::major_to_minor(raw) {
                Ok(minor) => Some(minor),
                Err(message) => {
                    reject("amount", message);
                    None
                }
            },
        };

        let callback_url = match self.callback_url {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) => Some(url.trim().to_string()).filter(|url| !url.is_empty()),
            Some(_) => {
                reject("callback_url", "Not a valid string.".to_string());
                None
            }
        };
        if let Some(raw) = callback_url.as_deref() {
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
                _ => reject("callback_url", "Enter a valid URL.".to_string()),
            }
        }

        let metadata = match self.metadata {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(Value::Object(map)) => Value::Object(map),
            Some(_) => {
                reject("metadata", "Expected a dictionary of items.".to_string());
                Value::Null
            }
        };

        match (email, amount_minor) {
            (Some(email), Some(amount_minor)) if errors.is_empty() => Ok(ValidatedPaymentRequest {
                email,
                amount_minor,
                callback_url,
                metadata,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentSummaryDto {
    pub reference: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub amount: i64,
    pub amount_display: String,
    pub currency: String,
    pub customer_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentSummaryDto {
    fn from(payment: PaymentEntity) -> Self {
        Self {
            amount_display: amounts::format_minor(payment.amount_minor),
            reference: payment.reference,
            authorization_url: payment.authorization_url,
            access_code: payment.access_code,
            amount: payment.amount_minor,
            currency: payment.currency,
            customer_email: payment.customer_email,
            status: payment.status,
            created_at: payment.created_at,
        }
    }
}

fn status_display(status: &str) -> String {
    status
        .parse::<PaymentStatus>()
        .map(|status| status.display_name().to_string())
        .unwrap_or_else(|_| status.to_string())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentListItemDto {
    pub id: Uuid,
    pub reference: String,
    pub customer_email: String,
    pub amount: i64,
    pub amount_display: String,
    pub currency: String,
    pub status: String,
    pub status_display: String,
    pub authorization_url: Option<String>,
    pub webhook_received: bool,
    pub webhook_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<PaymentEntity> for PaymentListItemDto {
    fn from(payment: PaymentEntity) -> Self {
        Self {
            id: payment.id,
            amount_display: amounts::format_minor(payment.amount_minor),
            status_display: status_display(&payment.status),
            reference: payment.reference,
            customer_email: payment.customer_email,
            amount: payment.amount_minor,
            currency: payment.currency,
            status: payment.status,
            authorization_url: payment.authorization_url,
            webhook_received: payment.webhook_received,
            webhook_verified: payment.webhook_verified,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
            paid_at: payment.paid_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentDetailDto {
    pub id: Uuid,
    pub reference: String,
    pub customer_email: String,
    pub amount: i64,
    pub amount_display: String,
    pub currency: String,
    pub status: String,
    pub status_display: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub webhook_received: bool,
    pub webhook_verified: bool,
    pub failure_reason: Option<String>,
    pub metadata: Value,
    /// Payment status recorded on the customer's profile, when one exists.
    pub customer_payment_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<PaymentEntity> for PaymentDetailDto {
    fn from(payment: PaymentEntity) -> Self {
        Self {
            id: payment.id,
            amount_display: amounts::format_minor(payment.amount_minor),
            status_display: status_display(&payment.status),
            reference: payment.reference,
            customer_email: payment.customer_email,
            amount: payment.amount_minor,
            currency: payment.currency,
            status: payment.status,
            authorization_url: payment.authorization_url,
            access_code: payment.access_code,
            webhook_received: payment.webhook_received,
            webhook_verified: payment.webhook_verified,
            failure_reason: payment.failure_reason,
            metadata: payment.metadata,
            customer_payment_status: None,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
            paid_at: payment.paid_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentVerificationDto {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub customer_email: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub reconciled: bool,
    pub verification_data: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentCallbackDto {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    pub amount_display: String,
    pub customer_email: String,
    pub message: String,
}

impl From<PaymentEntity> for PaymentCallbackDto {
    fn from(payment: PaymentEntity) -> Self {
        Self {
            amount_display: amounts::format_minor(payment.amount_minor),
            reference: payment.reference,
            status: payment.status,
            amount: payment.amount_minor,
            customer_email: payment.customer_email,
            message: "Callback received successfully".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentPaymentDto {
    pub reference: String,
    pub amount: i64,
    pub amount_display: String,
    pub status: String,
    pub customer_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEntity> for RecentPaymentDto {
    fn from(payment: PaymentEntity) -> Self {
        Self {
            amount_display: amounts::format_minor(payment.amount_minor),
            reference: payment.reference,
            amount: payment.amount_minor,
            status: payment.status,
            customer_email: payment.customer_email,
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentStatsDto {
    pub total_payments: i64,
    pub successful_payments: i64,
    pub pending_payments: i64,
    pub failed_payments: i64,
    /// Every status, zero-filled.
    pub by_status: BTreeMap<String, i64>,
    pub recent_payments: Vec<RecentPaymentDto>,
}

impl PaymentStatsDto {
    /// Builds the dashboard counters from `(status, count)` rows.
    pub fn from_counts(counts: Vec<(String, i64)>, recent_payments: Vec<RecentPaymentDto>) -> Self {
        let mut by_status: BTreeMap<String, i64> = PaymentStatus::ALL
            .iter()
            .map(|status| (status.to_string(), 0))
            .collect();
        for (status, count) in counts {
            *by_status.entry(status).or_default() += count;
        }
        let count_of =
            |status: PaymentStatus| by_status.get(status.as_str()).copied().unwrap_or_default();

        Self {
            total_payments: by_status.values().sum(),
            successful_payments: count_of(PaymentStatus::Success),
            pending_payments: count_of(PaymentStatus::Pending),
            failed_payments: count_of(PaymentStatus::Failed),
            by_status,
            recent_payments,
        }
    }
}

/// Filters for the payment list, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub email: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PaymentFilter {
    fn default() -> Self {
        Self {
            status: None,
            email: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<String>,
    pub email: Option<String>,
    /// Kept as text so a non-numeric value becomes a field error.
    pub limit: Option<String>,
    pub offset: Option<String>,
}

fn parse_integer(raw: Option<&str>, default: i64) -> Result<i64, String> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| "A valid integer is required.".to_string()),
    }
}

impl PaymentListQuery {
    pub fn into_filter(self) -> Result<PaymentFilter, FieldErrors> {
        let mut errors = FieldErrors::new();

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<PaymentStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors
                        .entry("status".to_string())
                        .or_default()
                        .push(format!("\"{raw}\" is not a valid choice."));
                    None
                }
            },
        };

        let limit = match parse_integer(self.limit.as_deref(), DEFAULT_LIST_LIMIT) {
            Ok(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => limit,
            Ok(_) => {
                errors
                    .entry("limit".to_string())
                    .or_default()
                    .push(format!("limit must be between 1 and {MAX_LIST_LIMIT}"));
                DEFAULT_LIST_LIMIT
            }
            Err(message) => {
                errors.entry("limit".to_string()).or_default().push(message);
                DEFAULT_LIST_LIMIT
            }
        };

        let offset = match parse_integer(self.offset.as_deref(), 0) {
            Ok(offset) if offset >= 0 => offset,
            Ok(_) => {
                errors
                    .entry("offset".to_string())
                    .or_default()
                    .push("offset must not be negative".to_string());
                0
            }
            Err(message) => {
                errors.entry("offset".to_string()).or_default().push(message);
                0
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PaymentFilter {
            status,
            email: self
                .email
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
            limit,
            offset,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentCallbackQuery {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

impl PaymentCallbackQuery {
    pub fn resolved_reference(&self) -> Option<String> {
        [self.reference.as_deref(), self.trxref.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|reference| !reference.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn request(body: Value) -> InitializePaymentModel {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn reference_has_timestamp_and_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 1, 22, 12, 34, 56).unwrap();
        let reference = generate_reference(now);

        assert!(reference.starts_with("PAY_20240122123456_"));
        let suffix = reference.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(reference, generate_reference(now));
    }

    #[test]
    fn validates_a_complete_request() {
        let validated = request(json!({
            "email": " customer@example.com ",
            "amount": "1000.00",
            "callback_url": "https://example.com/payment/callback",
            "metadata": {"order_id": 42}
        }))
        .validate()
        .unwrap();

        assert_eq!(validated.email, "customer@example.com");
        assert_eq!(validated.amount_minor, 100_000);
        assert_eq!(
            validated.callback_url.as_deref(),
            Some("https://example.com/payment/callback")
        );
        assert_eq!(validated.metadata, json!({"order_id": 42}));
    }

    #[test]
    fn blank_callback_is_absent_and_metadata_defaults_to_empty() {
        let validated = request(json!({"email": "a@b.com", "amount": 10, "callback_url": ""}))
            .validate()
            .unwrap();
        assert_eq!(validated.callback_url, None);
        assert_eq!(validated.metadata, json!({}));
    }

    #[test]
    fn reports_every_bad_field() {
        let errors = request(json!({
            "email": "invalid-email",
            "amount": "invalid-amount",
            "callback_url": "ftp://example.com",
            "metadata": [1, 2]
        }))
        .validate()
        .unwrap_err();

        let fields: Vec<_> = errors.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["amount", "callback_url", "email", "metadata"]);
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = request(json!({})).validate().unwrap_err();
        assert_eq!(errors["email"], vec!["This field is required.".to_string()]);
        assert_eq!(errors["amount"], vec!["This field is required.".to_string()]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@mail.example.ng"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b..com"));
    }

    #[test]
    fn list_query_defaults_and_validation() {
        let filter = PaymentListQuery::default().into_filter().unwrap();
        assert_eq!(filter, PaymentFilter::default());

        let filter = PaymentListQuery {
            status: Some("success".to_string()),
            email: Some(" Example.COM ".to_string()),
            limit: Some("10".to_string()),
            offset: Some("20".to_string()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(PaymentStatus::Success));
        assert_eq!(filter.email.as_deref(), Some("Example.COM"));

        let errors = PaymentListQuery {
            status: Some("paid".to_string()),
            email: None,
            limit: Some("0".to_string()),
            offset: Some("-1".to_string()),
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn wrong_json_types_are_field_errors() {
        let errors = InitializePaymentModel::from_json_body(
            br#"{"email": 123, "amount": "10.00", "callback_url": false}"#,
        )
        .unwrap()
        .validate()
        .unwrap_err();

        assert_eq!(errors["email"], vec!["Not a valid string.".to_string()]);
        assert_eq!(errors["callback_url"], vec!["Not a valid string.".to_string()]);
        assert!(!errors.contains_key("amount"));
    }

    #[test]
    fn body_must_be_a_json_object() {
        let errors = InitializePaymentModel::from_json_body(b"[1, 2]").unwrap_err();
        assert_eq!(
            errors["non_field_errors"],
            vec!["Invalid data. Expected a dictionary, but got list.".to_string()]
        );

        let errors = InitializePaymentModel::from_json_body(b"email=a@b.com").unwrap_err();
        assert!(errors["non_field_errors"][0].starts_with("JSON parse error"));
    }

    #[test]
    fn blank_email_is_reported_as_blank() {
        let errors = request(json!({"email": "  ", "amount": 10})).validate().unwrap_err();
        assert_eq!(errors["email"], vec!["This field may not be blank.".to_string()]);
    }

    #[test]
    fn non_numeric_paging_is_a_field_error() {
        let errors = PaymentListQuery {
            limit: Some("abc".to_string()),
            offset: Some("1.5".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap_err();

        assert_eq!(errors["limit"], vec!["A valid integer is required.".to_string()]);
        assert_eq!(errors["offset"], vec!["A valid integer is required.".to_string()]);
    }

    #[test]
    fn stats_counters_are_zero_filled() {
        let stats = PaymentStatsDto::from_counts(
            vec![("success".to_string(), 3), ("pending".to_string(), 2)],
            Vec::new(),
        );

        assert_eq!(stats.total_payments, 5);
        assert_eq!(stats.successful_payments, 3);
        assert_eq!(stats.pending_payments, 2);
        assert_eq!(stats.failed_payments, 0);
        assert_eq!(stats.by_status.len(), PaymentStatus::ALL.len());
        assert_eq!(stats.by_status["abandoned"], 0);
    }

    #[test]
    fn callback_reference_falls_back_to_trxref() {
        let query = PaymentCallbackQuery {
            reference: Some(" ".to_string()),
            trxref: Some("PAY_X".to_string()),
        };
        assert_eq!(query.resolved_reference().as_deref(), Some("PAY_X"));
        assert_eq!(PaymentCallbackQuery::default().resolved_reference(), None);
    }
}
