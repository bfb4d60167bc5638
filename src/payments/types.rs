use crate::payments::error::PaymentError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    PayHero,
    UmsPay,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::PayHero => "payhero",
            ProviderName::UmsPay => "umspay",
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "payhero" => Ok(ProviderName::PayHero),
            "umspay" | "ums-pay" => Ok(ProviderName::UmsPay),
            _ => Err(PaymentError::ValidationError {
                message: format!("unsupported provider: {}", value),
                field: Some("provider".to_string()),
            }),
        }
    }
}

/// Validate a caller-supplied decimal amount string.
pub fn validate_amount(amount: &str, field: &str) -> Result<(), PaymentError> {
    let parsed = BigDecimal::from_str(amount).map_err(|_| PaymentError::ValidationError {
        message: format!("invalid decimal amount: {}", amount),
        field: Some(field.to_string()),
    })?;
    if parsed <= BigDecimal::from(0) {
        return Err(PaymentError::ValidationError {
            message: "amount must be greater than zero".to_string(),
            field: Some(field.to_string()),
        });
    }
    Ok(())
}

/// Outbound STK-push initiation, already carrying the relay-generated
/// external reference the provider must echo back in its callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkPushRequest {
    pub phone: String,
    pub amount: String,
    pub external_reference: String,
    pub caller_reference: String,
    pub callback_url: String,
    pub user_id: Option<String>,
}

/// Provider acknowledgement of an initiation. The charge itself is still
/// outstanding; the terminal outcome arrives later via callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkPushResponse {
    pub external_reference: String,
    pub provider_reference: Option<String>,
    pub provider_data: Option<JsonValue>,
}

/// Terminal classification of a provider callback.
///
/// `Success` is only produced when the provider's explicit success
/// indicator and completed-status token both agree; everything partial or
/// ambiguous classifies as `Failed` or `Unknown`, never optimistically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    Success,
    Failed,
    Unknown,
}

impl CallbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackOutcome::Success => "success",
            CallbackOutcome::Failed => "failed",
            CallbackOutcome::Unknown => "unknown",
        }
    }
}

/// Canonical callback shape produced from either provider's raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedCallback {
    pub external_reference: Option<String>,
    pub outcome: CallbackOutcome,
    pub amount: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub result_description: Option<String>,
    pub provider: Option<ProviderName>,
    /// Raw payload preserved verbatim for the audit trail.
    pub raw: JsonValue,
}

impl NormalizedCallback {
    /// Fallback shape for payloads no provider parser recognizes.
    pub fn unrecognized(raw: JsonValue) -> Self {
        Self {
            external_reference: None,
            outcome: CallbackOutcome::Unknown,
            amount: None,
            provider_transaction_id: None,
            result_description: None,
            provider: None,
            raw,
        }
    }
}

/// What the payer ultimately sees for a relayed payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayStatus {
    Success,
    Failed,
    Timeout,
}

impl RelayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStatus::Success => "SUCCESS",
            RelayStatus::Failed => "FAILED",
            RelayStatus::Timeout => "TIMEOUT",
        }
    }
}

/// The single terminal answer delivered into a held-open caller connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayOutcome {
    pub status: RelayStatus,
    pub message: String,
    pub provider_transaction_id: Option<String>,
}

impl RelayOutcome {
    pub fn success(message: impl Into<String>, provider_transaction_id: Option<String>) -> Self {
        Self {
            status: RelayStatus::Success,
            message: message.into(),
            provider_transaction_id,
        }
    }

    pub fn failed(message: impl Into<String>, provider_transaction_id: Option<String>) -> Self {
        Self {
            status: RelayStatus::Failed,
            message: message.into(),
            provider_transaction_id,
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: RelayStatus::Timeout,
            message: "No confirmation received from the payment provider in time".to_string(),
            provider_transaction_id: None,
        }
    }
}
