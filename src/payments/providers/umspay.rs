use crate::config::UmsPaySettings;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentProvider;
use crate::payments::types::{
    validate_amount, NormalizedCallback, ProviderName, StkPushRequest, StkPushResponse,
};
use crate::payments::utils::{classify_outcome, AuthScheme, PaymentHttpClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::info;

/// Status token UmsPay uses for a completed charge in its callbacks.
const COMPLETED_TOKEN: &str = "completed";

#[derive(Debug, Clone)]
pub struct UmsPayConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl UmsPayConfig {
    pub fn from_settings(settings: &UmsPaySettings, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            timeout_secs,
            max_retries,
        }
    }
}

pub struct UmsPayProvider {
    config: UmsPayConfig,
    http: PaymentHttpClient,
}

impl UmsPayProvider {
    pub fn new(config: UmsPayConfig) -> PaymentResult<Self> {
        let http =
            PaymentHttpClient::new(Duration::from_secs(config.timeout_secs), config.max_retries)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_credentials(&self) -> PaymentResult<()> {
        if self.config.api_key.is_empty() {
            return Err(PaymentError::ValidationError {
                message: "UMSPAY_API_KEY is required".to_string(),
                field: Some("umspay".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for UmsPayProvider {
    async fn initiate_stk_push(&self, request: &StkPushRequest) -> PaymentResult<StkPushResponse> {
        self.ensure_credentials()?;
        validate_amount(&request.amount, "amount")?;
        if request.phone.trim().is_empty() {
            return Err(PaymentError::ValidationError {
                message: "phone is required".to_string(),
                field: Some("phone".to_string()),
            });
        }

        let payload = serde_json::json!({
            "amount": request.amount,
            "msisdn": request.phone,
            "reference": request.external_reference,
            "callback_url": request.callback_url,
        });

        let raw: UmsPayInitiateResponse = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/initiatestk"),
                AuthScheme::Bearer(&self.config.api_key),
                Some(&payload),
            )
            .await?;

        if !raw.success {
            return Err(PaymentError::ProviderError {
                provider: "umspay".to_string(),
                message: raw
                    .message
                    .unwrap_or_else(|| "initiation rejected".to_string()),
                provider_code: raw.error_code,
                retryable: false,
            });
        }
        info!(
            external_reference = %request.external_reference,
            transaction_request_id = raw.transaction_request_id.as_deref().unwrap_or(""),
            "umspay STK push initiated"
        );

        Ok(StkPushResponse {
            external_reference: request.external_reference.clone(),
            provider_reference: raw.transaction_request_id.clone(),
            provider_data: Some(serde_json::json!({
                "message": raw.message,
                "transaction_request_id": raw.transaction_request_id,
            })),
        })
    }

    /// UmsPay delivers a flat payload: `{"success": <bool>,
    /// "TransactionReference": ..., "TransactionStatus": "Completed",
    /// "TransactionReceipt": ..., "TransactionAmount": ..., "ResultDesc": ...}`.
    /// Older deliveries carry the key under `reference` instead.
    fn normalize_callback(&self, payload: &JsonValue) -> NormalizedCallback {
        let external_reference = payload
            .get("TransactionReference")
            .or_else(|| payload.get("reference"))
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());
        let indicator = payload.get("success").and_then(json_bool);
        let status = payload.get("TransactionStatus").and_then(|v| v.as_str());
        let amount = payload.get("TransactionAmount").map(json_number_to_string);
        let provider_transaction_id = payload
            .get("TransactionReceipt")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());
        let result_description = payload
            .get("ResultDesc")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());

        NormalizedCallback {
            external_reference,
            outcome: classify_outcome(indicator, status, COMPLETED_TOKEN),
            amount,
            provider_transaction_id,
            result_description,
            provider: Some(ProviderName::UmsPay),
            raw: payload.clone(),
        }
    }

    fn name(&self) -> ProviderName {
        ProviderName::UmsPay
    }
}

/// UmsPay is inconsistent about the indicator type: booleans in current
/// payloads, `"true"`/`"false"` strings in legacy ones.
fn json_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn json_number_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct UmsPayInitiateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    transaction_request_id: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}
