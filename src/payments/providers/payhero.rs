use crate::config::PayHeroSettings;
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

/// Status token PayHero uses for a completed charge in its callbacks.
const COMPLETED_TOKEN: &str = "success";

#[derive(Debug, Clone)]
pub struct PayHeroConfig {
    pub username: String,
    pub password: String,
    pub channel_id: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl PayHeroConfig {
    pub fn from_settings(settings: &PayHeroSettings, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            username: settings.username.clone(),
            password: settings.password.clone(),
            channel_id: settings.channel_id.clone(),
            base_url: settings.base_url.clone(),
            timeout_secs,
            max_retries,
        }
    }
}

pub struct PayHeroProvider {
    config: PayHeroConfig,
    http: PaymentHttpClient,
}

impl PayHeroProvider {
    pub fn new(config: PayHeroConfig) -> PaymentResult<Self> {
        let http =
            PaymentHttpClient::new(Duration::from_secs(config.timeout_secs), config.max_retries)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_credentials(&self) -> PaymentResult<()> {
        if self.config.username.is_empty()
            || self.config.password.is_empty()
            || self.config.channel_id.is_empty()
        {
            return Err(PaymentError::ValidationError {
                message: "PAYHERO_USERNAME, PAYHERO_PASSWORD and PAYHERO_CHANNEL_ID are required"
                    .to_string(),
                field: Some("payhero".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for PayHeroProvider {
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
            "phone_number": request.phone,
            "channel_id": self.config.channel_id,
            "provider": "m-pesa",
            "external_reference": request.external_reference,
            "callback_url": request.callback_url,
        });

        let raw: PayHeroInitiateResponse = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/payments"),
                AuthScheme::Basic {
                    username: &self.config.username,
                    password: &self.config.password,
                },
                Some(&payload),
            )
            .await?;

        if !raw.success {
            return Err(PaymentError::ProviderError {
                provider: "payhero".to_string(),
                message: raw
                    .error_message
                    .unwrap_or_else(|| "initiation rejected".to_string()),
                provider_code: None,
                retryable: false,
            });
        }
        info!(
            external_reference = %request.external_reference,
            checkout_request_id = raw.checkout_request_id.as_deref().unwrap_or(""),
            "payhero STK push initiated"
        );

        Ok(StkPushResponse {
            external_reference: request.external_reference.clone(),
            provider_reference: raw.checkout_request_id.clone(),
            provider_data: Some(serde_json::json!({
                "status": raw.status,
                "checkout_request_id": raw.checkout_request_id,
            })),
        })
    }

    /// PayHero delivers `{"status": <bool>, "response": {ExternalReference,
    /// Status, MpesaReceiptNumber, Amount, ResultDesc, ...}}`.
    fn normalize_callback(&self, payload: &JsonValue) -> NormalizedCallback {
        let response = payload.get("response").unwrap_or(payload);

        let external_reference = response
            .get("ExternalReference")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());
        let indicator = payload.get("status").and_then(|v| v.as_bool());
        let status = response.get("Status").and_then(|v| v.as_str());
        let amount = response.get("Amount").map(json_number_to_string);
        let provider_transaction_id = response
            .get("MpesaReceiptNumber")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());
        let result_description = response
            .get("ResultDesc")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string());

        NormalizedCallback {
            external_reference,
            outcome: classify_outcome(indicator, status, COMPLETED_TOKEN),
            amount,
            provider_transaction_id,
            result_description,
            provider: Some(ProviderName::PayHero),
            raw: payload.clone(),
        }
    }

    fn name(&self) -> ProviderName {
        ProviderName::PayHero
    }
}

fn json_number_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct PayHeroInitiateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "CheckoutRequestID", default)]
    checkout_request_id: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::CallbackOutcome;

    fn provider() -> PayHeroProvider {
        PayHeroProvider::new(PayHeroConfig {
            username: "user".to_string(),
            password: "pass".to_string(),
            channel_id: "911".to_string(),
            base_url: "https://backend.payhero.co.ke/api/v2".to_string(),
            timeout_secs: 5,
            max_retries: 1,
        })
        .expect("provider init should succeed")
    }

    #[test]
    fn successful_callback_normalizes_to_success() {
        let payload = serde_json::json!({
            "status": true,
            "response": {
                "Amount": 500,
                "ExternalReference": "ACT11234",
                "MpesaReceiptNumber": "SGR3LKJ9Q1",
                "Phone": "0712345678",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "Status": "Success"
            }
        });
        let normalized = provider().normalize_callback(&payload);
        assert_eq!(normalized.outcome, CallbackOutcome::Success);
        assert_eq!(normalized.external_reference.as_deref(), Some("ACT11234"));
        assert_eq!(
            normalized.provider_transaction_id.as_deref(),
            Some("SGR3LKJ9Q1")
        );
        assert_eq!(normalized.amount.as_deref(), Some("500"));
    }

    #[test]
    fn failed_status_normalizes_to_failed() {
        let payload = serde_json::json!({
            "status": true,
            "response": {
                "ExternalReference": "ACT11234",
                "ResultDesc": "Request cancelled by user",
                "Status": "Failed"
            }
        });
        let normalized = provider().normalize_callback(&payload);
        assert_eq!(normalized.outcome, CallbackOutcome::Failed);
    }

    #[test]
    fn success_status_without_indicator_is_not_success() {
        let payload = serde_json::json!({
            "response": { "ExternalReference": "ACT11234", "Status": "Success" }
        });
        let normalized = provider().normalize_callback(&payload);
        assert_eq!(normalized.outcome, CallbackOutcome::Failed);
    }

    #[test]
    fn shapeless_payload_is_unknown_with_raw_preserved() {
        let payload = serde_json::json!({"unexpected": ["shape"]});
        let normalized = provider().normalize_callback(&payload);
        assert_eq!(normalized.outcome, CallbackOutcome::Unknown);
        assert!(normalized.external_reference.is_none());
        assert_eq!(normalized.raw, payload);
    }

    #[tokio::test]
    async fn initiation_without_credentials_is_a_validation_error() {
        let provider = PayHeroProvider::new(PayHeroConfig {
            username: String::new(),
            password: String::new(),
            channel_id: String::new(),
            base_url: "https://backend.payhero.co.ke/api/v2".to_string(),
            timeout_secs: 5,
            max_retries: 1,
        })
        .expect("provider init should succeed");

        let result = provider
            .initiate_stk_push(&StkPushRequest {
                phone: "0712345678".to_string(),
                amount: "500".to_string(),
                external_reference: "ACT11234".to_string(),
                caller_reference: "ACT123".to_string(),
                callback_url: "https://relay.example.com/api/callback".to_string(),
                user_id: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(PaymentError::ValidationError { .. })
        ));
    }
}
