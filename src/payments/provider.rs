use crate::payments::error::PaymentResult;
use crate::payments::types::{NormalizedCallback, ProviderName, StkPushRequest, StkPushResponse};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Issue the outbound STK-push charge to the provider.
    async fn initiate_stk_push(&self, request: &StkPushRequest) -> PaymentResult<StkPushResponse>;

    /// Normalize a raw callback payload into the canonical shape.
    ///
    /// Must tolerate every optional field being absent and never fail on
    /// malformed input; shapes the parser does not recognize normalize to
    /// an `Unknown` outcome.
    fn normalize_callback(&self, payload: &JsonValue) -> NormalizedCallback;

    fn name(&self) -> ProviderName;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::CallbackOutcome;

    struct MockProvider;

    #[async_trait]
    impl PaymentProvider for MockProvider {
        async fn initiate_stk_push(
            &self,
            request: &StkPushRequest,
        ) -> PaymentResult<StkPushResponse> {
            Ok(StkPushResponse {
                external_reference: request.external_reference.clone(),
                provider_reference: Some("mock_ref".to_string()),
                provider_data: None,
            })
        }

        fn normalize_callback(&self, payload: &JsonValue) -> NormalizedCallback {
            NormalizedCallback::unrecognized(payload.clone())
        }

        fn name(&self) -> ProviderName {
            ProviderName::PayHero
        }
    }

    #[tokio::test]
    async fn trait_can_be_implemented_by_mock_provider() {
        let provider: Box<dyn PaymentProvider> = Box::new(MockProvider);
        let response = provider
            .initiate_stk_push(&StkPushRequest {
                phone: "0712345678".to_string(),
                amount: "500".to_string(),
                external_reference: "ACT11234".to_string(),
                caller_reference: "ACT123".to_string(),
                callback_url: "https://relay.example.com/api/callback".to_string(),
                user_id: None,
            })
            .await
            .expect("initiation should succeed");
        assert_eq!(response.external_reference, "ACT11234");

        let normalized = provider.normalize_callback(&serde_json::json!({}));
        assert_eq!(normalized.outcome, CallbackOutcome::Unknown);
    }
}
