//! Status query service for disconnected polling clients.
//!
//! Read-only: consults the durable callback store first, then the pending
//! registry, and never mutates reconciliation state, so it is safe to poll
//! concurrently and arbitrarily often. "Not found" is a normal transient
//! state for a freshly initiated payment, never an error.

use crate::database::repository::CallbackStore;
use crate::payments::error::PaymentResult;
use crate::services::registry::Registry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    pub message: String,
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub verified: bool,
}

impl StatusPayload {
    /// Terminal payloads answer with 200, transient ones with 202.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "SUCCESS" | "FAILED")
    }
}

pub struct StatusService {
    callbacks: Arc<dyn CallbackStore>,
    registry: Arc<Registry>,
}

impl StatusService {
    pub fn new(callbacks: Arc<dyn CallbackStore>, registry: Arc<Registry>) -> Self {
        Self {
            callbacks,
            registry,
        }
    }

    pub async fn get_status(&self, external_reference: &str) -> PaymentResult<StatusPayload> {
        // Durable record first: it survives process restarts and outlives
        // the in-memory pending entry.
        if let Ok(Some(record)) = self.callbacks.latest_for_reference(external_reference).await {
            match record.status.as_str() {
                "success" => {
                    return Ok(StatusPayload {
                        status: "SUCCESS".to_string(),
                        message: record
                            .result_description
                            .unwrap_or_else(|| "Payment received successfully".to_string()),
                        external_reference: external_reference.to_string(),
                        provider: record.provider,
                        provider_transaction_id: record.provider_transaction_id,
                        amount: record.amount,
                        verified: true,
                    })
                }
                "failed" => {
                    return Ok(StatusPayload {
                        status: "FAILED".to_string(),
                        message: record
                            .result_description
                            .unwrap_or_else(|| "Payment was not completed".to_string()),
                        external_reference: external_reference.to_string(),
                        provider: record.provider,
                        provider_transaction_id: record.provider_transaction_id,
                        amount: record.amount,
                        verified: false,
                    })
                }
                // An "unknown" row is inconclusive; fall through to the
                // registry the same way a missing row would.
                _ => {}
            }
        }

        if self.registry.contains(external_reference) {
            return Ok(StatusPayload {
                status: "QUEUED".to_string(),
                message: "Payment is awaiting confirmation from the provider".to_string(),
                external_reference: external_reference.to_string(),
                provider: None,
                provider_transaction_id: None,
                amount: None,
                verified: false,
            });
        }

        Ok(StatusPayload {
            status: "PENDING".to_string(),
            message: "No confirmation recorded yet for this reference".to_string(),
            external_reference: external_reference.to_string(),
            provider: None,
            provider_transaction_id: None,
            amount: None,
            verified: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::error::DatabaseError;
    use crate::database::repository::{CallbackRecord, NoopCallbackStore};
    use crate::payments::types::{NormalizedCallback, ProviderName};
    use crate::services::registry::PendingRequest;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct InMemoryCallbackStore {
        records: Mutex<Vec<CallbackRecord>>,
    }

    impl InMemoryCallbackStore {
        fn with_record(status: &str) -> Self {
            Self {
                records: Mutex::new(vec![CallbackRecord {
                    id: Uuid::new_v4(),
                    external_reference: Some("ACT11234".to_string()),
                    provider: Some("payhero".to_string()),
                    status: status.to_string(),
                    amount: Some("500".to_string()),
                    provider_transaction_id: Some("SGR3LKJ9Q1".to_string()),
                    result_description: None,
                    payload: serde_json::json!({}),
                    created_at: Utc::now(),
                }]),
            }
        }
    }

    #[async_trait]
    impl CallbackStore for InMemoryCallbackStore {
        async fn record(&self, _callback: &NormalizedCallback) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn latest_for_reference(
            &self,
            external_reference: &str,
        ) -> Result<Option<CallbackRecord>, DatabaseError> {
            Ok(self
                .records
                .lock()
                .expect("lock")
                .iter()
                .rev()
                .find(|r| r.external_reference.as_deref() == Some(external_reference))
                .cloned())
        }
    }

    #[tokio::test]
    async fn durable_success_row_wins_and_is_verified() {
        let service = StatusService::new(
            Arc::new(InMemoryCallbackStore::with_record("success")),
            Arc::new(Registry::new()),
        );
        let payload = service.get_status("ACT11234").await.expect("status");
        assert_eq!(payload.status, "SUCCESS");
        assert!(payload.verified);
        assert!(payload.is_terminal());
    }

    #[tokio::test]
    async fn registry_hit_reports_queued() {
        let registry = Arc::new(Registry::new());
        let (record, _rx) = PendingRequest::new(
            "ACT11234".to_string(),
            ProviderName::UmsPay,
            "0712345678".to_string(),
            "500".to_string(),
            "ACT123".to_string(),
            None,
        );
        registry.put(record).expect("put");

        let service = StatusService::new(Arc::new(NoopCallbackStore), registry);
        let payload = service.get_status("ACT11234").await.expect("status");
        assert_eq!(payload.status, "QUEUED");
        assert!(!payload.is_terminal());
    }

    #[tokio::test]
    async fn unknown_reference_is_pending_not_an_error() {
        let service = StatusService::new(Arc::new(NoopCallbackStore), Arc::new(Registry::new()));
        let payload = service.get_status("NOPE0000").await.expect("status");
        assert_eq!(payload.status, "PENDING");
        assert!(!payload.verified);
    }

    #[tokio::test]
    async fn unknown_row_falls_through_to_pending() {
        let service = StatusService::new(
            Arc::new(InMemoryCallbackStore::with_record("unknown")),
            Arc::new(Registry::new()),
        );
        let payload = service.get_status("ACT11234").await.expect("status");
        assert_eq!(payload.status, "PENDING");
    }
}
