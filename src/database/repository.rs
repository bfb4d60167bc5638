//! Storage seams for the reconciliation core.
//!
//! The engine talks to durable storage through these traits so the
//! exactly-once machinery can be exercised in tests (and run degraded in
//! production) without a live Postgres.

use crate::database::error::DatabaseError;
use crate::payments::types::NormalizedCallback;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

/// A persisted provider callback; append-only, duplicates allowed,
/// most-recent-wins on query.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CallbackRecord {
    pub id: Uuid,
    pub external_reference: Option<String>,
    pub provider: Option<String>,
    pub status: String,
    pub amount: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub result_description: Option<String>,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CallbackStore: Send + Sync {
    /// Append one callback record. Unconditional: called for duplicates,
    /// post-timeout arrivals and malformed payloads alike.
    async fn record(&self, callback: &NormalizedCallback) -> Result<(), DatabaseError>;

    /// Most recent record for a correlation key, if any.
    async fn latest_for_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<CallbackRecord>, DatabaseError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append one ledger row for a confirmed successful payment.
    async fn record_success(
        &self,
        user_id: &str,
        amount: &str,
        external_reference: &str,
    ) -> Result<(), DatabaseError>;
}

/// Stand-ins used when DATABASE_URL is not configured: the relay keeps
/// resolving callers from memory but every durable write is reduced to a
/// warning.
pub struct NoopCallbackStore;

#[async_trait]
impl CallbackStore for NoopCallbackStore {
    async fn record(&self, callback: &NormalizedCallback) -> Result<(), DatabaseError> {
        warn!(
            external_reference = callback.external_reference.as_deref().unwrap_or(""),
            "dropping callback record: no durable store configured"
        );
        Ok(())
    }

    async fn latest_for_reference(
        &self,
        _external_reference: &str,
    ) -> Result<Option<CallbackRecord>, DatabaseError> {
        Ok(None)
    }
}

pub struct NoopLedgerStore;

#[async_trait]
impl LedgerStore for NoopLedgerStore {
    async fn record_success(
        &self,
        user_id: &str,
        _amount: &str,
        external_reference: &str,
    ) -> Result<(), DatabaseError> {
        warn!(
            user_id = %user_id,
            external_reference = %external_reference,
            "dropping ledger row: no durable store configured"
        );
        Ok(())
    }
}
