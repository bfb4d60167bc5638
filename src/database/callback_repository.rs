use crate::database::error::DatabaseError;
use crate::database::repository::{CallbackRecord, CallbackStore};
use crate::payments::types::NormalizedCallback;
use async_trait::async_trait;
use sqlx::PgPool;

/// Append-only store for every received webhook, keyed by correlation key
/// with multiple rows allowed per key.
pub struct CallbackRepository {
    pool: PgPool,
}

impl CallbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallbackStore for CallbackRepository {
    async fn record(&self, callback: &NormalizedCallback) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO payment_callbacks
                 (external_reference, provider, status, amount,
                  provider_transaction_id, result_description, payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(callback.external_reference.as_deref())
        .bind(callback.provider.map(|p| p.as_str()))
        .bind(callback.outcome.as_str())
        .bind(callback.amount.as_deref())
        .bind(callback.provider_transaction_id.as_deref())
        .bind(callback.result_description.as_deref())
        .bind(&callback.raw)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn latest_for_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<CallbackRecord>, DatabaseError> {
        sqlx::query_as::<_, CallbackRecord>(
            "SELECT id, external_reference, provider, status, amount,
                    provider_transaction_id, result_description, payload, created_at
             FROM payment_callbacks
             WHERE external_reference = $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
