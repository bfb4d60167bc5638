use crate::database::error::DatabaseError;
use crate::database::repository::LedgerStore;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::str::FromStr;

/// One row per confirmed successful payment.
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn record_success(
        &self,
        user_id: &str,
        amount: &str,
        external_reference: &str,
    ) -> Result<(), DatabaseError> {
        let amount = BigDecimal::from_str(amount)
            .map_err(|e| DatabaseError::Decode(format!("invalid ledger amount {amount}: {e}")))?;

        sqlx::query(
            "INSERT INTO payment_ledger (user_id, amount, external_reference)
             VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(amount)
        .bind(external_reference)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}
