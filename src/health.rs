use crate::services::registry::Registry;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub database: &'static str,
    pub pending_requests: usize,
    pub timestamp: String,
}

/// Liveness reporting: the relay itself is alive as long as it answers;
/// the database field distinguishes full from degraded (memory-only)
/// operation.
#[derive(Clone)]
pub struct HealthChecker {
    pool: Option<PgPool>,
    registry: Arc<Registry>,
}

impl HealthChecker {
    pub fn new(pool: Option<PgPool>, registry: Arc<Registry>) -> Self {
        Self { pool, registry }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let (database, status) = match self.pool.as_ref() {
            Some(pool) => match crate::database::health_check(pool).await {
                Ok(()) => ("connected", HealthState::Healthy),
                Err(_) => ("unavailable", HealthState::Degraded),
            },
            None => ("disabled", HealthState::Degraded),
        };

        HealthStatus {
            status,
            database,
            pending_requests: self.registry.len(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_pool_reports_degraded() {
        let checker = HealthChecker::new(None, Arc::new(Registry::new()));
        let status = checker.check_health().await;
        assert_eq!(status.status, HealthState::Degraded);
        assert_eq!(status.database, "disabled");
        assert_eq!(status.pending_requests, 0);
    }
}
