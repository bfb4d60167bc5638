//! Application configuration module
//! Handles environment variable loading and startup validation warnings.

use std::env;
use std::time::Duration;
use tracing::warn;

/// Main relay configuration, sourced from the environment at startup.
///
/// Missing provider credentials are reported as warnings rather than
/// startup failures: the service can still serve status queries and
/// callbacks for the provider that *is* configured.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub payhero: PayHeroSettings,
    pub umspay: UmsPaySettings,
    /// Externally reachable base URL the providers deliver callbacks to.
    pub callback_base_url: String,
    pub database_url: Option<String>,
    /// How long a pending STK push may wait for its confirmation webhook.
    pub stk_timeout: Duration,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PayHeroSettings {
    pub username: String,
    pub password: String,
    pub channel_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct UmsPaySettings {
    pub api_key: String,
    pub base_url: String,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(8000),
            },
            payhero: PayHeroSettings {
                username: env::var("PAYHERO_USERNAME").unwrap_or_default(),
                password: env::var("PAYHERO_PASSWORD").unwrap_or_default(),
                channel_id: env::var("PAYHERO_CHANNEL_ID").unwrap_or_default(),
                base_url: env::var("PAYHERO_BASE_URL")
                    .unwrap_or_else(|_| "https://backend.payhero.co.ke/api/v2".to_string()),
            },
            umspay: UmsPaySettings {
                api_key: env::var("UMSPAY_API_KEY").unwrap_or_default(),
                base_url: env::var("UMSPAY_BASE_URL")
                    .unwrap_or_else(|_| "https://api.umeskiasoftwares.com/api/v1".to_string()),
            },
            callback_base_url: env::var("CALLBACK_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            stk_timeout: Duration::from_secs(
                env::var("STK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(120),
            ),
            http_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
            http_max_retries: env::var("PROVIDER_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(3),
        }
    }

    /// Log a warning for every configuration value the relay would like to
    /// have but can run (degraded) without.
    pub fn warn_missing(&self) {
        if self.payhero.username.is_empty() || self.payhero.password.is_empty() {
            warn!("PAYHERO_USERNAME / PAYHERO_PASSWORD not set; PayHero initiations will fail");
        }
        if self.payhero.channel_id.is_empty() {
            warn!("PAYHERO_CHANNEL_ID not set; PayHero initiations will fail");
        }
        if self.umspay.api_key.is_empty() {
            warn!("UMSPAY_API_KEY not set; UmsPay initiations will fail");
        }
        if self.database_url.is_none() {
            warn!("DATABASE_URL not set; callbacks will not be persisted durably");
        }
        if env::var("CALLBACK_BASE_URL").is_err() {
            warn!(
                default = %self.callback_base_url,
                "CALLBACK_BASE_URL not set; providers will be given a localhost callback URL"
            );
        }
    }

    /// The absolute URL providers should deliver payment callbacks to.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/api/callback",
            self.callback_base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_joins_without_double_slash() {
        let mut config = RelayConfig::from_env();
        config.callback_base_url = "https://relay.example.com/".to_string();
        assert_eq!(
            config.callback_url(),
            "https://relay.example.com/api/callback"
        );
    }
}
