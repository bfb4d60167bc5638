use crate::config::RelayConfig;
use crate::payments::error::PaymentResult;
use crate::payments::provider::PaymentProvider;
use crate::payments::providers::payhero::{PayHeroConfig, PayHeroProvider};
use crate::payments::providers::umspay::{UmsPayConfig, UmsPayProvider};
use crate::payments::types::ProviderName;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Reserved caller-reference prefix that routes a payment to PayHero.
const PAYHERO_PREFIX: &str = "PH";

/// Gateway selection rule: a pure function of the caller-supplied
/// reference, so a retried request always routes to the same provider.
/// References whose alphanumeric-stripped uppercase form starts with the
/// reserved prefix go to PayHero; everything else defaults to UmsPay.
pub fn route_for_reference(caller_reference: &str) -> ProviderName {
    let stripped: String = caller_reference
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    if stripped.starts_with(PAYHERO_PREFIX) {
        ProviderName::PayHero
    } else {
        ProviderName::UmsPay
    }
}

/// Identify which provider shape an inbound callback payload carries.
/// PayHero wraps its fields in a `response` object; UmsPay delivers a flat
/// `Transaction*` payload. Anything else defaults to UmsPay, whose parser
/// normalizes unrecognized shapes to `Unknown`.
pub fn detect_callback_provider(payload: &JsonValue) -> ProviderName {
    if payload.get("response").is_some() {
        ProviderName::PayHero
    } else {
        ProviderName::UmsPay
    }
}

/// Holds one constructed instance of each supported provider.
///
/// Providers are constructed even when their credentials are missing so
/// callback normalization keeps working; the credential check happens at
/// initiation time.
pub struct ProviderFactory {
    payhero: Arc<PayHeroProvider>,
    umspay: Arc<UmsPayProvider>,
}

impl ProviderFactory {
    pub fn from_config(config: &RelayConfig) -> PaymentResult<Self> {
        let payhero = PayHeroProvider::new(PayHeroConfig::from_settings(
            &config.payhero,
            config.http_timeout_secs,
            config.http_max_retries,
        ))?;
        let umspay = UmsPayProvider::new(UmsPayConfig::from_settings(
            &config.umspay,
            config.http_timeout_secs,
            config.http_max_retries,
        ))?;
        Ok(Self {
            payhero: Arc::new(payhero),
            umspay: Arc::new(umspay),
        })
    }

    pub fn get(&self, provider: ProviderName) -> Arc<dyn PaymentProvider> {
        match provider {
            ProviderName::PayHero => self.payhero.clone(),
            ProviderName::UmsPay => self.umspay.clone(),
        }
    }

    pub fn for_reference(&self, caller_reference: &str) -> Arc<dyn PaymentProvider> {
        self.get(route_for_reference(caller_reference))
    }

    pub fn for_callback(&self, payload: &JsonValue) -> Arc<dyn PaymentProvider> {
        self.get(detect_callback_provider(payload))
    }
}
