//! Adversarial callback payloads: whatever shape arrives, normalization
//! must never classify a payment as successful without an explicit success
//! indicator and a matching completed-status token.

use mpesa_relay::config::{
    PayHeroSettings, RelayConfig, ServerConfig, UmsPaySettings,
};
use mpesa_relay::payments::factory::{detect_callback_provider, ProviderFactory};
use mpesa_relay::payments::types::{CallbackOutcome, ProviderName};
use serde_json::json;
use std::time::Duration;

fn factory() -> ProviderFactory {
    let config = RelayConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        },
        payhero: PayHeroSettings {
            username: "user".to_string(),
            password: "pass".to_string(),
            channel_id: "911".to_string(),
            base_url: "https://backend.payhero.co.ke/api/v2".to_string(),
        },
        umspay: UmsPaySettings {
            api_key: "key".to_string(),
            base_url: "https://api.umeskiasoftwares.com/api/v1".to_string(),
        },
        callback_base_url: "https://relay.example.com".to_string(),
        database_url: None,
        stk_timeout: Duration::from_secs(120),
        http_timeout_secs: 5,
        http_max_retries: 1,
    };
    ProviderFactory::from_config(&config).expect("factory construction should succeed")
}

fn normalize(payload: &serde_json::Value) -> mpesa_relay::payments::types::NormalizedCallback {
    factory().for_callback(payload).normalize_callback(payload)
}

#[test]
fn wrapped_payloads_route_to_payhero_and_flat_payloads_to_umspay() {
    let wrapped = json!({"status": true, "response": {"Status": "Success"}});
    assert_eq!(detect_callback_provider(&wrapped), ProviderName::PayHero);

    let flat = json!({"success": true, "TransactionStatus": "Completed"});
    assert_eq!(detect_callback_provider(&flat), ProviderName::UmsPay);
}

#[test]
fn genuine_confirmations_classify_as_success() {
    let payhero = json!({
        "status": true,
        "response": {
            "ExternalReference": "PHOR4321",
            "Status": "SUCCESS",
            "MpesaReceiptNumber": "SGR3LKJ9Q1",
            "Amount": 500,
            "ResultDesc": "The service request is processed successfully."
        }
    });
    let normalized = normalize(&payhero);
    assert_eq!(normalized.outcome, CallbackOutcome::Success);
    assert_eq!(normalized.provider, Some(ProviderName::PayHero));

    let umspay = json!({
        "success": true,
        "TransactionReference": "ORDE0042",
        "TransactionStatus": "Completed",
        "TransactionReceipt": "RKT12345"
    });
    let normalized = normalize(&umspay);
    assert_eq!(normalized.outcome, CallbackOutcome::Success);
    assert_eq!(normalized.provider, Some(ProviderName::UmsPay));
}

#[test]
fn indicator_and_status_must_both_agree() {
    // Completed status but the indicator says the charge did not go
    // through.
    let contradictory = json!({
        "success": false,
        "TransactionReference": "ORDE0042",
        "TransactionStatus": "Completed"
    });
    assert_eq!(normalize(&contradictory).outcome, CallbackOutcome::Failed);

    // Positive indicator but a non-completed status token.
    let pending_status = json!({
        "success": true,
        "TransactionReference": "ORDE0042",
        "TransactionStatus": "Processing"
    });
    assert_eq!(normalize(&pending_status).outcome, CallbackOutcome::Failed);

    // PayHero: wrapped payload with the outer indicator missing.
    let no_indicator = json!({
        "response": {"ExternalReference": "PHOR4321", "Status": "Success"}
    });
    assert_eq!(normalize(&no_indicator).outcome, CallbackOutcome::Failed);
}

#[test]
fn partial_and_malformed_payloads_never_yield_success() {
    let payloads = [
        json!({}),
        json!({"response": {}}),
        json!({"status": true, "response": {}}),
        json!({"success": true}),
        json!({"TransactionStatus": "Completed", "TransactionReference": "ORDE0042"}),
        json!({"success": "yes", "TransactionStatus": "Completed"}),
        json!([1, 2, 3]),
        json!("free text"),
        json!(null),
    ];
    for payload in &payloads {
        let normalized = normalize(payload);
        assert_ne!(
            normalized.outcome,
            CallbackOutcome::Success,
            "payload must not classify as success: {payload}"
        );
        // The raw payload always survives for the audit trail.
        assert_eq!(&normalized.raw, payload);
    }
}

#[test]
fn callbacks_without_a_correlation_key_still_normalize() {
    let payload = json!({
        "status": true,
        "response": {"Status": "Success", "ResultDesc": "ok"}
    });
    let normalized = normalize(&payload);
    assert!(normalized.external_reference.is_none());
    assert_eq!(normalized.outcome, CallbackOutcome::Success);
}
