//! Reconciliation engine: the state machine between an initiated STK push
//! and its terminal answer.
//!
//! A payment leaves `Pending` through exactly one of two doors: a matching
//! callback or the timeout timer. Both doors go through the registry's
//! atomic take-and-remove, so even a callback and a timer firing at the
//! same instant produce a single resolution of the caller's connection.
//! Audit persistence is unconditional and decoupled from resolution: a
//! durable-store failure is logged and never turns into a caller-visible
//! payment failure.

use crate::database::repository::{CallbackStore, LedgerStore};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::{
    CallbackOutcome, NormalizedCallback, ProviderName, RelayOutcome, StkPushRequest,
};
use crate::services::registry::{PendingRequest, Registry, RegistryError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

pub struct ReconciliationEngine {
    registry: Arc<Registry>,
    callbacks: Arc<dyn CallbackStore>,
    ledger: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl ReconciliationEngine {
    pub fn new(
        registry: Arc<Registry>,
        callbacks: Arc<dyn CallbackStore>,
        ledger: Arc<dyn LedgerStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            callbacks,
            ledger,
            timeout,
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Register a payment as pending and schedule its timeout timer.
    ///
    /// Returns the receiver the HTTP handler parks on; the timer
    /// guarantees the receiver completes within the configured window even
    /// if no callback ever arrives.
    pub fn register(
        &self,
        request: &StkPushRequest,
        gateway: ProviderName,
    ) -> PaymentResult<oneshot::Receiver<RelayOutcome>> {
        let (record, receiver) = PendingRequest::new(
            request.external_reference.clone(),
            gateway,
            request.phone.clone(),
            request.amount.clone(),
            request.caller_reference.clone(),
            request.user_id.clone(),
        );

        self.registry.put(record).map_err(|e| match e {
            RegistryError::DuplicateKey(reference) => {
                PaymentError::DuplicateReference { reference }
            }
        })?;

        let registry = self.registry.clone();
        let key = request.external_reference.clone();
        let timeout = self.timeout;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(pending) = registry.take_if_present(&key) {
                warn!(
                    external_reference = %key,
                    timeout_secs = timeout.as_secs(),
                    "no callback received before deadline, resolving as timeout"
                );
                pending.resolve(RelayOutcome::timeout());
            }
        });
        self.registry
            .set_timer(&request.external_reference, timer.abort_handle());

        info!(
            external_reference = %request.external_reference,
            gateway = %gateway,
            "payment registered as pending"
        );
        Ok(receiver)
    }

    /// Process a normalized provider callback.
    ///
    /// Order matters: the callback is persisted first (audit durability is
    /// unconditional), then at most one pending entry is resolved.
    pub async fn handle_callback(&self, callback: NormalizedCallback) {
        if let Err(e) = self.callbacks.record(&callback).await {
            error!(
                error = %e,
                external_reference = callback.external_reference.as_deref().unwrap_or(""),
                "failed to persist callback record"
            );
        }

        let key = match callback.external_reference.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                warn!("callback carried no external reference; persisted for inspection only");
                return;
            }
        };

        // An Unknown outcome carries no verdict either way; keep the
        // payment pending and let a later callback or the timer decide.
        if callback.outcome == CallbackOutcome::Unknown {
            warn!(
                external_reference = %key,
                "callback outcome is unknown; leaving payment pending"
            );
            return;
        }

        let pending = match self.registry.take_if_present(key) {
            Some(pending) => pending,
            None => {
                // Already resolved (duplicate delivery) or timed out.
                info!(
                    external_reference = %key,
                    "callback matched no pending request; persisted only"
                );
                return;
            }
        };

        match callback.outcome {
            CallbackOutcome::Success => {
                let amount = callback
                    .amount
                    .clone()
                    .unwrap_or_else(|| pending.amount.clone());
                if let Some(user_id) = pending.user_id.as_deref() {
                    if let Err(e) = self.ledger.record_success(user_id, &amount, key).await {
                        // Bookkeeping failures are reconciled out-of-band;
                        // the payer still sees success.
                        error!(
                            error = %e,
                            external_reference = %key,
                            "failed to write ledger row for successful payment"
                        );
                    }
                }
                info!(external_reference = %key, "payment confirmed successful");
                pending.resolve(RelayOutcome::success(
                    callback
                        .result_description
                        .clone()
                        .unwrap_or_else(|| "Payment received successfully".to_string()),
                    callback.provider_transaction_id.clone(),
                ));
            }
            CallbackOutcome::Failed => {
                info!(external_reference = %key, "payment confirmed failed");
                pending.resolve(RelayOutcome::failed(
                    callback
                        .result_description
                        .clone()
                        .unwrap_or_else(|| "Payment was not completed".to_string()),
                    callback.provider_transaction_id.clone(),
                ));
            }
            CallbackOutcome::Unknown => unreachable!("handled above"),
        }
    }

    /// Drop a pending registration whose outbound initiation failed. The
    /// handler answers the caller directly with the initiation error; the
    /// held receiver is simply abandoned.
    pub fn abandon(&self, external_reference: &str) {
        if let Some(pending) = self.registry.take_if_present(external_reference) {
            pending.cancel();
        }
    }
}
