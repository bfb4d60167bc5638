//! In-memory pending-request registry.
//!
//! The single source of truth for "is this payment still outstanding".
//! Volatile by design: a process restart drops every pending entry and the
//! held connections error out or time out client-side. `take_if_present`
//! is the sole mutation primitive both resolution paths use, so whichever
//! of {callback, timer} removes the entry first is the only one that ever
//! touches the response sink.

use crate::payments::types::{ProviderName, RelayOutcome};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("a pending request already exists for reference {0}")]
    DuplicateKey(String),
}

/// A payment awaiting its confirmation webhook.
///
/// Owns the caller's response sink exclusively; `resolve` consumes the
/// record, which makes resolution idempotent by construction — a record
/// can only be taken out of the registry once.
pub struct PendingRequest {
    pub external_reference: String,
    pub gateway: ProviderName,
    pub phone: String,
    pub amount: String,
    pub caller_reference: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    sink: Option<oneshot::Sender<RelayOutcome>>,
    timer: Option<AbortHandle>,
}

impl PendingRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        external_reference: String,
        gateway: ProviderName,
        phone: String,
        amount: String,
        caller_reference: String,
        user_id: Option<String>,
    ) -> (Self, oneshot::Receiver<RelayOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                external_reference,
                gateway,
                phone,
                amount,
                caller_reference,
                user_id,
                created_at: Utc::now(),
                sink: Some(tx),
                timer: None,
            },
            rx,
        )
    }

    /// Deliver the terminal outcome into the held connection and cancel
    /// the paired timeout timer. Consumes the record.
    pub fn resolve(mut self, outcome: RelayOutcome) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(sink) = self.sink.take() {
            if sink.send(outcome).is_err() {
                debug!(
                    external_reference = %self.external_reference,
                    "caller disconnected before resolution"
                );
            }
        }
    }

    /// Drop the record without resolving the caller (used when initiation
    /// fails after registration; the handler answers the caller directly).
    pub fn cancel(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.sink.take();
    }
}

/// Concurrent map from external reference to pending request.
pub struct Registry {
    inner: Mutex<HashMap<String, PendingRequest>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a pending request, rejecting a key that is already in
    /// flight. Reference suffixes repeat every 10 seconds, so a duplicate
    /// here means a genuine collision; rejecting keeps the earlier
    /// payment's correlation intact.
    pub fn put(&self, record: PendingRequest) -> Result<(), RegistryError> {
        let mut map = self.inner.lock().expect("registry mutex poisoned");
        let key = record.external_reference.clone();
        if map.contains_key(&key) {
            return Err(RegistryError::DuplicateKey(key));
        }
        map.insert(key, record);
        Ok(())
    }

    /// Atomic get-and-remove; the serialization point for resolution.
    pub fn take_if_present(&self, key: &str) -> Option<PendingRequest> {
        self.inner
            .lock()
            .expect("registry mutex poisoned")
            .remove(key)
    }

    /// Attach the timeout abort handle to an entry still in the map. The
    /// entry may already have been taken by a fast callback; in that case
    /// the handle is dropped and the timer fires into an empty registry.
    pub fn set_timer(&self, key: &str, handle: AbortHandle) {
        let mut map = self.inner.lock().expect("registry mutex poisoned");
        match map.get_mut(key) {
            Some(record) => record.timer = Some(handle),
            None => handle.abort(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .lock()
            .expect("registry mutex poisoned")
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
