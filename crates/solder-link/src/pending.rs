//! The pending-call table.
//!
//! Every in-flight call registers a single-slot completion keyed by its
//! correlation id. The receiving loop resolves the slot when the matching
//! response arrives; responses may arrive in any order. Registration is
//! released through an RAII guard so no slot leaks on timeout,
//! cancellation or error paths, and losing the session fails every
//! outstanding waiter at once.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CallError;

/// Table of outstanding calls, keyed by correlation id.
#[derive(Debug, Default)]
pub struct PendingTable {
    slots: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces a fresh correlation id not colliding with any pending one.
    pub fn allocate(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.slots.lock().contains_key(&id) {
                return id;
            }
        }
    }

    /// Registers a waiter for `id`.
    ///
    /// Fails with [`CallError::DuplicateRegistration`] when `id` already
    /// has a waiter. The returned guard unregisters on drop.
    pub fn register(&self, id: String) -> Result<PendingGuard<'_>, CallError> {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock();
        if slots.contains_key(&id) {
            return Err(CallError::DuplicateRegistration(id));
        }
        slots.insert(id.clone(), tx);
        Ok(PendingGuard {
            table: self,
            id,
            rx: Some(rx),
        })
    }

    /// Delivers `response` to the waiter for `id`.
    ///
    /// Returns `false` when no waiter is registered — either the id is
    /// unknown or a response was already delivered. Both are recoverable
    /// protocol warnings, not failures.
    pub fn resolve(&self, id: &str, response: Value) -> bool {
        let sender = self.slots.lock().remove(id);
        match sender {
            Some(tx) => {
                // The waiter may have timed out between lookup and send.
                let _ = tx.send(response);
                true
            }
            None => false,
        }
    }

    /// Fails every outstanding waiter with a connection-lost error.
    pub fn fail_all(&self) {
        let drained: Vec<_> = {
            let mut slots = self.slots.lock();
            slots.drain().collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing pending calls");
        }
        // Dropping the senders resolves each waiter with a recv error,
        // surfaced to the caller as ConnectionLost.
    }

    /// Number of outstanding calls.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no calls are outstanding.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    fn unregister(&self, id: &str) {
        self.slots.lock().remove(id);
    }
}

/// Registration handle for one pending call.
///
/// Dropping the guard (explicitly or by leaving scope on any path)
/// releases the table slot.
pub struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: String,
    rx: Option<oneshot::Receiver<Value>>,
}

impl PendingGuard<'_> {
    /// The correlation id this guard holds.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the response.
    ///
    /// Resolves with [`CallError::ConnectionLost`] when the table fails
    /// the call because the session ended.
    pub async fn wait(mut self) -> Result<Value, CallError> {
        match self.rx.take() {
            Some(rx) => rx.await.map_err(|_| CallError::ConnectionLost),
            None => Err(CallError::ConnectionLost),
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.unregister(&self.id);
    }
}

/// Logs an unmatched response echo. Split out so the receiving loop reads
/// declaratively.
pub(crate) fn warn_unmatched(id: &str) {
    warn!(echo = %id, "response for unknown correlation id, dropping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allocate_is_unique_among_pending() {
        let table = PendingTable::new();
        let a = table.allocate();
        let b = table.allocate();
        assert_ne!(a, b);
    }

    #[test]
    fn duplicate_registration_fails() {
        let table = PendingTable::new();
        let id = table.allocate();
        let _guard = table.register(id.clone()).unwrap();
        assert!(matches!(
            table.register(id),
            Err(CallError::DuplicateRegistration(_))
        ));
    }

    #[tokio::test]
    async fn resolve_delivers_exactly_once() {
        let table = PendingTable::new();
        let id = table.allocate();
        let guard = table.register(id.clone()).unwrap();

        assert!(table.resolve(&id, json!({"retcode": 0})));
        // Second response for the same id finds no waiter.
        assert!(!table.resolve(&id, json!({"retcode": 1})));

        let value = guard.wait().await.unwrap();
        assert_eq!(value["retcode"], 0);
    }

    #[test]
    fn unknown_id_is_ignored() {
        let table = PendingTable::new();
        assert!(!table.resolve("nope", json!({})));
    }

    #[test]
    fn guard_unregisters_on_drop() {
        let table = PendingTable::new();
        let id = table.allocate();
        {
            let _guard = table.register(id.clone()).unwrap();
            assert_eq!(table.len(), 1);
        }
        assert!(table.is_empty());
        // The slot is free again.
        let _guard = table.register(id).unwrap();
    }

    #[tokio::test]
    async fn fail_all_resolves_every_waiter() {
        let table = PendingTable::new();
        let first = table.register(table.allocate()).unwrap();
        let second = table.register(table.allocate()).unwrap();
        let third = table.register(table.allocate()).unwrap();
        assert_eq!(table.len(), 3);

        table.fail_all();
        assert!(table.is_empty());

        for guard in [first, second, third] {
            assert!(matches!(
                guard.wait().await,
                Err(CallError::ConnectionLost)
            ));
        }
    }
}
