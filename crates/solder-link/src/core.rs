//! Shared connection core.
//!
//! Both connection variants (forward dialing and reverse listening) drive
//! the same core: a state slot holding the lifecycle state together with
//! the bound session (the two always change under one write lock), a
//! watch channel broadcasting every transition, the pending-call table,
//! the event bus, and the generic call plumbing.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{RwLock, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use solder_model::action::{HANDLE_QUICK_OPERATION, QuickOperationParams};
use solder_model::{Action, ApiRequest, ApiResponse, Event};

use crate::bus::EventBus;
use crate::call::{CallPolicy, check_retcode, decode_data, expect_deferred};
use crate::error::{CallError, ConnectionError};
use crate::pending::{PendingTable, warn_unmatched};
use crate::session::Session;

/// Lifecycle state of a connection.
///
/// The forward variant walks `Initialized → Connecting → Connected →
/// Waiting → Connecting → … → Closed`; the reverse variant only uses
/// `Waiting`, `Connected` and `Closed`. `Closed` is terminal in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Created, no connect attempt yet (forward only).
    Initialized,
    /// A connect attempt is in flight (forward only).
    Connecting,
    /// A session is bound.
    Connected,
    /// No session: waiting to retry (forward) or for a peer (reverse).
    Waiting,
    /// Terminal: explicitly closed or retries exhausted.
    Closed,
}

struct Slot {
    state: ConnState,
    session: Option<Session>,
}

pub(crate) struct ConnCore {
    slot: RwLock<Slot>,
    state_tx: watch::Sender<ConnState>,
    pending: PendingTable,
    bus: EventBus,
    call_timeout: Duration,
    shutdown: CancellationToken,
}

impl ConnCore {
    pub(crate) fn new(initial: ConnState, call_timeout: Duration) -> Arc<Self> {
        let (state_tx, _) = watch::channel(initial);
        Arc::new(Self {
            slot: RwLock::new(Slot {
                state: initial,
                session: None,
            }),
            state_tx,
            pending: PendingTable::new(),
            bus: EventBus::new(),
            call_timeout,
            shutdown: CancellationToken::new(),
        })
    }

    pub(crate) fn state(&self) -> ConnState {
        *self.state_tx.borrow()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<ConnState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn pending(&self) -> &PendingTable {
        &self.pending
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) async fn session(&self) -> Option<Session> {
        self.slot.read().await.session.clone()
    }

    /// Moves `Initialized`/`Waiting` to `Connecting`.
    ///
    /// Returns false when the connection closed meanwhile.
    pub(crate) async fn begin_connecting(&self) -> bool {
        let mut slot = self.slot.write().await;
        match slot.state {
            ConnState::Initialized | ConnState::Waiting => {
                slot.state = ConnState::Connecting;
                self.state_tx.send_replace(ConnState::Connecting);
                true
            }
            ConnState::Closed => false,
            unexpected => {
                warn!(state = ?unexpected, "connect attempt from unexpected state");
                false
            }
        }
    }

    /// Binds a session, moving to `Connected`.
    ///
    /// Only legal from one of `from`; otherwise the current state is
    /// returned so the caller can reject the peer with a precise reason.
    pub(crate) async fn try_bind(
        &self,
        session: Session,
        from: &[ConnState],
    ) -> Result<(), ConnState> {
        let mut slot = self.slot.write().await;
        if !from.contains(&slot.state) {
            return Err(slot.state);
        }
        slot.session = Some(session);
        slot.state = ConnState::Connected;
        self.state_tx.send_replace(ConnState::Connected);
        Ok(())
    }

    /// Detaches the session and moves to `next` (unless already closed),
    /// failing every pending call.
    pub(crate) async fn end_session(&self, next: ConnState) {
        {
            let mut slot = self.slot.write().await;
            slot.session = None;
            if slot.state != ConnState::Closed {
                slot.state = next;
                self.state_tx.send_replace(next);
            }
        }
        self.pending.fail_all();
    }

    /// Gracefully closes the bound session with `reason`.
    pub(crate) async fn disconnect(&self, reason: &str) -> Result<(), ConnectionError> {
        let session = self
            .session()
            .await
            .ok_or(ConnectionError::NotConnected)?;
        session
            .close(reason)
            .await
            .map_err(|_| ConnectionError::NotConnected)
    }

    /// Closes the connection for good.
    ///
    /// Fails with [`ConnectionError::AlreadyClosed`] on the second call.
    /// Cancels every background task, fails every pending call and asks
    /// the bound session (if any) to close gracefully.
    pub(crate) async fn close(&self) -> Result<(), ConnectionError> {
        let session = {
            let mut slot = self.slot.write().await;
            if slot.state == ConnState::Closed {
                return Err(ConnectionError::AlreadyClosed);
            }
            slot.state = ConnState::Closed;
            self.state_tx.send_replace(ConnState::Closed);
            slot.session.take()
        };
        if let Some(session) = session {
            let _ = session.close("Connection closed.").await;
        }
        self.shutdown.cancel();
        self.pending.fail_all();
        Ok(())
    }

    /// Waits until the connection is `Connected`.
    ///
    /// Wakes on every state transition (watch broadcast); fails once the
    /// connection reaches its terminal state instead.
    pub(crate) async fn await_connected(&self) -> Result<(), ConnectionError> {
        let mut rx = self.state_tx.subscribe();
        loop {
            match *rx.borrow_and_update() {
                ConnState::Connected => return Ok(()),
                ConnState::Closed => return Err(ConnectionError::AlreadyClosed),
                _ => {}
            }
            if rx.changed().await.is_err() {
                return Err(ConnectionError::AlreadyClosed);
            }
        }
    }

    // -----------------------------------------------------------------
    // Receiving path
    // -----------------------------------------------------------------

    /// Consumes one inbound text frame: either the response to a pending
    /// call, or an event.
    ///
    /// Frames that fail to parse or decode are logged and skipped; the
    /// loop itself only dies with the transport.
    pub(crate) async fn handle_frame(self: &Arc<Self>, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "discarding frame that is not valid JSON");
                return;
            }
        };

        if let Some(echo) = value.get("echo").filter(|echo| !echo.is_null()) {
            let key = match echo {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !self.pending.resolve(&key, value) {
                warn_unmatched(&key);
            }
            return;
        }

        let event = match Event::from_value(value) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "discarding undecodable event frame");
                return;
            }
        };
        if event.is_heartbeat() {
            trace!("heartbeat event");
        } else {
            debug!(event = %event.name(), "received event");
        }

        for operation in self.bus.dispatch(&event) {
            let core = Arc::clone(self);
            let params = QuickOperationParams {
                context: event.raw().clone(),
                operation,
            };
            // Relayed from a task of its own: the answer to this call
            // arrives through the very loop that dispatched the event.
            tokio::spawn(async move {
                if let Err(error) = core.call(&HANDLE_QUICK_OPERATION, &params).await {
                    warn!(%error, "quick operation relay failed");
                }
            });
        }
    }

    // -----------------------------------------------------------------
    // Calling path
    // -----------------------------------------------------------------

    /// Sends one request envelope and awaits its matched response,
    /// classified by return code but not yet by status.
    pub(crate) async fn call_enveloped(
        &self,
        action: &str,
        params: Value,
        policy: CallPolicy,
    ) -> Result<ApiResponse, CallError> {
        let session = self.session().await.ok_or(CallError::NotConnected)?;

        let echo = self.pending.allocate();
        let guard = self.pending.register(echo.clone())?;

        // Unit params serialize to null; the wire wants an object.
        let params = if params.is_null() { json!({}) } else { params };
        let request = ApiRequest {
            action: format!("{}{}", action, policy.suffix()),
            params,
            echo,
        };
        let text = serde_json::to_string(&request)?;

        debug!(action = %request.action, echo = %request.echo, "calling API");
        session.send_text(text).await?;

        let value = match timeout(self.call_timeout, guard.wait()).await {
            Ok(result) => result?,
            Err(_) => return Err(CallError::Timeout),
        };

        let response: ApiResponse = serde_json::from_value(value)?;
        check_retcode(&response)?;
        Ok(response)
    }

    /// Typed call with the default policy.
    pub(crate) async fn call<P, R>(&self, action: &Action<P, R>, params: &P) -> Result<R, CallError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let response = self
            .call_enveloped(action.name(), params, CallPolicy::Default)
            .await?;
        decode_data(response)
    }

    /// Typed call with a deferred policy (`Async` or `RateLimited`).
    pub(crate) async fn call_deferred<P, R>(
        &self,
        action: &Action<P, R>,
        params: &P,
        policy: CallPolicy,
    ) -> Result<(), CallError>
    where
        P: Serialize,
    {
        let params = serde_json::to_value(params)?;
        let response = self
            .call_enveloped(action.name(), params, policy)
            .await?;
        expect_deferred(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn core() -> Arc<ConnCore> {
        ConnCore::new(ConnState::Initialized, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn transitions_broadcast_to_waiters() {
        let core = core();
        assert_eq!(core.state(), ConnState::Initialized);

        let waiter = {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.await_connected().await })
        };

        assert!(core.begin_connecting().await);
        let (session, _rx) = Session::channel(4);
        core.try_bind(session, &[ConnState::Connecting]).await.unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(core.state(), ConnState::Connected);
    }

    #[tokio::test]
    async fn bind_is_rejected_from_wrong_states() {
        let core = core();
        let (session, _rx) = Session::channel(4);
        assert_eq!(
            core.try_bind(session, &[ConnState::Waiting]).await,
            Err(ConnState::Initialized)
        );
    }

    #[tokio::test]
    async fn close_is_not_idempotent() {
        let core = core();
        core.close().await.unwrap();
        assert_eq!(core.state(), ConnState::Closed);
        assert!(matches!(
            core.close().await,
            Err(ConnectionError::AlreadyClosed)
        ));
        assert!(core.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn end_session_never_leaves_closed() {
        let core = core();
        core.close().await.unwrap();
        core.end_session(ConnState::Waiting).await;
        assert_eq!(core.state(), ConnState::Closed);
    }

    #[tokio::test]
    async fn await_connected_fails_once_closed() {
        let core = core();
        let waiter = {
            let core = Arc::clone(&core);
            tokio::spawn(async move { core.await_connected().await })
        };
        core.close().await.unwrap();
        assert!(matches!(
            waiter.await.unwrap(),
            Err(ConnectionError::AlreadyClosed)
        ));
    }

    #[tokio::test]
    async fn disconnect_requires_a_session() {
        let core = core();
        assert!(matches!(
            core.disconnect("bye").await,
            Err(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn call_requires_a_session() {
        let core = core();
        let error = core
            .call_enveloped("get_status", json!({}), CallPolicy::Default)
            .await
            .unwrap_err();
        assert!(matches!(error, CallError::NotConnected));
    }

    #[tokio::test]
    async fn response_frames_resolve_pending_calls() {
        let core = core();
        core.begin_connecting().await;
        let (session, mut out_rx) = Session::channel(16);
        core.try_bind(session, &[ConnState::Connecting]).await.unwrap();

        let caller = {
            let core = Arc::clone(&core);
            tokio::spawn(async move {
                core.call_enveloped("get_status", json!({}), CallPolicy::Default)
                    .await
            })
        };

        // Take the outbound request and echo a response back.
        let frame = out_rx.recv().await.unwrap();
        let request: Value = match frame {
            crate::session::OutboundFrame::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("unexpected frame: {other:?}"),
        };
        assert_eq!(request["action"], "get_status");
        let echo = request["echo"].as_str().unwrap().to_string();

        let response = json!({
            "status": "ok",
            "retcode": 0,
            "data": {"online": true},
            "echo": echo,
        });
        core.handle_frame(&response.to_string()).await;

        let response = caller.await.unwrap().unwrap();
        assert_eq!(response.status, "ok");
        assert!(core.pending().is_empty());
    }

    #[tokio::test]
    async fn event_frames_reach_the_bus() {
        let core = core();
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        {
            let seen = Arc::clone(&seen);
            core.bus().subscribe("message", move |_| {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                None
            });
        }

        core.handle_frame(r#"{"post_type": "message", "message_type": "private"}"#)
            .await;
        // Not JSON and not an event: both skipped without effect.
        core.handle_frame("{oops").await;
        core.handle_frame(r#"{"no_post_type": true}"#).await;

        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmatched_echo_is_dropped() {
        let core = core();
        core.handle_frame(r#"{"status": "ok", "retcode": 0, "echo": "ghost"}"#)
            .await;
        assert!(core.pending().is_empty());
    }
}
