//! Reverse (listening) connections.
//!
//! In reverse mode the bot implementation dials us: the connection runs
//! an embedded WebSocket endpoint and admits at most one peer at a time.
//!
//! ```text
//! Waiting ⇄ Connected        (peer attaches / detaches, endpoint relistens)
//!    └──────→ Closed          (explicit close; terminal, listener stopped)
//! ```
//!
//! Upgrade requests are vetted twice: bearer authentication (header or
//! `access_token` query parameter) with a distinct rejection message per
//! failure mode, then peer admission against the current state. A second
//! peer racing past the HTTP check is closed at the WebSocket layer with
//! the same reason.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ReverseConfig;
use crate::core::{ConnCore, ConnState};
use crate::error::ConnectionError;
use crate::session::{OutboundFrame, Session};
use crate::watchdog::spawn_watchdog;

/// A connection that listens for the bot implementation.
pub struct ReverseWebSocketConnection {
    core: Arc<ConnCore>,
    local_addr: SocketAddr,
    driver: Mutex<Option<JoinHandle<()>>>,
}

struct ReverseShared {
    core: Arc<ConnCore>,
    config: ReverseConfig,
}

impl ReverseWebSocketConnection {
    /// Binds the endpoint and starts listening for a peer.
    ///
    /// Port 0 picks a free port; see [`local_addr`](Self::local_addr).
    pub async fn bind(config: ReverseConfig) -> Result<Self, ConnectionError> {
        let core = ConnCore::new(ConnState::Waiting, config.call_timeout());
        let listener =
            tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
        let local_addr = listener.local_addr()?;
        let path = config.normalized_path();

        let shared = Arc::new(ReverseShared {
            core: Arc::clone(&core),
            config,
        });
        let router = Router::new()
            .route(&path, get(upgrade_handler))
            .with_state(shared);

        info!(addr = %local_addr, path = %path, "reverse endpoint listening");

        let token = core.shutdown_token().clone();
        let driver = tokio::spawn(async move {
            let server = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(error) = server.await {
                error!(%error, "reverse endpoint server error");
            }
        });

        Ok(Self {
            core,
            local_addr,
            driver: Mutex::new(Some(driver)),
        })
    }

    /// The address the endpoint actually listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Closes the connection for good, stopping the listener.
    ///
    /// Fails with [`ConnectionError::AlreadyClosed`] when called twice.
    /// All pending calls fail and every background task has ended by the
    /// time this returns.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        self.core.close().await?;
        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            let _ = driver.await;
        }
        Ok(())
    }

    /// Gracefully closes the attached peer session with `reason`; the
    /// endpoint keeps listening for the next peer.
    pub async fn disconnect(&self, reason: &str) -> Result<(), ConnectionError> {
        self.core.disconnect(reason).await
    }
}

crate::api::impl_connection_api!(ReverseWebSocketConnection);

// ---------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------

/// Why an upgrade request failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthRejection {
    /// A token is configured but the request carried none.
    Required,
    /// The `Authorization` header is not a bearer credential.
    Format,
    /// The presented token does not match.
    Token,
}

impl AuthRejection {
    pub(crate) fn message(&self) -> &'static str {
        match self {
            AuthRejection::Required => "Access token required.",
            AuthRejection::Format => "Access token format error.",
            AuthRejection::Token => "Access token error.",
        }
    }
}

/// Validates the bearer credential of an upgrade request.
///
/// The header takes precedence over the query parameter; without a
/// configured token everything passes.
pub(crate) fn authorize(
    expected: Option<&str>,
    header: Option<&str>,
    query: Option<&str>,
) -> Result<(), AuthRejection> {
    let Some(expected) = expected.filter(|token| !token.is_empty()) else {
        return Ok(());
    };
    if let Some(header) = header {
        let Some(token) = header.strip_prefix("Bearer ") else {
            return Err(AuthRejection::Format);
        };
        return if token == expected {
            Ok(())
        } else {
            Err(AuthRejection::Token)
        };
    }
    if let Some(token) = query {
        return if token == expected {
            Ok(())
        } else {
            Err(AuthRejection::Token)
        };
    }
    Err(AuthRejection::Required)
}

// ---------------------------------------------------------------------
// Endpoint plumbing
// ---------------------------------------------------------------------

async fn upgrade_handler(
    State(shared): State<Arc<ReverseShared>>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Err(rejection) = authorize(
        shared.config.access_token.as_deref(),
        header,
        query.get("access_token").map(String::as_str),
    ) {
        warn!(reason = rejection.message(), "rejecting reverse peer");
        return (StatusCode::UNAUTHORIZED, rejection.message()).into_response();
    }

    match shared.core.state() {
        ConnState::Waiting => {}
        ConnState::Connected => {
            warn!("rejecting second reverse peer");
            return (StatusCode::RESET_CONTENT, "Connection already established.").into_response();
        }
        _ => {
            return (StatusCode::RESET_CONTENT, "Connection closed.").into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_peer(shared, socket))
}

async fn handle_peer(shared: Arc<ReverseShared>, socket: WebSocket) {
    let core = &shared.core;
    let (mut sink, mut reader) = socket.split();
    let (session, mut frames) = Session::channel(256);

    if let Err(state) = core.try_bind(session, &[ConnState::Waiting]).await {
        // Lost the admission race between the HTTP check and the upgrade.
        let reason = match state {
            ConnState::Connected => "Connection already established.",
            _ => "Connection closed.",
        };
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: reason.into(),
            })))
            .await;
        return;
    }

    info!("reverse peer attached");
    let session_token = core.shutdown_token().child_token();
    let watchdog = shared
        .config
        .heartbeat_interval()
        .map(|interval| spawn_watchdog(Arc::clone(core), interval, session_token.clone()));

    loop {
        tokio::select! {
            _ = session_token.cancelled() => {
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: "Connection closed.".into(),
                    })))
                    .await;
                break;
            }
            frame = frames.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if let Err(error) = sink.send(Message::Text(text.into())).await {
                        warn!(%error, "failed to send frame");
                        break;
                    }
                }
                Some(OutboundFrame::Close(reason)) => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: reason.into(),
                        })))
                        .await;
                }
                None => break,
            },
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => core.handle_frame(text.as_str()).await,
                Some(Ok(Message::Binary(data))) => {
                    match std::str::from_utf8(&data) {
                        Ok(text) => core.handle_frame(text).await,
                        Err(_) => warn!("discarding non-UTF-8 binary frame"),
                    }
                }
                // The WebSocket layer answers pings on its own.
                Some(Ok(Message::Ping(_)) | Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    debug!("peer ended the session");
                    break;
                }
                Some(Err(error)) => {
                    warn!(%error, "transport error in session");
                    break;
                }
            }
        }
    }

    session_token.cancel();
    if let Some(watchdog) = watchdog {
        let _ = watchdog.await;
    }
    core.end_session(ConnState::Waiting).await;
    info!("reverse peer detached");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_required() {
        assert_eq!(
            authorize(Some("secret"), None, None),
            Err(AuthRejection::Required)
        );
    }

    #[test]
    fn malformed_header_is_a_format_error() {
        assert_eq!(
            authorize(Some("secret"), Some("Token secret"), None),
            Err(AuthRejection::Format)
        );
        assert_eq!(
            authorize(Some("secret"), Some("secret"), None),
            Err(AuthRejection::Format)
        );
    }

    #[test]
    fn wrong_token_is_a_token_error() {
        assert_eq!(
            authorize(Some("secret"), Some("Bearer nope"), None),
            Err(AuthRejection::Token)
        );
        assert_eq!(
            authorize(Some("secret"), None, Some("nope")),
            Err(AuthRejection::Token)
        );
    }

    #[test]
    fn header_and_query_both_authenticate() {
        assert_eq!(authorize(Some("secret"), Some("Bearer secret"), None), Ok(()));
        assert_eq!(authorize(Some("secret"), None, Some("secret")), Ok(()));
    }

    #[test]
    fn no_configured_token_accepts_everything() {
        assert_eq!(authorize(None, None, None), Ok(()));
        assert_eq!(authorize(Some(""), None, None), Ok(()));
        assert_eq!(authorize(None, Some("Bearer whatever"), None), Ok(()));
    }

    #[test]
    fn rejection_messages_are_distinct() {
        let messages = [
            AuthRejection::Required.message(),
            AuthRejection::Format.message(),
            AuthRejection::Token.message(),
        ];
        assert_eq!(
            messages.len(),
            messages.iter().collect::<std::collections::HashSet<_>>().len()
        );
    }
}
