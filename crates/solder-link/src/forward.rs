//! Forward (dialing) connections.
//!
//! The connection owns a driver task that dials the bot implementation,
//! binds one session at a time, and retries with the configured delay
//! when the session ends, until the attempt cap is exhausted or the
//! connection is explicitly closed:
//!
//! ```text
//! Initialized → Connecting → Connected → Waiting → Connecting → …
//!                                      └──────────→ Closed (terminal)
//! ```

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::ForwardConfig;
use crate::core::{ConnCore, ConnState};
use crate::error::ConnectionError;
use crate::session::{OutboundFrame, Session};
use crate::watchdog::spawn_watchdog;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connection that dials the bot implementation.
pub struct ForwardWebSocketConnection {
    core: Arc<ConnCore>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ForwardWebSocketConnection {
    /// Starts connecting in the background and returns immediately.
    ///
    /// Use [`await_connected`](Self::await_connected) to block until the
    /// first session binds. Must be called from within a tokio runtime.
    pub fn connect(config: ForwardConfig) -> Self {
        let core = ConnCore::new(ConnState::Initialized, config.call_timeout());
        let driver = tokio::spawn(run_forward(Arc::clone(&core), config));
        Self {
            core,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// Closes the connection for good.
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

    /// Gracefully closes the bound session with `reason`, leaving the
    /// reconnect loop running.
    pub async fn disconnect(&self, reason: &str) -> Result<(), ConnectionError> {
        self.core.disconnect(reason).await
    }
}

crate::api::impl_connection_api!(ForwardWebSocketConnection);

async fn run_forward(core: Arc<ConnCore>, config: ForwardConfig) {
    let mut attempts: u32 = 0;
    loop {
        if !core.begin_connecting().await {
            break;
        }
        attempts += 1;

        match build_request(&config) {
            Ok(request) => match connect_async(request).await {
                Ok((stream, _response)) => {
                    info!(url = %config.url(), "connected to bot implementation");
                    run_session(&core, &config, stream).await;
                }
                Err(error) => {
                    warn!(%error, url = %config.url(), attempt = attempts, "connect attempt failed");
                }
            },
            Err(error) => {
                warn!(%error, "cannot build upgrade request");
            }
        }

        let retries_remain = config
            .max_connect_attempts
            .is_none_or(|max| attempts < max);
        let next = if retries_remain {
            ConnState::Waiting
        } else {
            warn!(attempts, "connect attempts exhausted, giving up");
            ConnState::Closed
        };
        core.end_session(next).await;
        if core.state() == ConnState::Closed {
            break;
        }

        tokio::select! {
            _ = core.shutdown_token().cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_interval()) => {}
        }
    }
}

fn build_request(config: &ForwardConfig) -> Result<Request, tungstenite::Error> {
    let mut request = config.url().into_client_request()?;
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

fn close_frame(reason: &str) -> CloseFrame {
    CloseFrame {
        code: CloseCode::Normal,
        reason: reason.to_string().into(),
    }
}

/// Runs one bound session until the transport ends or the connection is
/// cancelled. The caller decides the follow-up state.
async fn run_session(core: &Arc<ConnCore>, config: &ForwardConfig, stream: WsStream) {
    let (mut sink, mut reader) = stream.split();
    let (session, mut frames) = Session::channel(256);
    if core
        .try_bind(session, &[ConnState::Connecting])
        .await
        .is_err()
    {
        // Closed while the handshake was in flight.
        let _ = sink
            .send(Message::Close(Some(close_frame("Connection closed."))))
            .await;
        return;
    }

    let session_token = core.shutdown_token().child_token();
    let watchdog = config
        .heartbeat_interval()
        .map(|interval| spawn_watchdog(Arc::clone(core), interval, session_token.clone()));

    loop {
        tokio::select! {
            _ = session_token.cancelled() => {
                let _ = sink
                    .send(Message::Close(Some(close_frame("Connection closed."))))
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
                    // Keep reading afterwards until the peer confirms.
                    let _ = sink.send(Message::Close(Some(close_frame(&reason)))).await;
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
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("server ended the session");
                    break;
                }
                Some(Ok(_)) => {}
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_the_bearer_token() {
        let config = ForwardConfig::new("127.0.0.1", 6700)
            .with_path("/ws")
            .with_access_token("secret");
        let request = build_request(&config).unwrap();
        assert_eq!(request.uri().path(), "/ws");
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn request_omits_empty_tokens() {
        let config = ForwardConfig::new("127.0.0.1", 6700).with_access_token("");
        let request = build_request(&config).unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
