//! # solder
//!
//! Application-side OneBot 11 client library: a JSON-over-WebSocket
//! connection to a bot implementation, in either direction.
//!
//! - [`ForwardWebSocketConnection`] dials the implementation and
//!   reconnects with a configurable policy.
//! - [`ReverseWebSocketConnection`] listens and admits one implementation
//!   peer at a time, with bearer authentication.
//!
//! Both expose the same surface: the typed generic call facade
//! ([`Action`] constants live in [`action`]), per-action convenience
//! methods, an event sink with quick-operation relay, and a heartbeat
//! watchdog.
//!
//! ```rust,ignore
//! use solder::{ForwardConfig, ForwardWebSocketConnection, Message};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let conn = ForwardWebSocketConnection::connect(
//!         ForwardConfig::new("127.0.0.1", 6700).with_path("/ws"),
//!     );
//!     conn.await_connected().await?;
//!
//!     conn.on_event("message.private", |event| {
//!         Some(serde_json::json!({"reply": "pong"}))
//!     });
//!
//!     conn.send_private_msg(10001000, Message::text("hello")).await?;
//!     Ok(())
//! }
//! ```

pub use solder_link::{
    CallError, CallPolicy, ConnState, ConnectionError, EventBus, ForwardConfig,
    ForwardWebSocketConnection, ReverseConfig, ReverseWebSocketConnection, Session, SessionError,
    SubscriptionId,
};
pub use solder_model::{
    Action, ApiRequest, ApiResponse, Event, EventError, Message, RawMessage, Segment,
};

pub use solder_model::action;
pub use solder_model::cq;
pub use solder_model::event;
pub use solder_model::retcode;
pub use solder_model::segment;
