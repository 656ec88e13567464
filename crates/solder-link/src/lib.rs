//! # solder-link
//!
//! Connection machinery for the OneBot 11 protocol: transport sessions,
//! the receiving loop, call multiplexing over a single duplex socket,
//! and the two connection state machines (forward dialing and reverse
//! listening) with reconnection, bearer authentication and a heartbeat
//! watchdog.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use solder_link::{ForwardConfig, ForwardWebSocketConnection};
//!
//! let conn = ForwardWebSocketConnection::connect(
//!     ForwardConfig::new("127.0.0.1", 6700).with_access_token("secret"),
//! );
//! conn.await_connected().await?;
//! let message_id = conn.send_private_msg(10001000, "hello").await?;
//! ```

pub mod bus;
pub mod call;
pub mod config;
pub mod error;
pub mod forward;
pub mod pending;
pub mod reverse;
pub mod session;

mod api;
mod core;
mod watchdog;

pub use bus::{EventBus, SubscriptionId};
pub use call::CallPolicy;
pub use config::{ForwardConfig, ReverseConfig};
pub use core::ConnState;
pub use error::{CallError, ConnectionError, SessionError};
pub use forward::ForwardWebSocketConnection;
pub use reverse::ReverseWebSocketConnection;
pub use session::Session;
