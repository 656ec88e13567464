//! # solder-model
//!
//! Wire data model for the OneBot 11 protocol: message segments, the
//! polymorphic message codec (array, single-segment and legacy CQ string
//! shapes), event frames, and the typed action registry with its call
//! envelopes.
//!
//! This crate is transport-agnostic; the connection machinery lives in
//! `solder-link`.

pub mod action;
pub mod cq;
pub mod event;
pub mod message;
pub mod retcode;
pub mod segment;

pub use action::{Action, ApiRequest, ApiResponse};
pub use cq::{escape_text, escape_value, parse_cq_string, segment_to_cq, unescape_text, unescape_value};
pub use event::{
    AnonymousSender, Event, EventError, FriendRequestEvent, GroupRequestEvent, HeartbeatEvent,
    LifecycleEvent, MessageEvent, Sender,
};
pub use message::{Message, RawMessage};
pub use segment::Segment;
