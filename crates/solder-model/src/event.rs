//! Inbound event frames.
//!
//! Every unsolicited frame from the bot implementation is an event. The
//! frame keeps its raw JSON object and derives a dotted name from
//! `post_type` plus the per-family subtype field, e.g. `message.group` or
//! `meta_event.heartbeat`. Typed views can be decoded on demand.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::message::Message;

/// Error raised when a frame cannot be treated as an event.
#[derive(Debug, Clone, Error)]
pub enum EventError {
    /// The frame has no string `post_type` field.
    #[error("event frame has no `post_type` field")]
    MissingPostType,
    /// The frame is not a JSON object.
    #[error("event frame is not a JSON object")]
    NotAnObject,
}

/// A decoded unsolicited frame.
#[derive(Debug, Clone)]
pub struct Event {
    raw: Value,
    name: String,
}

impl Event {
    /// Classifies a raw JSON value as an event.
    ///
    /// Fails when the value is not an object or lacks `post_type`; the
    /// caller treats that as a recoverable decode problem.
    pub fn from_value(raw: Value) -> Result<Self, EventError> {
        if !raw.is_object() {
            return Err(EventError::NotAnObject);
        }
        let post_type = raw
            .get("post_type")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingPostType)?;

        let subtype_key = match post_type {
            "message" => Some("message_type"),
            "notice" => Some("notice_type"),
            "request" => Some("request_type"),
            "meta_event" => Some("meta_event_type"),
            _ => None,
        };
        let name = match subtype_key
            .and_then(|key| raw.get(key))
            .and_then(Value::as_str)
        {
            Some(subtype) => format!("{post_type}.{subtype}"),
            None => post_type.to_string(),
        };

        Ok(Self { raw, name })
    }

    /// The dotted event name, e.g. `message.private`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unix timestamp of the event.
    pub fn time(&self) -> i64 {
        self.raw.get("time").and_then(Value::as_i64).unwrap_or(0)
    }

    /// Id of the bot account the event belongs to.
    pub fn self_id(&self) -> i64 {
        self.raw.get("self_id").and_then(Value::as_i64).unwrap_or(0)
    }

    /// The raw JSON object.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Consumes the event, returning the raw JSON object.
    pub fn into_value(self) -> Value {
        self.raw
    }

    /// Whether this is a heartbeat meta event.
    pub fn is_heartbeat(&self) -> bool {
        self.name == "meta_event.heartbeat"
    }

    /// Decodes a typed view of the frame.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.raw.clone())
    }
}

/// Message sender information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
    /// `"male"`, `"female"` or `"unknown"`.
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    /// Group card, group messages only.
    #[serde(default)]
    pub card: Option<String>,
    /// Group role (`"owner"`, `"admin"`, `"member"`), group messages only.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Anonymous sender information of an anonymous group message.
#[derive(Debug, Clone, Deserialize)]
pub struct AnonymousSender {
    pub id: i64,
    pub name: String,
    /// Flag usable with `set_group_anonymous_ban`.
    pub flag: String,
}

/// Typed view of `message.*` events; `group_id` distinguishes group from
/// private messages.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub time: i64,
    pub self_id: i64,
    pub message_type: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    pub message_id: i32,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    pub message: Message,
    #[serde(default)]
    pub raw_message: Option<String>,
    #[serde(default)]
    pub font: Option<i64>,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default)]
    pub anonymous: Option<AnonymousSender>,
}

/// Typed view of `request.friend` events.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendRequestEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub comment: Option<String>,
    /// Flag to pass back through `set_friend_add_request`.
    pub flag: String,
}

/// Typed view of `request.group` events.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupRequestEvent {
    pub time: i64,
    pub self_id: i64,
    /// `"add"` or `"invite"`.
    pub sub_type: String,
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub comment: Option<String>,
    /// Flag to pass back through `set_group_add_request`.
    pub flag: String,
}

/// Typed view of `meta_event.heartbeat` events.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatEvent {
    pub time: i64,
    pub self_id: i64,
    /// Implementation status snapshot, shape-compatible with `get_status`.
    #[serde(default)]
    pub status: Value,
    /// Interval until the next heartbeat, in milliseconds.
    pub interval: i64,
}

/// Typed view of `meta_event.lifecycle` events.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleEvent {
    pub time: i64,
    pub self_id: i64,
    /// `"enable"`, `"disable"` or `"connect"`.
    pub sub_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_are_dotted() {
        let event = Event::from_value(json!({
            "time": 1_700_000_000,
            "self_id": 10,
            "post_type": "message",
            "message_type": "group",
        }))
        .unwrap();
        assert_eq!(event.name(), "message.group");
        assert_eq!(event.time(), 1_700_000_000);
        assert_eq!(event.self_id(), 10);

        let event = Event::from_value(json!({
            "post_type": "meta_event",
            "meta_event_type": "heartbeat",
        }))
        .unwrap();
        assert!(event.is_heartbeat());
    }

    #[test]
    fn post_type_alone_names_unknown_families() {
        let event = Event::from_value(json!({"post_type": "wiggle"})).unwrap();
        assert_eq!(event.name(), "wiggle");
    }

    #[test]
    fn missing_post_type_is_an_error() {
        assert!(matches!(
            Event::from_value(json!({"time": 1})),
            Err(EventError::MissingPostType)
        ));
        assert!(matches!(
            Event::from_value(json!([1, 2])),
            Err(EventError::NotAnObject)
        ));
    }

    #[test]
    fn decode_message_event() {
        let event = Event::from_value(json!({
            "time": 1_700_000_000,
            "self_id": 10,
            "post_type": "message",
            "message_type": "private",
            "sub_type": "friend",
            "message_id": 33,
            "user_id": 123,
            "message": [{"type": "text", "data": {"text": "hi"}}],
            "raw_message": "hi",
            "font": 0,
            "sender": {"user_id": 123, "nickname": "someone"},
        }))
        .unwrap();

        let view: MessageEvent = event.decode().unwrap();
        assert_eq!(view.message_id, 33);
        assert_eq!(view.group_id, None);
        assert_eq!(view.message.plain_text(), "hi");
        assert_eq!(view.sender.nickname.as_deref(), Some("someone"));
    }

    #[test]
    fn decode_heartbeat_event() {
        let event = Event::from_value(json!({
            "time": 1,
            "self_id": 10,
            "post_type": "meta_event",
            "meta_event_type": "heartbeat",
            "status": {"online": true, "good": true},
            "interval": 5000,
        }))
        .unwrap();
        let view: HeartbeatEvent = event.decode().unwrap();
        assert_eq!(view.interval, 5000);
    }
}
