//! The polymorphic OneBot 11 message model.
//!
//! A message on the wire is one of three shapes:
//!
//! - a plain JSON string carrying legacy CQ-code markup,
//! - a single `{type, data}` segment object,
//! - an array of segment objects.
//!
//! [`Message`] models all three and round-trips them losslessly. The raw
//! string form additionally carries an `auto_escape` flag: when set, CQ
//! special characters are escaped on encode so the peer treats the string
//! as literal text.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::cq::{escape_text, parse_cq_string, segment_to_cq};
use crate::segment::Segment;

/// A complete message in any of its wire shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Legacy CQ-code string.
    Raw(RawMessage),
    /// One segment object.
    Single(Segment),
    /// Ordered segment array.
    Array(Vec<Segment>),
}

/// A legacy string-format message.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// CQ-code markup (or plain text).
    pub code: String,
    /// Escape CQ special characters when encoding, so the content is sent
    /// as literal text rather than markup.
    pub auto_escape: bool,
}

impl Message {
    /// Creates a raw string message without auto-escape.
    pub fn raw(code: impl Into<String>) -> Self {
        Message::Raw(RawMessage {
            code: code.into(),
            auto_escape: false,
        })
    }

    /// Creates a raw string message that is escaped on encode.
    pub fn raw_escaped(code: impl Into<String>) -> Self {
        Message::Raw(RawMessage {
            code: code.into(),
            auto_escape: true,
        })
    }

    /// Creates a single text-segment message.
    pub fn text(text: impl Into<String>) -> Self {
        Message::Single(Segment::text(text))
    }

    /// Appends a segment, converting to the array shape as needed.
    pub fn push(self, segment: Segment) -> Self {
        let mut segments = self.into_segments();
        segments.push(segment);
        Message::Array(segments)
    }

    /// Appends a text segment.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Segment::text(text))
    }

    /// Appends an @mention segment.
    pub fn then_at(self, user_id: i64) -> Self {
        self.push(Segment::at(user_id))
    }

    /// Returns the auto-escape flag carried by raw messages.
    ///
    /// Segment-form messages never auto-escape; the flag is forwarded as
    /// the `auto_escape` action parameter when sending.
    pub fn auto_escape(&self) -> bool {
        match self {
            Message::Raw(raw) => raw.auto_escape,
            _ => false,
        }
    }

    /// Converts the message into a segment list, parsing CQ markup for the
    /// raw shape.
    pub fn into_segments(self) -> Vec<Segment> {
        match self {
            Message::Raw(raw) => parse_cq_string(&raw.code),
            Message::Single(segment) => vec![segment],
            Message::Array(segments) => segments,
        }
    }

    /// Returns the segment list without consuming the message.
    pub fn segments(&self) -> Vec<Segment> {
        self.clone().into_segments()
    }

    /// Renders the message in the legacy CQ string format.
    pub fn to_cq_string(&self) -> String {
        match self {
            Message::Raw(raw) => raw.code.clone(),
            Message::Single(segment) => segment_to_cq(segment),
            Message::Array(segments) => segments.iter().map(segment_to_cq).collect(),
        }
    }

    /// Extracts the concatenated plain text content.
    pub fn plain_text(&self) -> String {
        self.segments()
            .iter()
            .filter_map(Segment::as_text)
            .collect()
    }

    /// Returns all @mentioned user ids (excluding @all).
    pub fn mentioned_users(&self) -> Vec<i64> {
        self.segments()
            .iter()
            .filter_map(|segment| match segment {
                Segment::At(data) if data.qq != "all" => data.qq.parse().ok(),
                _ => None,
            })
            .collect()
    }

    /// Returns the replied-to message id, if any.
    pub fn reply_to(&self) -> Option<String> {
        self.segments().iter().find_map(|segment| match segment {
            Segment::Reply(data) => Some(data.id.clone()),
            _ => None,
        })
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Message::Raw(raw) => {
                if raw.auto_escape {
                    serializer.serialize_str(&escape_text(&raw.code))
                } else {
                    serializer.serialize_str(&raw.code)
                }
            }
            Message::Single(segment) => segment.serialize(serializer),
            Message::Array(segments) => segments.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(code) => Ok(Message::Raw(RawMessage {
                code,
                auto_escape: false,
            })),
            Value::Object(_) => serde_json::from_value::<Segment>(value)
                .map(Message::Single)
                .map_err(D::Error::custom),
            Value::Array(_) => serde_json::from_value::<Vec<Segment>>(value)
                .map(Message::Array)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected string, object or array message, got {other}"
            ))),
        }
    }
}

impl From<Segment> for Message {
    fn from(segment: Segment) -> Self {
        Message::Single(segment)
    }
}

impl From<Vec<Segment>> for Message {
    fn from(segments: Vec<Segment>) -> Self {
        Message::Array(segments)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::text(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::text(text)
    }
}

impl FromIterator<Segment> for Message {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Message::Array(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_string_shape() {
        let message: Message = serde_json::from_str(r#""Hello [CQ:face,id=178]""#).unwrap();
        assert!(matches!(
            &message,
            Message::Raw(RawMessage { code, auto_escape: false }) if code == "Hello [CQ:face,id=178]"
        ));
        assert_eq!(message.segments().len(), 2);
    }

    #[test]
    fn decode_single_shape() {
        let message: Message =
            serde_json::from_str(r#"{"type":"text","data":{"text":"hi"}}"#).unwrap();
        assert!(matches!(message, Message::Single(Segment::Text(_))));
    }

    #[test]
    fn decode_array_shape() {
        let message: Message = serde_json::from_str(
            r#"[{"type":"text","data":{"text":"Hello"}},{"type":"at","data":{"qq":"10001000"}}]"#,
        )
        .unwrap();
        assert_eq!(message.plain_text(), "Hello");
        assert_eq!(message.mentioned_users(), vec![10001000]);
    }

    #[test]
    fn decode_rejects_other_shapes() {
        assert!(serde_json::from_str::<Message>("42").is_err());
        assert!(serde_json::from_str::<Message>("null").is_err());
    }

    #[test]
    fn array_round_trip() {
        let message = Message::text("Hello, ").then_at(10001000).then_text("!");
        let json = serde_json::to_value(&message).unwrap();
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn raw_encodes_verbatim_without_auto_escape() {
        let message = Message::raw("[CQ:face,id=178]");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, Value::String("[CQ:face,id=178]".to_string()));
    }

    #[test]
    fn raw_auto_escape_escapes_markup_on_encode() {
        let message = Message::raw_escaped("not [CQ:face,id=178]");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            Value::String("not &#91;CQ:face,id=178&#93;".to_string())
        );
    }

    #[test]
    fn raw_auto_escape_round_trip_is_text_preserving() {
        // Plain text has nothing to escape, so the decoded message carries
        // the same content.
        let message = Message::raw_escaped("hello");
        assert!(message.auto_escape());
        let json = serde_json::to_value(&message).unwrap();
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back.to_cq_string(), "hello");
    }

    #[test]
    fn reply_lookup() {
        let message = Message::from(Segment::reply("12345")).then_text("this is a reply");
        assert_eq!(message.reply_to().as_deref(), Some("12345"));
    }
}
