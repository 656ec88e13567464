//! OneBot 11 message segment types.
//!
//! A segment is one typed unit of a structured message: plain text, an
//! image, an @mention, and so on. On the wire every segment is a
//! `{"type": ..., "data": {...}}` pair; the `type` discriminant alone
//! determines the shape of `data`, and an unknown discriminant is a hard
//! decode error.
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_model::Segment;
//!
//! let text = Segment::text("Hello, ");
//! let at = Segment::at(10001000);
//! let face = Segment::face(178);
//! ```

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// A OneBot 11 message segment.
///
/// Each variant carries the data struct for its wire `type`. Segments
/// round-trip through JSON without loss; optional fields are omitted when
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text content.
    Text(TextData),
    /// QQ face/emoji, identified by numeric id.
    Face(FaceData),
    /// Image.
    Image(ImageData),
    /// Voice/audio record.
    Record(RecordData),
    /// Video.
    Video(VideoData),
    /// @mention of a user, or of everyone.
    At(AtData),
    /// Rock-paper-scissors magic emoji (empty body).
    Rps(RpsData),
    /// Dice magic emoji (empty body).
    Dice(DiceData),
    /// Window shake (empty body).
    Shake(ShakeData),
    /// Poke message.
    Poke(PokeData),
    /// Anonymous sending tag (send only).
    Anonymous(AnonymousData),
    /// Link share.
    Share(ShareData),
    /// Friend or group recommendation.
    Contact(ContactData),
    /// Geographic location.
    Location(LocationData),
    /// Music share, platform-hosted or custom.
    Music(MusicData),
    /// Reply reference to an earlier message.
    Reply(ReplyData),
    /// Forwarded-messages reference (receive only).
    Forward(ForwardData),
    /// Forward node: either a message-id reference or a custom node with
    /// inline content.
    Node(NodeData),
    /// Serialized XML payload.
    Xml(XmlData),
    /// Serialized JSON payload.
    Json(JsonData),
}

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    /// Creates a face segment.
    pub fn face(id: i32) -> Self {
        Segment::Face(FaceData { id: id.to_string() })
    }

    /// Creates an image segment from a file path, URL or base64 string.
    pub fn image(file: impl Into<String>) -> Self {
        Segment::Image(ImageData {
            file: file.into(),
            kind: None,
            url: None,
            cache: None,
            proxy: None,
            timeout: None,
        })
    }

    /// Creates a flash image segment.
    pub fn flash_image(file: impl Into<String>) -> Self {
        Segment::Image(ImageData {
            file: file.into(),
            kind: Some("flash".to_string()),
            url: None,
            cache: None,
            proxy: None,
            timeout: None,
        })
    }

    /// Creates a voice record segment.
    pub fn record(file: impl Into<String>) -> Self {
        Segment::Record(RecordData {
            file: file.into(),
            magic: None,
            url: None,
            cache: None,
            proxy: None,
            timeout: None,
        })
    }

    /// Creates a video segment.
    pub fn video(file: impl Into<String>) -> Self {
        Segment::Video(VideoData {
            file: file.into(),
            url: None,
            cache: None,
            proxy: None,
            timeout: None,
        })
    }

    /// Creates an @mention segment for one user.
    pub fn at(user_id: i64) -> Self {
        Segment::At(AtData {
            qq: user_id.to_string(),
        })
    }

    /// Creates an @all segment.
    pub fn at_all() -> Self {
        Segment::At(AtData {
            qq: "all".to_string(),
        })
    }

    /// Creates a rock-paper-scissors segment.
    pub fn rps() -> Self {
        Segment::Rps(RpsData {})
    }

    /// Creates a dice segment.
    pub fn dice() -> Self {
        Segment::Dice(DiceData {})
    }

    /// Creates a shake segment.
    pub fn shake() -> Self {
        Segment::Shake(ShakeData {})
    }

    /// Creates a poke segment.
    pub fn poke(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Segment::Poke(PokeData {
            kind: kind.into(),
            id: id.into(),
            name: None,
        })
    }

    /// Creates a link share segment.
    pub fn share(url: impl Into<String>, title: impl Into<String>) -> Self {
        Segment::Share(ShareData {
            url: url.into(),
            title: title.into(),
            content: None,
            image: None,
        })
    }

    /// Creates a friend recommendation segment.
    pub fn contact_user(id: i64) -> Self {
        Segment::Contact(ContactData {
            kind: "qq".to_string(),
            id: id.to_string(),
        })
    }

    /// Creates a group recommendation segment.
    pub fn contact_group(id: i64) -> Self {
        Segment::Contact(ContactData {
            kind: "group".to_string(),
            id: id.to_string(),
        })
    }

    /// Creates a location segment.
    pub fn location(lat: f64, lon: f64) -> Self {
        Segment::Location(LocationData {
            lat: lat.to_string(),
            lon: lon.to_string(),
            title: None,
            content: None,
        })
    }

    /// Creates a platform music share segment (`qq`, `163`, `xm`).
    pub fn music(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Segment::Music(MusicData {
            kind: kind.into(),
            id: Some(id.into()),
            url: None,
            audio: None,
            title: None,
            content: None,
            image: None,
        })
    }

    /// Creates a custom music share segment.
    pub fn music_custom(
        url: impl Into<String>,
        audio: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Segment::Music(MusicData {
            kind: "custom".to_string(),
            id: None,
            url: Some(url.into()),
            audio: Some(audio.into()),
            title: Some(title.into()),
            content: None,
            image: None,
        })
    }

    /// Creates a reply segment referencing a message id.
    pub fn reply(id: impl Into<String>) -> Self {
        Segment::Reply(ReplyData { id: id.into() })
    }

    /// Creates a forward reference segment.
    pub fn forward(id: impl Into<String>) -> Self {
        Segment::Forward(ForwardData { id: id.into() })
    }

    /// Creates a forward node referencing an existing message.
    pub fn node(id: impl Into<String>) -> Self {
        Segment::Node(NodeData {
            id: Some(id.into()),
            user_id: None,
            nickname: None,
            content: None,
        })
    }

    /// Creates a custom forward node with inline content.
    pub fn node_custom(user_id: i64, nickname: impl Into<String>, content: Message) -> Self {
        Segment::Node(NodeData {
            id: None,
            user_id: Some(user_id.to_string()),
            nickname: Some(nickname.into()),
            content: Some(Box::new(content)),
        })
    }

    /// Creates an XML segment.
    pub fn xml(data: impl Into<String>) -> Self {
        Segment::Xml(XmlData { data: data.into() })
    }

    /// Creates a JSON segment.
    pub fn json(data: impl Into<String>) -> Self {
        Segment::Json(JsonData { data: data.into() })
    }

    /// Returns the plain text content for text segments.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Returns the wire `type` discriminant of this segment.
    pub fn kind(&self) -> &'static str {
        match self {
            Segment::Text(_) => "text",
            Segment::Face(_) => "face",
            Segment::Image(_) => "image",
            Segment::Record(_) => "record",
            Segment::Video(_) => "video",
            Segment::At(_) => "at",
            Segment::Rps(_) => "rps",
            Segment::Dice(_) => "dice",
            Segment::Shake(_) => "shake",
            Segment::Poke(_) => "poke",
            Segment::Anonymous(_) => "anonymous",
            Segment::Share(_) => "share",
            Segment::Contact(_) => "contact",
            Segment::Location(_) => "location",
            Segment::Music(_) => "music",
            Segment::Reply(_) => "reply",
            Segment::Forward(_) => "forward",
            Segment::Node(_) => "node",
            Segment::Xml(_) => "xml",
            Segment::Json(_) => "json",
        }
    }
}

/// Plain text segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    /// The text content.
    pub text: String,
}

/// Face/emoji segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    /// Face id from the QQ face table.
    pub id: String,
}

/// Image segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// File name, path, URL or base64 payload.
    pub file: String,
    /// `"flash"` for flash images, absent otherwise.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Resolved URL (receive only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Use the local cache when downloading (send only, `"0"`/`"1"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    /// Download through the configured proxy (send only, `"0"`/`"1"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Download timeout in seconds (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Voice record segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    /// File name, path, URL or base64 payload.
    pub file: String,
    /// Voice-change flag (`"0"`/`"1"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<String>,
    /// Resolved URL (receive only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Use the local cache when downloading (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    /// Download through the configured proxy (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Download timeout in seconds (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Video segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    /// File name, path, URL or base64 payload.
    pub file: String,
    /// Resolved URL (receive only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Use the local cache when downloading (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    /// Download through the configured proxy (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Download timeout in seconds (send only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// @mention segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    /// QQ number, or `"all"` to mention everyone.
    pub qq: String,
}

/// Rock-paper-scissors segment data (empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpsData {}

/// Dice segment data (empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiceData {}

/// Shake segment data (empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShakeData {}

/// Poke segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokeData {
    /// Poke type (see the Mirai PokeMessage table).
    #[serde(rename = "type")]
    pub kind: String,
    /// Poke id.
    pub id: String,
    /// Poke display name (receive only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Anonymous sending tag data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnonymousData {
    /// Continue as a normal message when anonymous sending fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<String>,
}

/// Link share segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareData {
    /// Target URL.
    pub url: String,
    /// Share title.
    pub title: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Optional cover image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Friend/group recommendation segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactData {
    /// `"qq"` or `"group"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// QQ number or group id.
    pub id: String,
}

/// Location segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    /// Latitude.
    pub lat: String,
    /// Longitude.
    pub lon: String,
    /// Optional title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Music share segment data.
///
/// Platform shares (`qq`, `163`, `xm`) carry only `id`; custom shares
/// carry `url`/`audio`/`title` and optionally `content`/`image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicData {
    /// `"qq"`, `"163"`, `"xm"` or `"custom"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Jump URL (custom only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Audio URL (custom only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Title (custom only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description (custom only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Cover image URL (custom only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Reply segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    /// Id of the message being replied to.
    pub id: String,
}

/// Forward reference segment data (receive only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardData {
    /// Forward id, resolvable through `get_forward_msg`.
    pub id: String,
}

/// Forward node segment data.
///
/// Exactly one of the two forms is populated: the `id` reference form, or
/// the custom form with `user_id`/`nickname`/`content` where `content` is
/// a full nested [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Box<Message>>,
}

/// XML segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlData {
    /// Raw XML content.
    pub data: String,
}

/// JSON segment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonData {
    /// Raw JSON content.
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_simple_segments() {
        let text = Segment::text("Hello");
        assert_eq!(
            serde_json::to_string(&text).unwrap(),
            r#"{"type":"text","data":{"text":"Hello"}}"#
        );

        let at = Segment::at(10001000);
        assert_eq!(
            serde_json::to_string(&at).unwrap(),
            r#"{"type":"at","data":{"qq":"10001000"}}"#
        );

        let face = Segment::face(178);
        assert_eq!(
            serde_json::to_string(&face).unwrap(),
            r#"{"type":"face","data":{"id":"178"}}"#
        );

        let rps = Segment::rps();
        assert_eq!(
            serde_json::to_string(&rps).unwrap(),
            r#"{"type":"rps","data":{}}"#
        );
    }

    #[test]
    fn deserialize_segments() {
        let segment: Segment =
            serde_json::from_str(r#"{"type":"text","data":{"text":"Hello World"}}"#).unwrap();
        assert_eq!(segment.as_text(), Some("Hello World"));

        let segment: Segment = serde_json::from_str(
            r#"{"type":"image","data":{"file":"123.jpg","url":"http://example.com/123.jpg"}}"#,
        )
        .unwrap();
        assert!(
            matches!(segment, Segment::Image(ImageData { ref file, url: Some(_), .. }) if file == "123.jpg")
        );

        let segment: Segment = serde_json::from_str(r#"{"type":"at","data":{"qq":"all"}}"#).unwrap();
        assert!(matches!(segment, Segment::At(AtData { ref qq }) if qq == "all"));
    }

    #[test]
    fn unknown_type_is_hard_error() {
        let err = serde_json::from_str::<Segment>(r#"{"type":"hologram","data":{}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn image_round_trip_with_all_fields() {
        let segment = Segment::Image(ImageData {
            file: "cat.jpg".to_string(),
            kind: Some("flash".to_string()),
            url: Some("http://example.com/cat.jpg".to_string()),
            cache: Some("1".to_string()),
            proxy: Some("0".to_string()),
            timeout: Some("15".to_string()),
        });
        let json = serde_json::to_value(&segment).unwrap();
        let back: Segment = serde_json::from_value(json).unwrap();
        assert_eq!(back, segment);
    }

    #[test]
    fn forward_node_round_trip() {
        let node = Segment::node_custom(10001000, "somebody", Message::from(Segment::text("hi")));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["data"]["user_id"], "10001000");
        let back: Segment = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn segment_kind_matches_wire_tag() {
        let music = Segment::music("163", "28949129");
        assert_eq!(music.kind(), "music");
        let json = serde_json::to_value(&music).unwrap();
        assert_eq!(json["type"], "music");
        assert_eq!(json["data"]["type"], "163");
    }
}
