//! Legacy CQ-code string format.
//!
//! Before the segment-array format, messages were exchanged as a single
//! string mixing plain text with inline `[CQ:type,key=value,...]` markup.
//! This module converts between that string form and [`Segment`] lists,
//! including the escaping rules (`&` / `[` / `]` in text, plus `,` inside
//! parameter values).

use std::fmt::Write;

use crate::message::Message;
use crate::segment::{
    AnonymousData, AtData, ContactData, DiceData, FaceData, ForwardData, ImageData, JsonData,
    LocationData, MusicData, NodeData, PokeData, RecordData, ReplyData, RpsData, Segment,
    ShakeData, ShareData, VideoData, XmlData,
};

/// Escapes plain text for embedding in a CQ-code string.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Unescapes CQ-encoded plain text.
pub fn unescape_text(text: &str) -> String {
    text.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// Escapes a CQ-code parameter value (also escapes `,`).
pub fn escape_value(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
        .replace(',', "&#44;")
}

/// Unescapes a CQ-code parameter value.
pub fn unescape_value(value: &str) -> String {
    unescape_text(value)
}

/// Renders one segment as CQ-code markup.
///
/// Text segments become escaped plain text, everything else becomes a
/// `[CQ:...]` block with its present fields as parameters.
pub fn segment_to_cq(segment: &Segment) -> String {
    match segment {
        Segment::Text(d) => escape_text(&d.text),
        Segment::Face(d) => render("face", &[("id", Some(d.id.as_str()))]),
        Segment::Image(d) => render(
            "image",
            &[
                ("file", Some(d.file.as_str())),
                ("type", d.kind.as_deref()),
                ("url", d.url.as_deref()),
                ("cache", d.cache.as_deref()),
                ("proxy", d.proxy.as_deref()),
                ("timeout", d.timeout.as_deref()),
            ],
        ),
        Segment::Record(d) => render(
            "record",
            &[
                ("file", Some(d.file.as_str())),
                ("magic", d.magic.as_deref()),
                ("url", d.url.as_deref()),
                ("cache", d.cache.as_deref()),
                ("proxy", d.proxy.as_deref()),
                ("timeout", d.timeout.as_deref()),
            ],
        ),
        Segment::Video(d) => render(
            "video",
            &[
                ("file", Some(d.file.as_str())),
                ("url", d.url.as_deref()),
                ("cache", d.cache.as_deref()),
                ("proxy", d.proxy.as_deref()),
                ("timeout", d.timeout.as_deref()),
            ],
        ),
        Segment::At(d) => render("at", &[("qq", Some(d.qq.as_str()))]),
        Segment::Rps(_) => render("rps", &[]),
        Segment::Dice(_) => render("dice", &[]),
        Segment::Shake(_) => render("shake", &[]),
        Segment::Poke(d) => render(
            "poke",
            &[
                ("type", Some(d.kind.as_str())),
                ("id", Some(d.id.as_str())),
                ("name", d.name.as_deref()),
            ],
        ),
        Segment::Anonymous(d) => render("anonymous", &[("ignore", d.ignore.as_deref())]),
        Segment::Share(d) => render(
            "share",
            &[
                ("url", Some(d.url.as_str())),
                ("title", Some(d.title.as_str())),
                ("content", d.content.as_deref()),
                ("image", d.image.as_deref()),
            ],
        ),
        Segment::Contact(d) => render("contact", &[("type", Some(d.kind.as_str())), ("id", Some(d.id.as_str()))]),
        Segment::Location(d) => render(
            "location",
            &[
                ("lat", Some(d.lat.as_str())),
                ("lon", Some(d.lon.as_str())),
                ("title", d.title.as_deref()),
                ("content", d.content.as_deref()),
            ],
        ),
        Segment::Music(d) => render(
            "music",
            &[
                ("type", Some(d.kind.as_str())),
                ("id", d.id.as_deref()),
                ("url", d.url.as_deref()),
                ("audio", d.audio.as_deref()),
                ("title", d.title.as_deref()),
                ("content", d.content.as_deref()),
                ("image", d.image.as_deref()),
            ],
        ),
        Segment::Reply(d) => render("reply", &[("id", Some(d.id.as_str()))]),
        Segment::Forward(d) => render("forward", &[("id", Some(d.id.as_str()))]),
        Segment::Node(d) => {
            let content = d.content.as_deref().map(|m| m.to_cq_string());
            render(
                "node",
                &[
                    ("id", d.id.as_deref()),
                    ("user_id", d.user_id.as_deref()),
                    ("nickname", d.nickname.as_deref()),
                    ("content", content.as_deref()),
                ],
            )
        }
        Segment::Xml(d) => render("xml", &[("data", Some(d.data.as_str()))]),
        Segment::Json(d) => render("json", &[("data", Some(d.data.as_str()))]),
    }
}

fn render(kind: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut out = format!("[CQ:{kind}");
    for (key, value) in params {
        if let Some(value) = value {
            // Writing to a String cannot fail.
            write!(out, ",{key}={}", escape_value(value)).unwrap();
        }
    }
    out.push(']');
    out
}

/// Parses a CQ-code string into a segment list.
///
/// Plain text runs become text segments; `[CQ:...]` blocks become their
/// typed segments. Malformed or unknown blocks are kept verbatim as text
/// so no input is dropped.
pub fn parse_cq_string(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        match rest.find("[CQ:") {
            Some(start) => {
                if start > 0 {
                    segments.push(Segment::text(unescape_text(&rest[..start])));
                }
                let block = &rest[start..];
                match block.find(']') {
                    Some(end) => {
                        let body = &block[4..end];
                        match parse_cq_block(body) {
                            Some(segment) => segments.push(segment),
                            None => segments.push(Segment::text(&block[..=end])),
                        }
                        rest = &block[end + 1..];
                    }
                    None => {
                        // Unterminated block, keep as text.
                        segments.push(Segment::text(unescape_text(block)));
                        rest = "";
                    }
                }
            }
            None => {
                segments.push(Segment::text(unescape_text(rest)));
                rest = "";
            }
        }
    }

    segments
}

/// Parses the interior of one `[CQ:...]` block (without the brackets).
fn parse_cq_block(body: &str) -> Option<Segment> {
    let mut parts = body.split(',');
    let kind = parts.next()?;

    let mut params: Vec<(&str, String)> = Vec::new();
    for part in parts {
        let (key, value) = part.split_once('=')?;
        params.push((key, unescape_value(value)));
    }
    let get = |key: &str| -> Option<String> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    };

    match kind {
        "face" => Some(Segment::Face(FaceData { id: get("id")? })),
        "image" => Some(Segment::Image(ImageData {
            file: get("file")?,
            kind: get("type"),
            url: get("url"),
            cache: get("cache"),
            proxy: get("proxy"),
            timeout: get("timeout"),
        })),
        "record" => Some(Segment::Record(RecordData {
            file: get("file")?,
            magic: get("magic"),
            url: get("url"),
            cache: get("cache"),
            proxy: get("proxy"),
            timeout: get("timeout"),
        })),
        "video" => Some(Segment::Video(VideoData {
            file: get("file")?,
            url: get("url"),
            cache: get("cache"),
            proxy: get("proxy"),
            timeout: get("timeout"),
        })),
        "at" => Some(Segment::At(AtData { qq: get("qq")? })),
        "rps" => Some(Segment::Rps(RpsData {})),
        "dice" => Some(Segment::Dice(DiceData {})),
        "shake" => Some(Segment::Shake(ShakeData {})),
        "poke" => Some(Segment::Poke(PokeData {
            kind: get("type")?,
            id: get("id")?,
            name: get("name"),
        })),
        "anonymous" => Some(Segment::Anonymous(AnonymousData {
            ignore: get("ignore"),
        })),
        "share" => Some(Segment::Share(ShareData {
            url: get("url")?,
            title: get("title")?,
            content: get("content"),
            image: get("image"),
        })),
        "contact" => Some(Segment::Contact(ContactData {
            kind: get("type")?,
            id: get("id")?,
        })),
        "location" => Some(Segment::Location(LocationData {
            lat: get("lat")?,
            lon: get("lon")?,
            title: get("title"),
            content: get("content"),
        })),
        "music" => Some(Segment::Music(MusicData {
            kind: get("type")?,
            id: get("id"),
            url: get("url"),
            audio: get("audio"),
            title: get("title"),
            content: get("content"),
            image: get("image"),
        })),
        "reply" => Some(Segment::Reply(ReplyData { id: get("id")? })),
        "forward" => Some(Segment::Forward(ForwardData { id: get("id")? })),
        "node" => Some(Segment::Node(NodeData {
            id: get("id"),
            user_id: get("user_id"),
            nickname: get("nickname"),
            content: get("content").map(|c| Box::new(Message::raw(c))),
        })),
        "xml" => Some(Segment::Xml(XmlData { data: get("data")? })),
        "json" => Some(Segment::Json(JsonData { data: get("data")? })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping() {
        assert_eq!(escape_text("Hello [World]"), "Hello &#91;World&#93;");
        assert_eq!(escape_text("A & B"), "A &amp; B");
        assert_eq!(unescape_text("&#91;x&#93; &amp;"), "[x] &");
        assert_eq!(escape_value("a,b,c"), "a&#44;b&#44;c");
        assert_eq!(unescape_value("a&#44;b&#44;c"), "a,b,c");
    }

    #[test]
    fn render_segments() {
        assert_eq!(segment_to_cq(&Segment::text("Hello")), "Hello");
        assert_eq!(segment_to_cq(&Segment::face(178)), "[CQ:face,id=178]");
        assert_eq!(
            segment_to_cq(&Segment::at(10001000)),
            "[CQ:at,qq=10001000]"
        );
        assert_eq!(segment_to_cq(&Segment::at_all()), "[CQ:at,qq=all]");
        assert_eq!(segment_to_cq(&Segment::dice()), "[CQ:dice]");
        assert_eq!(
            segment_to_cq(&Segment::image("http://example.com/1.jpg")),
            "[CQ:image,file=http://example.com/1.jpg]"
        );
    }

    #[test]
    fn parse_mixed_text_and_blocks() {
        let segments = parse_cq_string("Hello [CQ:face,id=178] World");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].as_text(), Some("Hello "));
        assert!(matches!(segments[1], Segment::Face(_)));
        assert_eq!(segments[2].as_text(), Some(" World"));
    }

    #[test]
    fn parse_leading_block() {
        let segments = parse_cq_string("[CQ:at,qq=10001000]你好[CQ:image,file=123.jpg]");
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[0], Segment::At(_)));
        assert_eq!(segments[1].as_text(), Some("你好"));
        assert!(matches!(segments[2], Segment::Image(_)));
    }

    #[test]
    fn unknown_block_is_kept_as_text() {
        let segments = parse_cq_string("[CQ:hologram,id=1]");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].as_text(), Some("[CQ:hologram,id=1]"));
    }

    #[test]
    fn parse_unescapes_text() {
        let segments = parse_cq_string("&#91;escaped&#93; &amp; test");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].as_text(), Some("[escaped] & test"));
    }

    #[test]
    fn parse_inverts_render() {
        let original = vec![
            Segment::text("look: "),
            Segment::face(41),
            Segment::reply("12345"),
        ];
        let rendered: String = original.iter().map(segment_to_cq).collect();
        assert_eq!(parse_cq_string(&rendered), original);
    }
}
