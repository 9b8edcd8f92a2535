//! Media type definitions
//!
//! Supporting types for descriptor extraction and candidate generation.

use serde::{Deserialize, Serialize};

/// Media kind enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
    Video,
    Sticker,
    Document,
}

impl MediaKind {
    /// All kinds, in payload marker probe order
    pub const ALL: [MediaKind; 5] = [
        MediaKind::Audio,
        MediaKind::Image,
        MediaKind::Video,
        MediaKind::Sticker,
        MediaKind::Document,
    ];

    /// Map a declared message type onto a media kind
    ///
    /// Case insensitive. Returns `None` for non-media types (`text`, `chat`, ...).
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "audio" | "voice" | "ptt" => Some(MediaKind::Audio),
            "image" | "photo" => Some(MediaKind::Image),
            "video" | "gif" => Some(MediaKind::Video),
            "sticker" => Some(MediaKind::Sticker),
            "document" | "file" => Some(MediaKind::Document),
            _ => None,
        }
    }

    /// Fixed folder segment used by every kind-specific path template
    pub fn folder(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audios",
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
            MediaKind::Sticker => "stickers",
            MediaKind::Document => "documents",
        }
    }

    /// Keys that mark an embedded payload of this kind, most specific first
    pub fn payload_markers(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &["audioMessage", "audio"],
            MediaKind::Image => &["imageMessage", "image"],
            MediaKind::Video => &["videoMessage", "video"],
            MediaKind::Sticker => &["stickerMessage", "sticker"],
            MediaKind::Document => &["documentMessage", "document"],
        }
    }

    /// Audio and video go through the playback controller; the rest are static
    pub fn is_playable(&self) -> bool {
        matches!(self, MediaKind::Audio | MediaKind::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Sticker => write!(f, "sticker"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// Typed view of the media referenced by one message
///
/// Produced once per message render and never mutated afterwards. The
/// `with_*` methods are only meant for the extractor building it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    kind: MediaKind,
    raw_payload: serde_json::Value,
    message_id: Option<String>,
    chat_id: Option<String>,
    secondary_id: Option<String>,
    explicit_url: Option<String>,
    explicit_path: Option<String>,
    file_name: Option<String>,
    size_bytes: Option<u64>,
    duration_seconds: Option<f64>,
}

impl MediaDescriptor {
    pub fn new(kind: MediaKind, raw_payload: serde_json::Value) -> Self {
        Self {
            kind,
            raw_payload,
            message_id: None,
            chat_id: None,
            secondary_id: None,
            explicit_url: None,
            explicit_path: None,
            file_name: None,
            size_bytes: None,
            duration_seconds: None,
        }
    }

    pub fn with_message_id(mut self, id: Option<String>) -> Self {
        self.message_id = non_blank(id);
        self
    }

    pub fn with_chat_id(mut self, id: Option<String>) -> Self {
        self.chat_id = non_blank(id);
        self
    }

    pub fn with_secondary_id(mut self, id: Option<String>) -> Self {
        self.secondary_id = non_blank(id);
        self
    }

    pub fn with_explicit_url(mut self, url: Option<String>) -> Self {
        self.explicit_url = non_blank(url);
        self
    }

    pub fn with_explicit_path(mut self, path: Option<String>) -> Self {
        self.explicit_path = non_blank(path);
        self
    }

    pub fn with_file_name(mut self, name: Option<String>) -> Self {
        self.file_name = non_blank(name);
        self
    }

    pub fn with_size_bytes(mut self, size: Option<u64>) -> Self {
        self.size_bytes = size;
        self
    }

    pub fn with_duration_seconds(mut self, seconds: Option<f64>) -> Self {
        self.duration_seconds = seconds.filter(|s| s.is_finite() && *s >= 0.0);
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn raw_payload(&self) -> &serde_json::Value {
        &self.raw_payload
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn secondary_id(&self) -> Option<&str> {
        self.secondary_id.as_deref()
    }

    pub fn explicit_url(&self) -> Option<&str> {
        self.explicit_url.as_deref()
    }

    pub fn explicit_path(&self) -> Option<&str> {
        self.explicit_path.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One ranked address for a media asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLocator {
    /// Lower values are tried first
    pub priority: u32,
    /// Absolute or relative address
    pub locator: String,
    /// Name of the strategy that produced the address
    pub description: String,
}

impl CandidateLocator {
    pub fn new(priority: u32, locator: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            locator: locator.into(),
            description: description.into(),
        }
    }
}

impl std::fmt::Display for CandidateLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.priority, self.locator, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_type_name_aliases() {
        assert_eq!(MediaKind::from_type_name("audio"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_type_name("PTT"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_type_name(" Photo "), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_type_name("gif"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_type_name("file"), Some(MediaKind::Document));
        assert_eq!(MediaKind::from_type_name("sticker"), Some(MediaKind::Sticker));
        assert_eq!(MediaKind::from_type_name("text"), None);
        assert_eq!(MediaKind::from_type_name(""), None);
    }

    #[test]
    fn test_folders_are_distinct() {
        let mut folders: Vec<_> = MediaKind::ALL.iter().map(|k| k.folder()).collect();
        folders.sort();
        folders.dedup();
        assert_eq!(folders.len(), MediaKind::ALL.len());
    }

    #[test]
    fn test_playable_kinds() {
        assert!(MediaKind::Audio.is_playable());
        assert!(MediaKind::Video.is_playable());
        assert!(!MediaKind::Image.is_playable());
        assert!(!MediaKind::Sticker.is_playable());
        assert!(!MediaKind::Document.is_playable());
    }

    #[test]
    fn test_descriptor_blank_fields_dropped() {
        let descriptor = MediaDescriptor::new(MediaKind::Image, serde_json::Value::Null)
            .with_message_id(Some("  ".to_string()))
            .with_file_name(Some(" cat.png ".to_string()))
            .with_duration_seconds(Some(f64::NAN));

        assert_eq!(descriptor.message_id(), None);
        assert_eq!(descriptor.file_name(), Some("cat.png"));
        assert_eq!(descriptor.duration_seconds(), None);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MediaKind::Sticker).unwrap();
        assert_eq!(json, "\"sticker\"");
    }
}
