//! Content extraction
//!
//! Normalizes a [`RawMessage`] into a [`MediaDescriptor`]. Pure function of
//! its input: no I/O, no logging above `debug`.
//!
//! Type detection precedence:
//! 1. Explicit type field on the record
//! 2. Type-specific key nested inside the parsed payload (`audioMessage`, ...)
//!
//! The first signal found wins; signals are never merged.

use chatmedia_common::{MediaDescriptor, MediaKind, RawMessage};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::strategy::templates;

const URL_KEYS: &[&str] = &["url", "mediaUrl", "media_url", "src"];
const PATH_KEYS: &[&str] = &["path", "localPath", "filePath", "file_path", "directPath"];
const FILE_NAME_KEYS: &[&str] = &["fileName", "file_name", "filename", "name"];
const SIZE_KEYS: &[&str] = &["fileLength", "file_length", "size", "sizeBytes"];
const DURATION_KEYS: &[&str] = &["seconds", "duration", "durationSeconds"];

/// Message body after normalization
#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Empty,
    Text(String),
    Structured(Value),
}

impl Payload {
    /// Accept plain text, serialized JSON, or an already-structured value
    ///
    /// Text that looks like JSON but does not parse stays text.
    fn from_body(body: &Value) -> Self {
        match body {
            Value::Null => Payload::Empty,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Payload::Empty;
                }
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(parsed) => return Payload::Structured(parsed),
                        Err(e) => debug!("Body looks structured but did not parse: {}", e),
                    }
                }
                Payload::Text(trimmed.to_string())
            }
            Value::Object(_) | Value::Array(_) => Payload::Structured(body.clone()),
            other => Payload::Text(other.to_string()),
        }
    }

    fn object(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Structured(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Text(s) => Value::String(s),
            Payload::Structured(v) => v,
        }
    }
}

/// Extract the media descriptor for one message
///
/// Returns [`Error::UnsupportedMedia`] when neither the declared type nor
/// the payload identifies a media kind.
pub fn extract(raw: &RawMessage) -> Result<MediaDescriptor> {
    let payload = Payload::from_body(&raw.body);

    let kind = detect_kind(raw.message_type.as_deref(), &payload).ok_or_else(|| {
        Error::UnsupportedMedia(match raw.message_type.as_deref() {
            Some(declared) => format!("declared type '{}' carries no media", declared),
            None => "no type field and no recognized payload marker".to_string(),
        })
    })?;

    let fields = harvest(kind, &payload);
    let explicit_path = raw.media_path.clone().or(fields.path);

    let descriptor = MediaDescriptor::new(kind, payload.into_value())
        .with_message_id(raw.id.clone())
        .with_chat_id(raw.chat_id.clone())
        .with_secondary_id(raw.secondary_id.clone())
        .with_explicit_url(fields.url)
        .with_explicit_path(explicit_path)
        .with_file_name(fields.file_name)
        .with_size_bytes(fields.size_bytes)
        .with_duration_seconds(fields.duration_seconds);

    debug!(kind = %kind, message_id = ?descriptor.message_id(), "Extracted media descriptor");
    Ok(descriptor)
}

fn detect_kind(declared: Option<&str>, payload: &Payload) -> Option<MediaKind> {
    if let Some(kind) = declared.and_then(MediaKind::from_type_name) {
        return Some(kind);
    }

    let object = payload.object()?;
    MediaKind::ALL.into_iter().find(|kind| {
        kind.payload_markers()
            .iter()
            .any(|marker| object.get(*marker).is_some_and(|v| !v.is_null()))
    })
}

#[derive(Debug, Default)]
struct Harvested {
    url: Option<String>,
    path: Option<String>,
    file_name: Option<String>,
    size_bytes: Option<u64>,
    duration_seconds: Option<f64>,
}

/// Pull locator inputs out of the payload
///
/// The kind's nested section is consulted before the payload root.
fn harvest(kind: MediaKind, payload: &Payload) -> Harvested {
    match payload {
        Payload::Empty => Harvested::default(),
        Payload::Text(text) => harvest_text(text),
        Payload::Structured(_) => {
            let Some(root) = payload.object() else {
                return Harvested::default();
            };

            let marker_value = kind
                .payload_markers()
                .iter()
                .find_map(|marker| root.get(*marker));

            // Short form: {"audio": "https://..."}
            if let Some(Value::String(address)) = marker_value {
                let mut fields = harvest_text(address);
                fields.file_name = string_field(&[root], FILE_NAME_KEYS);
                return fields;
            }

            let mut scopes: Vec<&Map<String, Value>> = Vec::with_capacity(2);
            if let Some(Value::Object(section)) = marker_value {
                scopes.push(section);
            }
            scopes.push(root);

            Harvested {
                url: string_field(&scopes, URL_KEYS),
                path: string_field(&scopes, PATH_KEYS),
                file_name: string_field(&scopes, FILE_NAME_KEYS),
                size_bytes: number_field(&scopes, SIZE_KEYS)
                    .filter(|n| *n >= 0.0)
                    .map(|n| n as u64),
                duration_seconds: number_field(&scopes, DURATION_KEYS),
            }
        }
    }
}

fn harvest_text(text: &str) -> Harvested {
    let text = text.trim();
    if templates::is_absolute(text) {
        Harvested {
            url: Some(text.to_string()),
            ..Harvested::default()
        }
    } else if templates::has_internal_prefix(text) {
        Harvested {
            path: Some(text.to_string()),
            ..Harvested::default()
        }
    } else {
        Harvested::default()
    }
}

fn string_field(scopes: &[&Map<String, Value>], keys: &[&str]) -> Option<String> {
    scopes.iter().find_map(|scope| {
        keys.iter().find_map(|key| match scope.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
    })
}

fn number_field(scopes: &[&Map<String, Value>], keys: &[&str]) -> Option<f64> {
    scopes.iter().find_map(|scope| {
        keys.iter().find_map(|key| match scope.get(*key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    })
}
