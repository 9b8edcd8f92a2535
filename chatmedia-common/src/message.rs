//! Raw message record supplied by the rendering layer
//!
//! The rendering layer is not consistent about field naming or id types, so
//! the record accepts both snake_case and camelCase names and normalizes
//! numeric ids to strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Message record as received from the rendering layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Message id (backend primary key)
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,

    /// Owning chat id
    #[serde(default, alias = "chatId", deserialize_with = "optional_id")]
    pub chat_id: Option<String>,

    /// Declared message type (`audio`, `image`, `text`, ...)
    #[serde(
        default,
        rename = "type",
        alias = "message_type",
        alias = "messageType"
    )]
    pub message_type: Option<String>,

    /// Body: plain string, serialized JSON document or structured object
    #[serde(default, alias = "content")]
    pub body: Value,

    /// Media path already resolved by the backend
    #[serde(default, alias = "mediaPath")]
    pub media_path: Option<String>,

    /// Provider-side message id
    #[serde(
        default,
        rename = "message_id",
        alias = "messageId",
        alias = "secondary_id",
        deserialize_with = "optional_id"
    )]
    pub secondary_id: Option<String>,
}

impl RawMessage {
    /// Parse a record from its JSON text
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_chat_id(mut self, id: impl Into<String>) -> Self {
        self.chat_id = Some(id.into());
        self
    }

    pub fn with_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_media_path(mut self, path: impl Into<String>) -> Self {
        self.media_path = Some(path.into());
        self
    }

    pub fn with_secondary_id(mut self, id: impl Into<String>) -> Self {
        self.secondary_id = Some(id.into());
        self
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
