//! Failure event type definitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a controller gave up on a locator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum FailureKind {
    /// Static media (image, sticker, document) could not be displayed
    DisplayFailed,
    /// Audio/video load failed; carries the local retry count so far
    LoadError,
    /// User (or a peer controller) asked for the next candidate
    AlternateRequested,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::DisplayFailed => write!(f, "DisplayFailed"),
            FailureKind::LoadError => write!(f, "LoadError"),
            FailureKind::AlternateRequested => write!(f, "AlternateRequested"),
        }
    }
}

/// Failure notice published by a controller for one locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    /// Message (render key) the locator belongs to
    pub message_id: String,
    /// Locator the controller was bound to when it failed
    pub failed_locator: String,
    /// Local retry count of the publishing controller
    pub retry_count: u32,
    pub kind: FailureKind,
    /// Publishing controller
    pub origin: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl FailureEvent {
    pub fn new(
        message_id: impl Into<String>,
        failed_locator: impl Into<String>,
        retry_count: u32,
        kind: FailureKind,
        origin: Uuid,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            failed_locator: failed_locator.into(),
            retry_count,
            kind,
            origin,
            timestamp: chrono::Utc::now(),
        }
    }
}
