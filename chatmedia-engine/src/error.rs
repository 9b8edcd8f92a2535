//! Error types for chatmedia-engine
//!
//! Defines the resolution error taxonomy using thiserror.

use thiserror::Error;

/// Main error type for chatmedia-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Extractor could not classify the payload (terminal, never retried)
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Strategy generator produced zero candidates (terminal)
    #[error("No locator available for message {message_id}")]
    NoLocatorAvailable { message_id: String },

    /// One candidate failed to load (recoverable until every candidate failed)
    #[error("Load error for {locator}: {reason}")]
    LoadError { locator: String, reason: String },

    /// Outcome for a locator that is no longer active (discarded, never shown)
    #[error("Stale event for {locator}")]
    StaleEvent { locator: String },

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Errors from the common crate (configuration, parsing, I/O)
    #[error(transparent)]
    Common(#[from] chatmedia_common::Error),
}

impl Error {
    /// Text shown to the user for terminal errors
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::UnsupportedMedia(_) => "media type not supported",
            Error::NoLocatorAvailable { .. } => "no link available for this media",
            Error::LoadError { .. } => "could not load media with any available source",
            Error::StaleEvent { .. } | Error::InvalidState(_) | Error::Common(_) => {
                "media could not be displayed"
            }
        }
    }

    /// Extractor and generator errors end the resolution immediately
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMedia(_) | Error::NoLocatorAvailable { .. }
        )
    }
}

/// Convenience Result type using chatmedia-engine Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            Error::UnsupportedMedia("x".into()).user_message(),
            "media type not supported"
        );
        assert_eq!(
            Error::NoLocatorAvailable { message_id: "1".into() }.user_message(),
            "no link available for this media"
        );
        assert_eq!(
            Error::LoadError { locator: "a".into(), reason: "404".into() }.user_message(),
            "could not load media with any available source"
        );
    }

    #[test]
    fn test_terminal_classification() {
        assert!(Error::UnsupportedMedia("x".into()).is_terminal());
        assert!(Error::NoLocatorAvailable { message_id: "1".into() }.is_terminal());
        assert!(!Error::LoadError { locator: "a".into(), reason: "b".into() }.is_terminal());
        assert!(!Error::StaleEvent { locator: "a".into() }.is_terminal());
    }
}
