//! Candidate locator generation
//!
//! Each media kind owns a fixed table of `(priority, strategy)` rows. A
//! strategy is a precondition over the available descriptor fields plus a
//! builder that synthesizes one address. The generator evaluates every row
//! whose precondition holds, then ranks and deduplicates through
//! [`rank_and_dedup`], which all kinds share.
//!
//! No I/O happens here.

mod tables;
pub mod templates;

pub use tables::{source_for, AudioSource, DocumentSource, ImageSource, StickerSource, VideoSource};
pub use templates::LocatorTemplates;

use std::collections::HashSet;

use chatmedia_common::config::TomlConfig;
use chatmedia_common::{CandidateLocator, MediaDescriptor, MediaKind};
use tracing::debug;

use crate::error::{Error, Result};

/// Message metadata supplied alongside the descriptor
///
/// Chat id and secondary id given here take precedence over the ones the
/// extractor found in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    pub backend_origin: String,
    pub provider_origin: Option<String>,
    pub chat_id: Option<String>,
    pub secondary_id: Option<String>,
}

impl MessageMeta {
    pub fn new(backend_origin: impl Into<String>) -> Self {
        Self {
            backend_origin: backend_origin.into(),
            provider_origin: None,
            chat_id: None,
            secondary_id: None,
        }
    }

    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            backend_origin: config.backend_origin.clone(),
            provider_origin: config.provider_origin.clone(),
            chat_id: None,
            secondary_id: None,
        }
    }

    pub fn with_provider_origin(mut self, origin: impl Into<String>) -> Self {
        self.provider_origin = Some(origin.into());
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_secondary_id(mut self, secondary_id: impl Into<String>) -> Self {
        self.secondary_id = Some(secondary_id.into());
        self
    }
}

/// Everything a strategy may look at
pub struct StrategyInput<'a> {
    pub descriptor: &'a MediaDescriptor,
    pub templates: LocatorTemplates,
    pub chat_id: Option<&'a str>,
    pub secondary_id: Option<&'a str>,
}

impl<'a> StrategyInput<'a> {
    pub fn new(descriptor: &'a MediaDescriptor, meta: &'a MessageMeta) -> Self {
        Self {
            descriptor,
            templates: LocatorTemplates::new(
                &meta.backend_origin,
                meta.provider_origin.as_deref(),
            ),
            chat_id: meta.chat_id.as_deref().or(descriptor.chat_id()),
            secondary_id: meta.secondary_id.as_deref().or(descriptor.secondary_id()),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.descriptor.kind()
    }

    pub fn message_id(&self) -> Option<&'a str> {
        self.descriptor.message_id()
    }

    /// Explicit path, or explicit URL when it is not absolute
    pub fn relative_address(&self) -> Option<&'a str> {
        self.descriptor
            .explicit_path()
            .filter(|p| !templates::is_absolute(p))
            .or_else(|| {
                self.descriptor
                    .explicit_url()
                    .filter(|u| !templates::is_absolute(u))
            })
    }

    /// Explicit URL, or explicit path when it is absolute
    pub fn absolute_address(&self) -> Option<&'a str> {
        self.descriptor
            .explicit_url()
            .filter(|u| templates::is_absolute(u))
            .or_else(|| {
                self.descriptor
                    .explicit_path()
                    .filter(|p| templates::is_absolute(p))
            })
    }
}

/// One row of a strategy table: precondition and address builder
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub applies: fn(&StrategyInput<'_>) -> bool,
    pub build: fn(&StrategyInput<'_>) -> Option<String>,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// "Resolve candidates for kind X", implemented once per media kind
pub trait CandidateSource: Send + Sync {
    fn kind(&self) -> MediaKind;

    /// Fixed table; priorities are distinct within one table
    fn strategies(&self) -> &'static [(u32, Strategy)];

    /// Evaluate every applicable row, then rank and deduplicate
    fn candidates(&self, input: &StrategyInput<'_>) -> Vec<CandidateLocator> {
        let generated = self
            .strategies()
            .iter()
            .filter(|(_, strategy)| (strategy.applies)(input))
            .filter_map(|(priority, strategy)| {
                let built = (strategy.build)(input);
                if built.is_none() {
                    debug!(strategy = strategy.name, "Strategy applied but built no address");
                }
                built.map(|locator| CandidateLocator::new(*priority, locator, strategy.name))
            })
            .collect();
        rank_and_dedup(generated)
    }
}

/// Stable sort by ascending priority, then drop repeated addresses
///
/// The first (highest-precedence) occurrence of an address is kept.
pub fn rank_and_dedup(mut candidates: Vec<CandidateLocator>) -> Vec<CandidateLocator> {
    candidates.sort_by_key(|c| c.priority);
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.locator.clone()));
    candidates
}

/// Produce the ordered candidate list for one descriptor
///
/// Zero candidates is reported as [`Error::NoLocatorAvailable`], never as an
/// empty success.
pub fn generate_candidates(
    descriptor: &MediaDescriptor,
    meta: &MessageMeta,
) -> Result<Vec<CandidateLocator>> {
    let input = StrategyInput::new(descriptor, meta);
    let candidates = source_for(descriptor.kind()).candidates(&input);

    if candidates.is_empty() {
        return Err(Error::NoLocatorAvailable {
            message_id: descriptor.message_id().unwrap_or("<none>").to_string(),
        });
    }

    debug!(
        kind = %descriptor.kind(),
        count = candidates.len(),
        "Generated candidate locators"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_and_dedup_keeps_highest_precedence() {
        let ranked = rank_and_dedup(vec![
            CandidateLocator::new(30, "b", "third"),
            CandidateLocator::new(10, "a", "first"),
            CandidateLocator::new(20, "b", "second"),
            CandidateLocator::new(40, "a", "fourth"),
        ]);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].locator, "a");
        assert_eq!(ranked[0].description, "first");
        assert_eq!(ranked[1].locator, "b");
        assert_eq!(ranked[1].description, "second");
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let ranked = rank_and_dedup(vec![
            CandidateLocator::new(10, "x", "generated-first"),
            CandidateLocator::new(10, "y", "generated-second"),
        ]);
        assert_eq!(ranked[0].description, "generated-first");
        assert_eq!(ranked[1].description, "generated-second");
    }

    #[test]
    fn test_meta_overrides_descriptor_ids() {
        let descriptor = MediaDescriptor::new(MediaKind::Image, serde_json::Value::Null)
            .with_chat_id(Some("from-record".into()));
        let meta = MessageMeta::new("https://chat.example.com").with_chat_id("from-meta");

        let input = StrategyInput::new(&descriptor, &meta);
        assert_eq!(input.chat_id, Some("from-meta"));
    }

    #[test]
    fn test_no_inputs_is_no_locator_available() {
        let descriptor = MediaDescriptor::new(MediaKind::Audio, serde_json::Value::Null);
        let meta = MessageMeta::new("https://chat.example.com");

        let err = generate_candidates(&descriptor, &meta).unwrap_err();
        assert!(matches!(err, Error::NoLocatorAvailable { .. }));
    }
}
