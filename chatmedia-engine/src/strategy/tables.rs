//! Per-kind strategy tables
//!
//! Priorities are distinct within a table and spaced by ten so a strategy can
//! be slotted in later without renumbering.

use chatmedia_common::MediaKind;

use super::{templates, CandidateSource, Strategy, StrategyInput};

// ========================================
// Strategies
// ========================================

pub const INTERNAL_PATH_REWRITE: Strategy = Strategy {
    name: "internal-path-rewrite",
    applies: has_internal_path,
    build: build_internal_path,
};

pub const DIRECT_URL: Strategy = Strategy {
    name: "direct-url",
    applies: has_absolute_address,
    build: build_direct_url,
};

pub const SMART_ENDPOINT: Strategy = Strategy {
    name: "smart-endpoint",
    applies: has_message_id,
    build: build_smart_endpoint,
};

pub const CHAT_SCOPED_ENDPOINT: Strategy = Strategy {
    name: "chat-scoped-endpoint",
    applies: has_chat_and_message_id,
    build: build_chat_scoped,
};

pub const SECONDARY_ID_ENDPOINT: Strategy = Strategy {
    name: "secondary-id-endpoint",
    applies: has_secondary_id,
    build: build_secondary_id,
};

pub const STATIC_FILENAME: Strategy = Strategy {
    name: "static-filename",
    applies: has_file_name,
    build: build_static_filename,
};

pub const PROVIDER_FILENAME: Strategy = Strategy {
    name: "provider-filename",
    applies: has_file_name_and_provider,
    build: build_provider_filename,
};

pub const RELATIVE_PATH: Strategy = Strategy {
    name: "relative-path",
    applies: has_unmounted_relative_path,
    build: build_relative_path,
};

pub const GENERIC_BY_ID: Strategy = Strategy {
    name: "generic-by-id",
    applies: has_message_id,
    build: build_generic_by_id,
};

fn has_internal_path(input: &StrategyInput<'_>) -> bool {
    input
        .relative_address()
        .is_some_and(templates::has_internal_prefix)
}

fn build_internal_path(input: &StrategyInput<'_>) -> Option<String> {
    input
        .templates
        .rewrite_internal_path(input.relative_address()?)
}

fn has_absolute_address(input: &StrategyInput<'_>) -> bool {
    input.absolute_address().is_some()
}

fn build_direct_url(input: &StrategyInput<'_>) -> Option<String> {
    input.absolute_address().map(str::to_string)
}

fn has_message_id(input: &StrategyInput<'_>) -> bool {
    input.message_id().is_some()
}

fn build_smart_endpoint(input: &StrategyInput<'_>) -> Option<String> {
    input
        .templates
        .smart_endpoint(input.kind(), input.message_id()?)
}

fn has_chat_and_message_id(input: &StrategyInput<'_>) -> bool {
    input.chat_id.is_some() && input.message_id().is_some()
}

fn build_chat_scoped(input: &StrategyInput<'_>) -> Option<String> {
    input
        .templates
        .chat_scoped_endpoint(input.chat_id?, input.message_id()?)
}

fn has_secondary_id(input: &StrategyInput<'_>) -> bool {
    input.secondary_id.is_some()
}

fn build_secondary_id(input: &StrategyInput<'_>) -> Option<String> {
    input
        .templates
        .secondary_id_endpoint(input.kind(), input.secondary_id?)
}

fn has_file_name(input: &StrategyInput<'_>) -> bool {
    input.descriptor.file_name().is_some()
}

fn build_static_filename(input: &StrategyInput<'_>) -> Option<String> {
    input
        .templates
        .static_file(input.kind(), input.descriptor.file_name()?)
}

fn has_file_name_and_provider(input: &StrategyInput<'_>) -> bool {
    has_file_name(input) && input.templates.has_provider()
}

fn build_provider_filename(input: &StrategyInput<'_>) -> Option<String> {
    input
        .templates
        .provider_file(input.kind(), input.descriptor.file_name()?)
}

fn has_unmounted_relative_path(input: &StrategyInput<'_>) -> bool {
    input
        .relative_address()
        .is_some_and(|p| !templates::has_internal_prefix(p))
}

fn build_relative_path(input: &StrategyInput<'_>) -> Option<String> {
    input.templates.relative_path(input.relative_address()?)
}

fn build_generic_by_id(input: &StrategyInput<'_>) -> Option<String> {
    input.templates.generic_by_id(input.message_id()?)
}

// ========================================
// Tables
// ========================================

const AUDIO_TABLE: &[(u32, Strategy)] = &[
    (10, INTERNAL_PATH_REWRITE),
    (20, DIRECT_URL),
    (30, SMART_ENDPOINT),
    (40, CHAT_SCOPED_ENDPOINT),
    (50, SECONDARY_ID_ENDPOINT),
    (60, STATIC_FILENAME),
    (70, PROVIDER_FILENAME),
    (80, RELATIVE_PATH),
    (90, GENERIC_BY_ID),
];

const IMAGE_TABLE: &[(u32, Strategy)] = &[
    (10, INTERNAL_PATH_REWRITE),
    (20, DIRECT_URL),
    (30, STATIC_FILENAME),
    (40, SMART_ENDPOINT),
    (50, CHAT_SCOPED_ENDPOINT),
    (60, SECONDARY_ID_ENDPOINT),
    (70, PROVIDER_FILENAME),
    (80, RELATIVE_PATH),
    (90, GENERIC_BY_ID),
];

// Provider video URLs are signed and expire, so the backend is asked first
const VIDEO_TABLE: &[(u32, Strategy)] = &[
    (10, INTERNAL_PATH_REWRITE),
    (20, SMART_ENDPOINT),
    (30, DIRECT_URL),
    (40, CHAT_SCOPED_ENDPOINT),
    (50, SECONDARY_ID_ENDPOINT),
    (60, STATIC_FILENAME),
    (70, PROVIDER_FILENAME),
    (80, RELATIVE_PATH),
    (90, GENERIC_BY_ID),
];

const STICKER_TABLE: &[(u32, Strategy)] = &[
    (10, DIRECT_URL),
    (20, INTERNAL_PATH_REWRITE),
    (30, PROVIDER_FILENAME),
    (40, STATIC_FILENAME),
    (50, SMART_ENDPOINT),
    (60, SECONDARY_ID_ENDPOINT),
    (70, RELATIVE_PATH),
    (80, GENERIC_BY_ID),
];

const DOCUMENT_TABLE: &[(u32, Strategy)] = &[
    (10, INTERNAL_PATH_REWRITE),
    (20, DIRECT_URL),
    (30, SMART_ENDPOINT),
    (40, STATIC_FILENAME),
    (50, CHAT_SCOPED_ENDPOINT),
    (60, SECONDARY_ID_ENDPOINT),
    (70, RELATIVE_PATH),
    (80, PROVIDER_FILENAME),
    (90, GENERIC_BY_ID),
];

// ========================================
// Sources
// ========================================

macro_rules! candidate_source {
    ($name:ident, $kind:expr, $table:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl CandidateSource for $name {
            fn kind(&self) -> MediaKind {
                $kind
            }

            fn strategies(&self) -> &'static [(u32, Strategy)] {
                $table
            }
        }
    };
}

candidate_source!(AudioSource, MediaKind::Audio, AUDIO_TABLE);
candidate_source!(ImageSource, MediaKind::Image, IMAGE_TABLE);
candidate_source!(VideoSource, MediaKind::Video, VIDEO_TABLE);
candidate_source!(StickerSource, MediaKind::Sticker, STICKER_TABLE);
candidate_source!(DocumentSource, MediaKind::Document, DOCUMENT_TABLE);

/// Candidate source for a media kind
pub fn source_for(kind: MediaKind) -> &'static dyn CandidateSource {
    match kind {
        MediaKind::Audio => &AudioSource,
        MediaKind::Image => &ImageSource,
        MediaKind::Video => &VideoSource,
        MediaKind::Sticker => &StickerSource,
        MediaKind::Document => &DocumentSource,
    }
}
