//! # Chat Media Common Library
//!
//! Shared code for the chat media workspace including:
//! - Media kinds, descriptors and candidate locators
//! - The raw message record handed over by the rendering layer
//! - Failure events and the per-message failure channel
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod message;

pub use error::{Error, Result};
pub use media::{CandidateLocator, MediaDescriptor, MediaKind};
pub use message::RawMessage;
