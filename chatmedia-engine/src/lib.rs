//! # Chat Media Resolution Engine (chatmedia-engine)
//!
//! Turns a raw chat message into a displayable media locator.
//!
//! **Purpose:** Extract a typed media descriptor from loosely structured
//! message payloads, synthesize ranked candidate addresses, and walk them
//! until one loads or all have failed.
//!
//! **Architecture:** extractor -> strategy tables -> resolution machine,
//! with display/playback controllers reporting failures back through a
//! per-session broadcast channel.

pub mod controller;
pub mod error;
pub mod extractor;
pub mod resolution;
pub mod session;
pub mod strategy;

pub use controller::{MediaSurface, NullSurface, PlaybackController, StaticController};
pub use error::{Error, Result};
pub use resolution::{ResolutionMachine, ResolutionState, Transition};
pub use session::{MediaSession, MediaView, MediaViewModel, SessionConfig, UnrecoverableReason};
pub use strategy::{generate_candidates, MessageMeta};
