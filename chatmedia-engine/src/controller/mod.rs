//! Playback and display controllers
//!
//! A controller knows exactly one locator. It reports failures through the
//! session's [`FailureChannel`] and never touches the resolution directly;
//! the session decides whether a failure advances the candidate list.
//!
//! Rendering is abstracted behind [`MediaSurface`]: controllers decide what
//! should happen, the surface makes it happen on a real element.

pub mod playback;
pub mod static_media;

pub use playback::{PlaybackController, PlaybackState, PlayerEffect, PlayerEvent, PlayerState};
pub use static_media::{DisplayState, StaticController};

use std::sync::Arc;

use chatmedia_common::events::{FailureChannel, FailureEvent, FailureKind, Subscription};
use tracing::debug;
use uuid::Uuid;

/// Rendering target driven by a controller
///
/// Only `load` is required; static media never plays or seeks.
pub trait MediaSurface: Send {
    /// Begin loading `locator`; the outcome comes back through the controller
    fn load(&mut self, locator: &str);

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn seek(&mut self, _position: f64) {}

    /// `volume` is the effective level (0.0 while muted)
    fn set_volume(&mut self, _volume: f32) {}
}

/// Surface that renders nothing (command-line probing, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl MediaSurface for NullSurface {
    fn load(&mut self, locator: &str) {
        debug!(locator, "NullSurface load");
    }
}

/// What a controller call produced, for the caller to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerSignal {
    None,
    /// The bound locator loaded; report it to the session
    Succeeded { locator: String },
    /// A failure event went out on the channel
    FailurePublished { kind: FailureKind, retry_count: u32 },
    /// The action is not valid right now; show this to the user
    Warning(&'static str),
}

/// Channel plumbing shared by both controller flavours
#[derive(Debug)]
struct ChannelBinding {
    id: Uuid,
    message_id: String,
    locator: String,
    channel: Arc<FailureChannel>,
    subscription: Subscription,
    /// Peer failure already escalated for the current locator
    escalated: bool,
}

impl ChannelBinding {
    fn new(message_id: &str, locator: &str, channel: Arc<FailureChannel>) -> Self {
        let subscription = channel.subscribe(message_id);
        Self {
            id: Uuid::new_v4(),
            message_id: message_id.to_string(),
            locator: locator.to_string(),
            channel,
            subscription,
            escalated: false,
        }
    }

    fn publish(&self, kind: FailureKind, retry_count: u32) -> ControllerSignal {
        debug!(
            controller = %self.id,
            locator = %self.locator,
            kind = %kind,
            retry_count,
            "Publishing failure"
        );
        self.channel.publish_lossy(FailureEvent::new(
            self.message_id.as_str(),
            self.locator.as_str(),
            retry_count,
            kind,
            self.id,
        ));
        ControllerSignal::FailurePublished { kind, retry_count }
    }

    /// True if another controller reported our locator as broken
    ///
    /// Consumes every pending event; only the first peer failure per locator
    /// counts.
    fn take_peer_failure(&mut self) -> bool {
        let mut found = false;
        for event in self.subscription.drain() {
            let is_peer_failure = event.origin != self.id
                && event.failed_locator == self.locator
                && matches!(event.kind, FailureKind::LoadError | FailureKind::DisplayFailed);
            if is_peer_failure && !self.escalated {
                debug!(
                    controller = %self.id,
                    peer = %event.origin,
                    locator = %self.locator,
                    "Peer reported bound locator as failed"
                );
                found = true;
            }
        }
        if found {
            self.escalated = true;
        }
        found
    }

    /// Point at a new locator; anything buffered is about the old one
    fn rebind(&mut self, locator: &str) {
        self.subscription.drain();
        self.locator = locator.to_string();
        self.escalated = false;
    }
}
