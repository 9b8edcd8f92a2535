//! Static media controller (image, sticker, document)

use std::sync::Arc;

use chatmedia_common::events::{FailureChannel, FailureKind};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ChannelBinding, ControllerSignal, MediaSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayState {
    Loading,
    Displayed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayEvent {
    Loaded,
    Errored,
    PeerFailed,
}

fn transition(state: DisplayState, event: DisplayEvent) -> Option<DisplayState> {
    match (state, event) {
        (DisplayState::Loading, DisplayEvent::Loaded) => Some(DisplayState::Displayed),
        (DisplayState::Loading, DisplayEvent::Errored) => Some(DisplayState::Failed),
        (DisplayState::Loading, DisplayEvent::PeerFailed) => Some(DisplayState::Failed),
        _ => None,
    }
}

/// `Loading -> {Displayed | Failed}` for one locator
pub struct StaticController {
    binding: ChannelBinding,
    state: DisplayState,
    surface: Box<dyn MediaSurface>,
}

impl StaticController {
    /// Subscribe to `channel` and start loading `locator` on `surface`
    pub fn new(
        message_id: &str,
        locator: &str,
        channel: Arc<FailureChannel>,
        mut surface: Box<dyn MediaSurface>,
    ) -> Self {
        surface.load(locator);
        Self {
            binding: ChannelBinding::new(message_id, locator, channel),
            state: DisplayState::Loading,
            surface,
        }
    }

    pub fn id(&self) -> Uuid {
        self.binding.id
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn locator(&self) -> &str {
        &self.binding.locator
    }

    /// Surface finished rendering the locator
    pub fn on_loaded(&mut self) -> ControllerSignal {
        match transition(self.state, DisplayEvent::Loaded) {
            Some(next) => {
                self.state = next;
                debug!(locator = %self.binding.locator, "Media displayed");
                ControllerSignal::Succeeded {
                    locator: self.binding.locator.clone(),
                }
            }
            None => ControllerSignal::None,
        }
    }

    /// Surface could not render the locator
    pub fn on_error(&mut self, reason: &str) -> ControllerSignal {
        match transition(self.state, DisplayEvent::Errored) {
            Some(next) => {
                self.state = next;
                warn!(locator = %self.binding.locator, reason, "Media display failed");
                self.binding.publish(FailureKind::DisplayFailed, 1)
            }
            None => ControllerSignal::None,
        }
    }

    /// React to failures other controllers reported for the same locator
    pub fn poll_peers(&mut self) -> ControllerSignal {
        if !self.binding.take_peer_failure() {
            return ControllerSignal::None;
        }
        match transition(self.state, DisplayEvent::PeerFailed) {
            Some(next) => {
                self.state = next;
                self.binding.publish(FailureKind::AlternateRequested, 0)
            }
            None => ControllerSignal::None,
        }
    }

    /// Show a different locator (the session advanced or was reset)
    pub fn rebind(&mut self, locator: &str) {
        self.binding.rebind(locator);
        self.state = DisplayState::Loading;
        self.surface.load(locator);
    }
}

impl std::fmt::Debug for StaticController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticController")
            .field("id", &self.binding.id)
            .field("locator", &self.binding.locator)
            .field("state", &self.state)
            .finish()
    }
}
