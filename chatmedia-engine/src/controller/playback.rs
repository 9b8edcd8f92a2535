//! Audio/video playback controller
//!
//! ```text
//! Idle -> Loading -> Ready -> Playing <-> Paused -> Ended
//!            \-> LoadError -> (retry) Loading
//! ```
//!
//! Every state change goes through [`transition`], a pure
//! `(state, event) -> (next state, effect)` table. The controller applies
//! the effect to its [`MediaSurface`].

use std::sync::Arc;

use chatmedia_common::config::DEFAULT_MAX_LOCAL_RETRIES;
use chatmedia_common::events::{FailureChannel, FailureKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ChannelBinding, ControllerSignal, MediaSurface};

const DEFAULT_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    LoadError,
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Load,
    MetadataLoaded,
    LoadFailed,
    Play,
    Pause,
    Seek,
    PlaybackEnded,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEffect {
    Nothing,
    LoadSource,
    ReportReady,
    ReportLoadError,
    StartPlayback,
    RestartPlayback,
    PausePlayback,
    SeekTo,
    Warn(&'static str),
}

/// Transition table for the playback controller
pub fn transition(state: PlayerState, event: PlayerEvent) -> (PlayerState, PlayerEffect) {
    use PlayerEffect as E;
    use PlayerEvent as Ev;
    use PlayerState as S;

    match (state, event) {
        (S::Idle, Ev::Load) => (S::Loading, E::LoadSource),
        (S::LoadError, Ev::Retry) => (S::Loading, E::LoadSource),

        (S::Loading, Ev::MetadataLoaded) => (S::Ready, E::ReportReady),
        (S::Idle | S::Loading, Ev::LoadFailed) => (S::LoadError, E::ReportLoadError),

        (S::Ready | S::Paused, Ev::Play) => (S::Playing, E::StartPlayback),
        (S::Ended, Ev::Play) => (S::Playing, E::RestartPlayback),
        (S::Playing, Ev::Pause) => (S::Paused, E::PausePlayback),
        (S::Playing, Ev::PlaybackEnded) => (S::Ended, E::Nothing),

        (S::Ready | S::Playing | S::Paused, Ev::Seek) => (state, E::SeekTo),
        (S::Ended, Ev::Seek) => (S::Paused, E::SeekTo),

        (S::Idle, Ev::Play | Ev::Seek) => (state, E::Warn("no media loaded")),
        (S::Loading, Ev::Play | Ev::Pause | Ev::Seek) => (state, E::Warn("media is still loading")),
        (S::LoadError, Ev::Play | Ev::Pause | Ev::Seek) => {
            (state, E::Warn("media failed to load"))
        }

        _ => (state, E::Nothing),
    }
}

/// Snapshot of a playback controller for the view layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub state: PlayerState,
    pub loading: bool,
    pub ready: bool,
    pub playing: bool,
    /// Seconds
    pub current_position: f64,
    /// Seconds; 0.0 until known
    pub total_duration: f64,
    /// 0.0-1.0, the level restored when unmuted
    pub volume: f32,
    pub muted: bool,
    pub error_count: u32,
}

/// Audio/video controller bound to one locator
pub struct PlaybackController {
    binding: ChannelBinding,
    state: PlayerState,
    surface: Box<dyn MediaSurface>,
    current_position: f64,
    total_duration: f64,
    duration_hint: Option<f64>,
    volume: f32,
    muted: bool,
    error_count: u32,
    retry_threshold: u32,
}

impl PlaybackController {
    /// Controller in `Idle`; call [`load`](Self::load) to start
    pub fn new(
        message_id: &str,
        locator: &str,
        channel: Arc<FailureChannel>,
        surface: Box<dyn MediaSurface>,
    ) -> Self {
        Self {
            binding: ChannelBinding::new(message_id, locator, channel),
            state: PlayerState::Idle,
            surface,
            current_position: 0.0,
            total_duration: 0.0,
            duration_hint: None,
            volume: DEFAULT_VOLUME,
            muted: false,
            error_count: 0,
            retry_threshold: DEFAULT_MAX_LOCAL_RETRIES,
        }
    }

    /// Local failures before "try alternate" is offered (minimum 1)
    pub fn with_retry_threshold(mut self, threshold: u32) -> Self {
        self.retry_threshold = threshold.max(1);
        self
    }

    /// Duration known from the message, used until metadata arrives
    pub fn with_duration_hint(mut self, seconds: Option<f64>) -> Self {
        self.duration_hint = seconds.filter(|s| s.is_finite() && *s >= 0.0);
        self.total_duration = self.duration_hint.unwrap_or(0.0);
        self
    }

    pub fn id(&self) -> Uuid {
        self.binding.id
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn locator(&self) -> &str {
        &self.binding.locator
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            state: self.state,
            loading: self.state == PlayerState::Loading,
            ready: matches!(
                self.state,
                PlayerState::Ready | PlayerState::Playing | PlayerState::Paused | PlayerState::Ended
            ),
            playing: self.state == PlayerState::Playing,
            current_position: self.current_position,
            total_duration: self.total_duration,
            volume: self.volume,
            muted: self.muted,
            error_count: self.error_count,
        }
    }

    // ========================================
    // User actions
    // ========================================

    pub fn load(&mut self) -> ControllerSignal {
        self.apply(PlayerEvent::Load)
    }

    pub fn play(&mut self) -> ControllerSignal {
        self.apply(PlayerEvent::Play)
    }

    pub fn pause(&mut self) -> ControllerSignal {
        self.apply(PlayerEvent::Pause)
    }

    /// Seek, clamped to `[0, total_duration]`
    pub fn set_position(&mut self, seconds: f64) -> ControllerSignal {
        let (_, effect) = transition(self.state, PlayerEvent::Seek);
        if effect == PlayerEffect::SeekTo {
            self.current_position = self.clamp_position(seconds);
        }
        self.apply(PlayerEvent::Seek)
    }

    /// Set volume, clamped to `[0, 1]`; unmutes
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.muted = false;
        self.surface.set_volume(self.volume);
    }

    /// Mute, or unmute back to the volume set before muting
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        let effective = if self.muted { 0.0 } else { self.volume };
        self.surface.set_volume(effective);
    }

    /// Reload the same locator after a load error
    pub fn retry(&mut self) -> ControllerSignal {
        if self.state != PlayerState::LoadError {
            return ControllerSignal::Warning("nothing to retry");
        }
        debug!(
            locator = %self.binding.locator,
            attempt = self.error_count + 1,
            "Retrying same locator"
        );
        self.apply(PlayerEvent::Retry)
    }

    /// "Try alternate locator" is offered once local retries reach the threshold
    pub fn can_try_alternate(&self) -> bool {
        self.error_count >= self.retry_threshold
    }

    /// Ask the session to move on to the next candidate
    pub fn try_alternate(&mut self) -> ControllerSignal {
        if !self.can_try_alternate() {
            return ControllerSignal::Warning("try again before switching source");
        }
        info!(
            locator = %self.binding.locator,
            errors = self.error_count,
            "Requesting alternate locator"
        );
        self.binding
            .publish(FailureKind::AlternateRequested, self.error_count)
    }

    // ========================================
    // Media element callbacks
    // ========================================

    /// Metadata arrived: the locator is playable
    pub fn on_metadata_loaded(&mut self, duration: Option<f64>) -> ControllerSignal {
        if let Some(seconds) = duration.filter(|s| s.is_finite() && *s >= 0.0) {
            self.total_duration = seconds;
        }
        self.apply(PlayerEvent::MetadataLoaded)
    }

    pub fn on_load_error(&mut self, reason: &str) -> ControllerSignal {
        warn!(locator = %self.binding.locator, reason, "Media load failed");
        self.apply(PlayerEvent::LoadFailed)
    }

    pub fn on_time_update(&mut self, seconds: f64) {
        if matches!(self.state, PlayerState::Playing | PlayerState::Paused) {
            self.current_position = self.clamp_position(seconds);
        }
    }

    pub fn on_ended(&mut self) -> ControllerSignal {
        self.apply(PlayerEvent::PlaybackEnded)
    }

    // ========================================
    // Session coordination
    // ========================================

    /// Escalate immediately when a peer reports our locator as failed
    ///
    /// Only before playback became possible; a controller that already
    /// loaded keeps playing.
    pub fn poll_peers(&mut self) -> ControllerSignal {
        if !self.binding.take_peer_failure() {
            return ControllerSignal::None;
        }
        match self.state {
            PlayerState::Idle | PlayerState::Loading | PlayerState::LoadError => self
                .binding
                .publish(FailureKind::AlternateRequested, self.error_count),
            _ => ControllerSignal::None,
        }
    }

    /// Bind to a new locator and start loading it
    ///
    /// The whole playback state starts over, volume and mute included.
    pub fn rebind(&mut self, locator: &str) -> ControllerSignal {
        self.binding.rebind(locator);
        self.state = PlayerState::Idle;
        self.current_position = 0.0;
        self.total_duration = self.duration_hint.unwrap_or(0.0);
        self.volume = DEFAULT_VOLUME;
        self.muted = false;
        self.error_count = 0;
        self.surface.set_volume(self.volume);
        self.load()
    }

    fn apply(&mut self, event: PlayerEvent) -> ControllerSignal {
        let (next, effect) = transition(self.state, event);
        if next != self.state {
            debug!(
                controller = %self.binding.id,
                from = %self.state,
                to = %next,
                ?event,
                "Player transition"
            );
        }
        self.state = next;

        match effect {
            PlayerEffect::Nothing => ControllerSignal::None,
            PlayerEffect::LoadSource => {
                self.surface.load(&self.binding.locator);
                ControllerSignal::None
            }
            PlayerEffect::ReportReady => ControllerSignal::Succeeded {
                locator: self.binding.locator.clone(),
            },
            PlayerEffect::ReportLoadError => {
                self.error_count += 1;
                self.binding.publish(FailureKind::LoadError, self.error_count)
            }
            PlayerEffect::StartPlayback => {
                self.surface.play();
                ControllerSignal::None
            }
            PlayerEffect::RestartPlayback => {
                self.current_position = 0.0;
                self.surface.seek(0.0);
                self.surface.play();
                ControllerSignal::None
            }
            PlayerEffect::PausePlayback => {
                self.surface.pause();
                ControllerSignal::None
            }
            PlayerEffect::SeekTo => {
                self.surface.seek(self.current_position);
                ControllerSignal::None
            }
            PlayerEffect::Warn(message) => {
                warn!(state = %self.state, ?event, "{}", message);
                ControllerSignal::Warning(message)
            }
        }
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.total_duration)
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("id", &self.binding.id)
            .field("locator", &self.binding.locator)
            .field("state", &self.state)
            .field("error_count", &self.error_count)
            .finish()
    }
}
