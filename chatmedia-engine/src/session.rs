//! Media session
//!
//! Owns everything for one message render: the descriptor, the resolution
//! machine, the failure channel and the session's own subscription to it.
//! Controllers are handed an `Arc` of the channel at construction.
//!
//! Dropping the session (or calling [`MediaSession::close`]) tears down its
//! subscription; a re-render opens a new session.

use std::sync::Arc;

use chatmedia_common::config::{TomlConfig, DEFAULT_MAX_LOCAL_RETRIES};
use chatmedia_common::events::{FailureChannel, FailureEvent, FailureKind, Subscription};
use chatmedia_common::{CandidateLocator, MediaDescriptor, MediaKind, RawMessage};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::controller::{MediaSurface, PlaybackController, StaticController};
use crate::error::{Error, Result};
use crate::extractor;
use crate::resolution::{ResolutionMachine, ResolutionState, Transition};
use crate::strategy::{self, MessageMeta};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Session tuning, normally taken from [`TomlConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub max_local_retries: u32,
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_local_retries: DEFAULT_MAX_LOCAL_RETRIES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl From<&TomlConfig> for SessionConfig {
    fn from(config: &TomlConfig) -> Self {
        Self {
            max_local_retries: config.max_local_retries,
            channel_capacity: config.channel_capacity,
        }
    }
}

/// What the rendering layer should show
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MediaView {
    Loading {
        /// Zero-based index of the candidate being tried
        attempt: usize,
        candidates: usize,
        locator: Option<String>,
    },
    Displayable(MediaViewModel),
    Unrecoverable {
        reason: UnrecoverableReason,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaViewModel {
    pub message_id: String,
    pub kind: MediaKind,
    pub locator: String,
    /// Strategy that produced the winning locator
    pub source: String,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnrecoverableReason {
    UnsupportedMedia,
    NoLocatorAvailable,
    Exhausted,
}

impl UnrecoverableReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            UnrecoverableReason::UnsupportedMedia => "media type not supported",
            UnrecoverableReason::NoLocatorAvailable => "no link available for this media",
            UnrecoverableReason::Exhausted => "could not load media with any available source",
        }
    }
}

#[derive(Debug)]
struct Resolution {
    descriptor: MediaDescriptor,
    machine: ResolutionMachine,
}

/// Per-message-render owner of the resolution pipeline
#[derive(Debug)]
pub struct MediaSession {
    key: String,
    meta: MessageMeta,
    config: SessionConfig,
    channel: Arc<FailureChannel>,
    subscription: Subscription,
    resolution: std::result::Result<Resolution, Error>,
}

impl MediaSession {
    /// Extract, generate candidates and start resolving
    ///
    /// Never fails: extractor and generator errors are terminal and show up
    /// as [`MediaView::Unrecoverable`].
    pub fn open(raw: &RawMessage, meta: MessageMeta, config: &SessionConfig) -> Self {
        let key = session_key(raw);
        let channel = Arc::new(FailureChannel::new(config.channel_capacity));
        let subscription = channel.subscribe(key.as_str());
        let resolution = resolve(raw, &meta);

        match &resolution {
            Ok(r) => info!(
                key = %key,
                kind = %r.descriptor.kind(),
                candidates = r.machine.candidates().len(),
                "Media session opened"
            ),
            Err(e) => warn!(key = %key, error = %e, "Media session opened unresolvable"),
        }

        Self {
            key,
            meta,
            config: *config,
            channel,
            subscription,
            resolution,
        }
    }

    /// Render key: the message id, or a generated one for id-less messages
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn descriptor(&self) -> Option<&MediaDescriptor> {
        self.resolution.as_ref().ok().map(|r| &r.descriptor)
    }

    pub fn candidates(&self) -> &[CandidateLocator] {
        match &self.resolution {
            Ok(r) => r.machine.candidates(),
            Err(_) => &[],
        }
    }

    /// `None` when extraction or generation failed
    pub fn state(&self) -> Option<ResolutionState> {
        self.resolution.as_ref().ok().map(|r| r.machine.state())
    }

    pub fn active_candidate(&self) -> Option<&CandidateLocator> {
        self.resolution
            .as_ref()
            .ok()
            .and_then(|r| r.machine.active_candidate())
    }

    pub fn active_locator(&self) -> Option<&str> {
        self.active_candidate().map(|c| c.locator.as_str())
    }

    /// Extractor/generator error that ended this session before resolving
    pub fn terminal_error(&self) -> Option<&Error> {
        self.resolution.as_ref().err()
    }

    pub fn channel(&self) -> &Arc<FailureChannel> {
        &self.channel
    }

    pub fn view(&self) -> MediaView {
        let resolution = match &self.resolution {
            Ok(r) => r,
            Err(e) => {
                let reason = match e {
                    Error::UnsupportedMedia(_) => UnrecoverableReason::UnsupportedMedia,
                    Error::NoLocatorAvailable { .. } => UnrecoverableReason::NoLocatorAvailable,
                    _ => UnrecoverableReason::Exhausted,
                };
                return unrecoverable(reason);
            }
        };

        let machine = &resolution.machine;
        match machine.state() {
            ResolutionState::Pending => MediaView::Loading {
                attempt: 0,
                candidates: machine.candidates().len(),
                locator: None,
            },
            ResolutionState::Active(index) => MediaView::Loading {
                attempt: index,
                candidates: machine.candidates().len(),
                locator: machine.active_locator().map(str::to_string),
            },
            ResolutionState::Resolved => match machine.winner() {
                Some(winner) => {
                    let descriptor = &resolution.descriptor;
                    MediaView::Displayable(MediaViewModel {
                        message_id: self.key.clone(),
                        kind: descriptor.kind(),
                        locator: winner.locator.clone(),
                        source: winner.description.clone(),
                        file_name: descriptor.file_name().map(str::to_string),
                        size_bytes: descriptor.size_bytes(),
                        duration_seconds: descriptor.duration_seconds(),
                    })
                }
                None => unrecoverable(UnrecoverableReason::Exhausted),
            },
            ResolutionState::Exhausted => unrecoverable(UnrecoverableReason::Exhausted),
        }
    }

    // ========================================
    // Controllers
    // ========================================

    /// Display controller bound to the active locator
    pub fn static_controller(&self, surface: Box<dyn MediaSurface>) -> Result<StaticController> {
        let locator = self.require_active_locator()?;
        Ok(StaticController::new(
            &self.key,
            locator,
            Arc::clone(&self.channel),
            surface,
        ))
    }

    /// Playback controller bound to the active locator, already loading
    ///
    /// Only audio and video are playable.
    pub fn av_controller(&self, surface: Box<dyn MediaSurface>) -> Result<PlaybackController> {
        let locator = self.require_active_locator()?;
        let descriptor = self
            .descriptor()
            .ok_or_else(|| Error::InvalidState("session has no descriptor".to_string()))?;
        if !descriptor.kind().is_playable() {
            return Err(Error::InvalidState(format!(
                "{} media has no playback controller",
                descriptor.kind()
            )));
        }

        let mut controller =
            PlaybackController::new(&self.key, locator, Arc::clone(&self.channel), surface)
                .with_retry_threshold(self.config.max_local_retries)
                .with_duration_hint(descriptor.duration_seconds());
        controller.load();
        Ok(controller)
    }

    fn require_active_locator(&self) -> Result<&str> {
        self.active_locator().ok_or_else(|| {
            Error::InvalidState(format!(
                "no active locator for {} (state {})",
                self.key,
                self.state()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unresolvable".to_string())
            ))
        })
    }

    // ========================================
    // Event handling
    // ========================================

    /// Apply every pending failure event, in delivery order
    pub fn pump(&mut self) -> Vec<Transition> {
        let events = self.subscription.drain();
        events.into_iter().map(|event| self.apply(event)).collect()
    }

    /// Wait for the next failure event and apply it
    ///
    /// Returns `None` once the channel is gone.
    pub async fn next_transition(&mut self) -> Option<Transition> {
        let event = self.subscription.next().await?;
        Some(self.apply(event))
    }

    /// A controller loaded `locator`
    pub fn report_success(&mut self, locator: &str) -> Transition {
        match &mut self.resolution {
            Ok(r) => r.machine.on_success_for(locator),
            Err(_) => Transition::Ignored,
        }
    }

    /// User-initiated retry from the first candidate
    pub fn retry(&mut self) -> Transition {
        let transition = match &mut self.resolution {
            Ok(r) => r.machine.reset(),
            Err(_) => Transition::Ignored,
        };
        if transition == Transition::Reset {
            let discarded = self.subscription.drain().len();
            info!(key = %self.key, discarded, "Resolution restarted by user");
        }
        transition
    }

    /// Re-resolve after the message changed
    ///
    /// Returns `true` when the session was rebuilt. Controllers created
    /// before a rebuild are bound to the old channel and must be recreated.
    pub fn refresh(&mut self, raw: &RawMessage) -> bool {
        // An id-less message keeps its anonymous key across refreshes
        let key = explicit_key(raw).unwrap_or_else(|| self.key.clone());
        let fresh = resolve(raw, &self.meta);

        let unchanged = key == self.key
            && match (&self.resolution, &fresh) {
                (Ok(old), Ok(new)) => old.descriptor == new.descriptor,
                _ => false,
            };
        if unchanged {
            debug!(key = %self.key, "Refresh with unchanged descriptor");
            return false;
        }

        // Old subscription goes first so nothing published afterwards reaches it
        let channel = Arc::new(FailureChannel::new(self.config.channel_capacity));
        let subscription = channel.subscribe(key.as_str());
        let old = std::mem::replace(&mut self.subscription, subscription);
        old.unsubscribe();

        info!(old_key = %self.key, key = %key, "Media session refreshed");
        self.key = key;
        self.channel = channel;
        self.resolution = fresh;
        true
    }

    /// Tear down the session's subscription
    pub fn close(self) {
        debug!(key = %self.key, "Media session closed");
        self.subscription.unsubscribe();
    }

    fn apply(&mut self, event: FailureEvent) -> Transition {
        let Ok(resolution) = &mut self.resolution else {
            return Transition::Ignored;
        };
        let machine = &mut resolution.machine;

        match event.kind {
            FailureKind::DisplayFailed | FailureKind::AlternateRequested => {
                machine.on_failure_for(&event.failed_locator)
            }
            FailureKind::LoadError => {
                if machine.active_locator() == Some(event.failed_locator.as_str()) {
                    debug!(
                        locator = %event.failed_locator,
                        retry_count = event.retry_count,
                        "Load error left to the controller's local retries"
                    );
                    Transition::Ignored
                } else {
                    debug!(locator = %event.failed_locator, "Discarding stale load error");
                    Transition::Stale
                }
            }
        }
    }
}

fn session_key(raw: &RawMessage) -> String {
    explicit_key(raw).unwrap_or_else(|| format!("anon-{}", Uuid::new_v4()))
}

fn explicit_key(raw: &RawMessage) -> Option<String> {
    raw.id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn resolve(raw: &RawMessage, meta: &MessageMeta) -> Result<Resolution> {
    let descriptor = extractor::extract(raw)?;
    let candidates = strategy::generate_candidates(&descriptor, meta)?;
    let mut machine = ResolutionMachine::new(candidates);
    machine.start();
    Ok(Resolution {
        descriptor,
        machine,
    })
}

fn unrecoverable(reason: UnrecoverableReason) -> MediaView {
    MediaView::Unrecoverable {
        reason,
        message: reason.user_message().to_string(),
    }
}
