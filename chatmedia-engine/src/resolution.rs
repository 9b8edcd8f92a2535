//! Resolution state machine
//!
//! Walks one message's ordered candidate list:
//!
//! ```text
//! Pending -> Active(0) -> Active(i+1) on failure ... -> Exhausted
//!                 \-> Resolved on success
//! ```
//!
//! The active locator is always the candidate at the current index. Terminal
//! states only change through [`ResolutionMachine::reset`].

use chatmedia_common::CandidateLocator;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Position of a resolution in its candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index")]
pub enum ResolutionState {
    Pending,
    Active(usize),
    Exhausted,
    Resolved,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionState::Exhausted | ResolutionState::Resolved)
    }
}

impl std::fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionState::Pending => write!(f, "Pending"),
            ResolutionState::Active(i) => write!(f, "Active({})", i),
            ResolutionState::Exhausted => write!(f, "Exhausted"),
            ResolutionState::Resolved => write!(f, "Resolved"),
        }
    }
}

/// What an input did to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Advanced { from: usize, to: usize },
    Resolved(usize),
    Exhausted,
    Reset,
    /// Locator-tagged input for a locator that is no longer active
    Stale,
    /// Input not valid in the current state (terminal, or not started)
    Ignored,
}

/// Per-message resolution over an ordered candidate list
#[derive(Debug, Clone)]
pub struct ResolutionMachine {
    candidates: Vec<CandidateLocator>,
    state: ResolutionState,
    winner: Option<usize>,
    failure_count: usize,
}

impl ResolutionMachine {
    pub fn new(candidates: Vec<CandidateLocator>) -> Self {
        Self {
            candidates,
            state: ResolutionState::Pending,
            winner: None,
            failure_count: 0,
        }
    }

    /// `Pending -> Active(0)`, or `Exhausted` when there are no candidates
    pub fn start(&mut self) -> Transition {
        if self.state != ResolutionState::Pending {
            warn!(state = %self.state, "start() called on a resolution already started");
            return Transition::Ignored;
        }
        self.enter_first()
    }

    /// Latch the active locator as the winner
    pub fn on_success(&mut self) -> Transition {
        match self.state {
            ResolutionState::Active(index) => {
                self.state = ResolutionState::Resolved;
                self.winner = Some(index);
                info!(
                    index,
                    locator = %self.candidates[index].locator,
                    "Media resolved"
                );
                Transition::Resolved(index)
            }
            _ => Transition::Ignored,
        }
    }

    /// Advance to the next candidate, or exhaust
    pub fn on_failure(&mut self) -> Transition {
        match self.state {
            ResolutionState::Active(index) => {
                self.failure_count += 1;
                let next = index + 1;
                if next < self.candidates.len() {
                    self.state = ResolutionState::Active(next);
                    debug!(
                        from = index,
                        to = next,
                        locator = %self.candidates[next].locator,
                        "Advancing to next candidate"
                    );
                    Transition::Advanced { from: index, to: next }
                } else {
                    self.state = ResolutionState::Exhausted;
                    info!(failures = self.failure_count, "All candidates failed");
                    Transition::Exhausted
                }
            }
            _ => Transition::Ignored,
        }
    }

    /// Success for a specific locator; stale unless it is the active one
    pub fn on_success_for(&mut self, locator: &str) -> Transition {
        if !self.is_active_locator(locator) {
            debug!(locator, "Discarding stale success");
            return Transition::Stale;
        }
        self.on_success()
    }

    /// Failure for a specific locator; stale unless it is the active one
    pub fn on_failure_for(&mut self, locator: &str) -> Transition {
        if !self.is_active_locator(locator) {
            debug!(locator, "Discarding stale failure");
            return Transition::Stale;
        }
        self.on_failure()
    }

    /// Re-enter `Active(0)` from any started state, clearing failure bookkeeping
    pub fn reset(&mut self) -> Transition {
        if self.state == ResolutionState::Pending {
            return Transition::Ignored;
        }
        self.enter_first();
        debug!(state = %self.state, "Resolution reset");
        Transition::Reset
    }

    fn enter_first(&mut self) -> Transition {
        self.winner = None;
        self.failure_count = 0;
        if self.candidates.is_empty() {
            self.state = ResolutionState::Exhausted;
            Transition::Exhausted
        } else {
            self.state = ResolutionState::Active(0);
            Transition::Started
        }
    }

    fn is_active_locator(&self, locator: &str) -> bool {
        self.active_locator() == Some(locator)
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn active_index(&self) -> Option<usize> {
        match self.state {
            ResolutionState::Active(index) => Some(index),
            _ => None,
        }
    }

    pub fn active_candidate(&self) -> Option<&CandidateLocator> {
        self.active_index().map(|i| &self.candidates[i])
    }

    pub fn active_locator(&self) -> Option<&str> {
        self.active_candidate().map(|c| c.locator.as_str())
    }

    /// Winning candidate once resolved
    pub fn winner(&self) -> Option<&CandidateLocator> {
        self.winner.map(|i| &self.candidates[i])
    }

    pub fn candidates(&self) -> &[CandidateLocator] {
        &self.candidates
    }

    /// Failures since the last start/reset
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
