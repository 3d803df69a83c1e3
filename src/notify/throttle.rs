use std::time::{Duration, Instant};

use crate::watch::state::WatchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// Alert once per unavailable-to-available flip.
    OnStateChange,
    /// Re-alert on a fixed cadence for as long as anything stays available.
    Periodic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyDecision {
    Send,
    Skip(NotifySkip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifySkip {
    NothingAvailable,
    StateUnchanged,
    CooldownActive,
}

/// Decides when an alert may go out. Pure with respect to the clock: the
/// caller passes `now`, performs the send, and records the outcome on the
/// state afterwards.
#[derive(Debug)]
pub struct NotifyThrottle {
    mode: NotifyMode,
    state_change_cooldown: Duration,
    periodic_cooldown: Duration,
}

impl NotifyThrottle {
    pub fn new(
        mode: NotifyMode,
        state_change_cooldown: Duration,
        periodic_cooldown: Duration,
    ) -> Self {
        Self {
            mode,
            state_change_cooldown,
            periodic_cooldown,
        }
    }

    pub fn mode(&self) -> NotifyMode {
        self.mode
    }

    pub fn decide(&self, state: &WatchState, any_available: bool, now: Instant) -> NotifyDecision {
        match self.mode {
            NotifyMode::OnStateChange => {
                if !state.state_changed(any_available) {
                    return NotifyDecision::Skip(NotifySkip::StateUnchanged);
                }
                if !any_available {
                    return NotifyDecision::Skip(NotifySkip::NothingAvailable);
                }
                if !state.cooldown_elapsed(now, self.state_change_cooldown) {
                    return NotifyDecision::Skip(NotifySkip::CooldownActive);
                }
                NotifyDecision::Send
            }
            NotifyMode::Periodic => {
                if !any_available {
                    return NotifyDecision::Skip(NotifySkip::NothingAvailable);
                }
                if !state.cooldown_elapsed(now, self.periodic_cooldown) {
                    return NotifyDecision::Skip(NotifySkip::CooldownActive);
                }
                NotifyDecision::Send
            }
        }
    }
}
