use std::time::{Duration, Instant};

/// Carry-over between polling cycles: when the last alert fired and what the
/// previous cycle's aggregate availability was. Owned by the watcher and
/// mutated only between cycles.
#[derive(Debug, Default)]
pub struct WatchState {
    last_notified_at: Option<Instant>,
    last_any_available: Option<bool>,
}

impl WatchState {
    /// True when this cycle's aggregate differs from the previous cycle's,
    /// or when no cycle has completed yet.
    pub fn state_changed(&self, any_available: bool) -> bool {
        self.last_any_available != Some(any_available)
    }

    /// True once `cooldown` has fully elapsed since the last firing, with
    /// the boundary itself counting as elapsed. Never having fired counts
    /// as elapsed too.
    pub fn cooldown_elapsed(&self, now: Instant, cooldown: Duration) -> bool {
        match self.last_notified_at {
            None => true,
            Some(last) => now.duration_since(last) >= cooldown,
        }
    }

    pub fn record_notified(&mut self, now: Instant) {
        self.last_notified_at = Some(now);
    }

    /// Every completed cycle passes through here exactly once, after the
    /// notification decision for that cycle has been made.
    pub fn record_cycle(&mut self, any_available: bool) {
        self.last_any_available = Some(any_available);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cycle_always_counts_as_changed() {
        let state = WatchState::default();
        assert!(state.state_changed(true));
        assert!(state.state_changed(false));
    }

    #[test]
    fn test_state_changed_tracks_the_recorded_cycle() {
        let mut state = WatchState::default();
        state.record_cycle(false);
        assert_eq!(state.last_any_available, Some(false));
        assert!(!state.state_changed(false));
        assert!(state.state_changed(true));

        state.record_cycle(true);
        assert!(!state.state_changed(true));
        assert!(state.state_changed(false));
    }

    #[test]
    fn test_cooldown_elapsed_before_any_firing() {
        let state = WatchState::default();
        assert!(state.cooldown_elapsed(Instant::now(), Duration::from_secs(3600)));
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let mut state = WatchState::default();
        let base = Instant::now();
        state.record_notified(base);

        let cooldown = Duration::from_secs(30);
        assert!(!state.cooldown_elapsed(base + Duration::from_secs(29), cooldown));
        assert!(state.cooldown_elapsed(base + Duration::from_secs(30), cooldown));
        assert!(state.cooldown_elapsed(base + Duration::from_secs(31), cooldown));
    }
}
