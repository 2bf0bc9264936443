/// Coordinates the two fetch triggers a chart has.
///
/// Periodic refreshes are best-effort and must never pile up: only one may be
/// outstanding at a time. Explicit resyncs (granularity switch, user-forced
/// reload) always proceed and bump a generation counter; completions carry
/// the generation they were started under, and anything stale is dropped, so
/// overlapping triggers cannot race each other's results.
#[derive(Debug, Clone, Default)]
pub struct RefreshTracker {
    refresh_in_flight: bool,
    generation: u64,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single periodic-refresh slot. Returns false while a prior
    /// refresh is still outstanding.
    pub fn try_begin_refresh(&mut self) -> bool {
        if self.refresh_in_flight {
            return false;
        }
        self.refresh_in_flight = true;
        true
    }

    pub fn finish_refresh(&mut self) {
        self.refresh_in_flight = false;
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.refresh_in_flight
    }

    /// Start a new resync generation. Always succeeds, regardless of any
    /// refresh in flight.
    pub fn begin_resync(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Whether a completion started under `generation` is still the latest.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_refresh_is_suppressed_until_first_finishes() {
        let mut t = RefreshTracker::new();
        assert!(t.try_begin_refresh());
        assert!(!t.try_begin_refresh());
        t.finish_refresh();
        assert!(t.try_begin_refresh());
    }

    #[test]
    fn resync_proceeds_while_refresh_is_in_flight() {
        let mut t = RefreshTracker::new();
        assert!(t.try_begin_refresh());
        let generation = t.begin_resync();
        assert!(t.is_current(generation));
        assert!(t.refresh_in_flight());
    }

    #[test]
    fn newer_resync_invalidates_older_generations() {
        let mut t = RefreshTracker::new();
        let first = t.begin_resync();
        let second = t.begin_resync();
        assert!(!t.is_current(first));
        assert!(t.is_current(second));
        assert!(t.is_current(t.current_generation()));
    }
}
