/// Whether watch-time tracking runs for this session. `Stopped` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Tracking {
    #[default]
    Idle,
    Armed,
    Stopped,
}

/// The call-to-action gate. Only ever moves from locked to unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gate {
    #[default]
    Locked,
    Unlocked { at: f64 },
}

/// Per-mount watch-time state: two one-way latches plus the last observed elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSession {
    threshold: f64,
    tracking: Tracking,
    gate: Gate,
    last_observed: Option<f64>,
}

impl TrackingSession {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            tracking: Tracking::default(),
            gate: Gate::default(),
            last_observed: None,
        }
    }

    /// `Idle -> Armed`. Returns `false` when tracking was already armed or has stopped.
    pub fn arm(&mut self) -> bool {
        match self.tracking {
            Tracking::Idle => {
                self.tracking = Tracking::Armed;
                true
            }
            Tracking::Armed | Tracking::Stopped => false,
        }
    }

    /// Ends tracking for good: no reading is observed and no progress saved afterwards.
    pub fn stop(&mut self) {
        self.tracking = Tracking::Stopped;
    }

    /// Records an elapsed-time reading.
    ///
    /// Returns `true` exactly once per session: on the first armed reading at or above the
    /// threshold. Later readings, whether above or below, never unlock again.
    pub fn observe(&mut self, elapsed: f64) -> bool {
        if self.tracking != Tracking::Armed || !elapsed.is_finite() {
            return false;
        }

        self.last_observed = Some(elapsed);

        match self.gate {
            Gate::Locked if elapsed >= self.threshold => {
                self.gate = Gate::Unlocked { at: elapsed };
                true
            }
            _ => false,
        }
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn is_armed(&self) -> bool {
        self.tracking == Tracking::Armed
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.gate, Gate::Unlocked { .. })
    }

    pub fn last_observed(&self) -> Option<f64> {
        self.last_observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arms_once() {
        let mut session = TrackingSession::new(5.0);

        assert!(session.arm());
        assert!(!session.arm(), "second start must not re-arm");
        assert!(session.is_armed());
    }

    #[test]
    fn idle_session_never_unlocks() {
        let mut session = TrackingSession::new(5.0);

        assert!(!session.observe(100.0));
        assert_eq!(session.gate(), Gate::Locked);
        assert_eq!(session.last_observed(), None);
    }

    #[test]
    fn unlocks_on_first_reading_at_threshold() {
        let mut session = TrackingSession::new(5.0);
        session.arm();

        let unlocked: Vec<bool> = [0.0, 1.2, 4.99, 5.0, 5.3]
            .into_iter()
            .map(|elapsed| session.observe(elapsed))
            .collect();

        assert_eq!(unlocked, vec![false, false, false, true, false]);
        assert_eq!(session.gate(), Gate::Unlocked { at: 5.0 });
    }

    #[test]
    fn oscillating_readings_unlock_once() {
        let mut session = TrackingSession::new(10.0);
        session.arm();

        let readings = [9.0, 11.0, 0.0, 3.0, 12.0, 2.0, 15.0];
        let unlocks = readings
            .into_iter()
            .filter(|elapsed| session.observe(*elapsed))
            .count();

        assert_eq!(unlocks, 1);
        assert!(session.is_unlocked());
        assert_eq!(session.last_observed(), Some(15.0));
    }

    #[test]
    fn ignores_nonsense_readings() {
        let mut session = TrackingSession::new(1.0);
        session.arm();

        assert!(!session.observe(f64::NAN));
        assert!(!session.observe(f64::INFINITY));
        assert!(!session.is_unlocked());
    }

    #[test]
    fn stopped_session_ignores_everything() {
        let mut session = TrackingSession::new(5.0);
        session.arm();
        session.observe(2.0);
        session.stop();

        assert!(!session.observe(10.0));
        assert!(!session.arm(), "a stopped session can't be re-armed");
        assert!(!session.is_armed());
        assert!(!session.is_unlocked());
        assert_eq!(session.last_observed(), Some(2.0));
    }

    #[test]
    fn zero_threshold_unlocks_on_first_reading() {
        let mut session = TrackingSession::new(0.0);
        session.arm();

        assert!(session.observe(0.0));
    }
}
