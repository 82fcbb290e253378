/// Lifecycle of a mounted session.
///
/// `Unlocked` is terminal for the gate but not for the video: looping and progress saving
/// carry on after it. `Unavailable` is the terminal failure state when nothing can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    ConfigLoading,
    BackendSelecting,
    AwaitingInteraction,
    Playing,
    Paused,
    Unlocked,
    Unavailable,
    TornDown,
}

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Mount,
    ConfigLoaded,
    GestureRequired,
    Started,
    Paused,
    ThresholdReached,
    Failed,
    Teardown,
}

impl Phase {
    /// The phase `signal` leads to, `None` when the signal doesn't apply in this phase.
    pub(crate) fn on(self, signal: Signal) -> Option<Phase> {
        use Phase::*;

        let next = match (self, signal) {
            (TornDown, _) => return None,
            (_, Signal::Teardown) => TornDown,

            (Uninitialized, Signal::Mount) => ConfigLoading,
            (ConfigLoading, Signal::ConfigLoaded) => BackendSelecting,
            (BackendSelecting, Signal::GestureRequired) => AwaitingInteraction,
            (BackendSelecting, Signal::Failed) => Unavailable,

            (BackendSelecting | AwaitingInteraction | Paused, Signal::Started) => Playing,
            (Playing, Signal::Paused) => Paused,
            (Playing | Paused, Signal::ThresholdReached) => Unlocked,

            _ => return None,
        };

        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(signals: &[Signal]) -> Phase {
        signals
            .iter()
            .fold(Phase::default(), |phase, signal| phase.on(*signal).unwrap_or(phase))
    }

    #[test]
    fn click_to_play_lifecycle() {
        let phase = run(&[
            Signal::Mount,
            Signal::ConfigLoaded,
            Signal::GestureRequired,
            Signal::Started,
            Signal::Paused,
            Signal::Started,
            Signal::ThresholdReached,
        ]);

        assert_eq!(phase, Phase::Unlocked);
    }

    #[test]
    fn unlocked_survives_loops_and_pauses() {
        let unlocked = Phase::Unlocked;

        assert_eq!(unlocked.on(Signal::Started), None);
        assert_eq!(unlocked.on(Signal::Paused), None);
        assert_eq!(unlocked.on(Signal::ThresholdReached), None);
    }

    #[test]
    fn failed_selection_is_terminal() {
        let phase = run(&[Signal::Mount, Signal::ConfigLoaded, Signal::Failed, Signal::Started]);

        assert_eq!(phase, Phase::Unavailable);
    }

    #[test]
    fn no_unlock_before_playback() {
        assert_eq!(Phase::AwaitingInteraction.on(Signal::ThresholdReached), None);
    }

    #[test]
    fn teardown_wins_from_anywhere() {
        for phase in [Phase::Playing, Phase::Unavailable, Phase::AwaitingInteraction] {
            assert_eq!(phase.on(Signal::Teardown), Some(Phase::TornDown));
        }

        assert_eq!(Phase::TornDown.on(Signal::Started), None);
    }
}
