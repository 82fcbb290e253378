use std::sync::Mutex;

use tokio::time::Instant;

use super::{Activation, EventSink, LoadSnafu, PlaybackError, Player, PlayerEvent};

/// What the simulated runtime allows without a user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Autoplay {
    /// Any automatic start succeeds.
    Allowed,
    /// Automatic starts succeed only while muted.
    #[default]
    MutedOnly,
    /// Every automatic start is refused.
    Blocked,
}

/// A player without any output whose position advances with the tokio clock while playing.
///
/// It backs the command line binary and doubles as a scriptable player under a paused clock:
/// [HeadlessPlayer::interrupt] and [HeadlessPlayer::finish] simulate the pauses and
/// end-of-media a real technology would report.
#[derive(Debug, Default)]
pub struct HeadlessPlayer {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    autoplay: Autoplay,
    unloadable: bool,
    source: Option<String>,
    events: Option<EventSink>,
    playing_since: Option<Instant>,
    offset: f64,
    muted: bool,
    volume: u8,
    plays: usize,
    seeks: Vec<f64>,
}

impl State {
    fn position(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.offset + since.elapsed().as_secs_f64(),
            None => self.offset,
        }
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

impl HeadlessPlayer {
    pub fn new(autoplay: Autoplay) -> Self {
        let state = State {
            autoplay,
            volume: 100,
            ..State::default()
        };

        Self {
            state: Mutex::new(state),
        }
    }

    /// A player whose every load fails, like an embed for a deleted video.
    pub fn unloadable() -> Self {
        let player = Self::new(Autoplay::Allowed);
        player.lock().unloadable = true;
        player
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Pauses as if the runtime or the user did it, reporting [PlayerEvent::Paused].
    pub fn interrupt(&self) {
        self.pause();
    }

    /// Reaches the end of the media: playback stops and [PlayerEvent::Ended] is reported.
    pub fn finish(&self) {
        let mut state = self.lock();
        state.offset = state.position();
        state.playing_since = None;
        state.emit(PlayerEvent::Ended);
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing_since.is_some()
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn volume(&self) -> u8 {
        self.lock().volume
    }

    pub fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }

    /// Number of successful starts.
    pub fn plays(&self) -> usize {
        self.lock().plays
    }

    /// Every position sought so far, oldest first.
    pub fn seeks(&self) -> Vec<f64> {
        self.lock().seeks.clone()
    }
}

impl Player for HeadlessPlayer {
    fn load(&self, source: &str, events: EventSink) -> Result<(), PlaybackError> {
        let mut state = self.lock();

        if state.unloadable {
            return LoadSnafu {
                source_url: source,
                message: "media is unavailable",
            }
            .fail();
        }

        state.source = Some(source.to_string());
        state.events = Some(events);
        Ok(())
    }

    fn play(&self, activation: Activation) -> Result<(), PlaybackError> {
        let mut state = self.lock();

        let allowed = match (activation, state.autoplay) {
            (Activation::User, _) | (_, Autoplay::Allowed) => true,
            (Activation::Automatic, Autoplay::MutedOnly) => state.muted,
            (Activation::Automatic, Autoplay::Blocked) => false,
        };

        if !allowed {
            return Err(PlaybackError::Blocked { muted: state.muted });
        }

        if state.playing_since.is_none() {
            state.playing_since = Some(Instant::now());
            state.plays += 1;
            state.emit(PlayerEvent::Started);
        }

        Ok(())
    }

    fn pause(&self) {
        let mut state = self.lock();

        if state.playing_since.is_some() {
            state.offset = state.position();
            state.playing_since = None;
            state.emit(PlayerEvent::Paused);
        }
    }

    fn seek(&self, seconds: f64) {
        let mut state = self.lock();

        let offset = seconds.max(0.0);
        state.offset = offset;
        state.seeks.push(offset);
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
    }

    fn current_time(&self) -> Option<f64> {
        let state = self.lock();
        state.source.as_ref().map(|_| state.position())
    }

    fn set_muted(&self, muted: bool) {
        self.lock().muted = muted;
    }

    fn set_volume(&self, volume: u8) {
        self.lock().volume = volume.min(100);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn loaded(autoplay: Autoplay) -> (HeadlessPlayer, tokio::sync::mpsc::UnboundedReceiver<PlayerEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let player = HeadlessPlayer::new(autoplay);
        player.load("/intro.mp4", EventSink::new(tx)).unwrap();
        (player, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn position_follows_the_clock() {
        let (player, mut events) = loaded(Autoplay::Allowed);

        player.seek(10.0);
        player.play(Activation::Automatic).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(player.current_time(), Some(12.0));
        assert_eq!(events.recv().await, Some(PlayerEvent::Started));

        player.interrupt();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(player.current_time(), Some(12.0), "paused players stand still");
        assert_eq!(events.recv().await, Some(PlayerEvent::Paused));
    }

    #[tokio::test]
    async fn muted_only_policy() {
        let (player, _events) = loaded(Autoplay::MutedOnly);

        assert_eq!(
            player.play(Activation::Automatic),
            Err(PlaybackError::Blocked { muted: false })
        );

        player.set_muted(true);
        assert_eq!(player.play(Activation::Automatic), Ok(()));
    }

    #[tokio::test]
    async fn blocked_policy_still_allows_gestures() {
        let (player, _events) = loaded(Autoplay::Blocked);
        player.set_muted(true);

        assert!(player.play(Activation::Automatic).unwrap_err().is_blocked());
        assert_eq!(player.play(Activation::User), Ok(()));
        assert_eq!(player.plays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn seeks_are_recorded_and_clamped() {
        let (player, _events) = loaded(Autoplay::Allowed);

        player.seek(-3.0);
        player.seek(7.5);

        assert_eq!(player.seeks(), vec![0.0, 7.5]);
        assert_eq!(player.current_time(), Some(7.5));
    }

    #[test]
    fn no_position_before_load() {
        let player = HeadlessPlayer::new(Autoplay::Allowed);
        assert_eq!(player.current_time(), None);
    }
}
