use std::sync::Arc;

use snafu::Snafu;
use tokio::sync::mpsc::UnboundedSender;

use crate::model::BackendKind;

/// State changes a playback technology reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Started,
    Paused,
    Ended,
}

/// Whether a playback request happens inside a user gesture.
///
/// Runtimes only allow audible playback with an active gesture; automatic starts may be
/// refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Automatic,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum PlaybackError {
    /// The runtime refused to start playback without a user gesture
    #[snafu(display("playback was blocked by the autoplay policy (muted: {muted})"))]
    Blocked { muted: bool },

    /// The embed or media file could not be loaded
    #[snafu(display("could not load `{source_url}`: {message}"))]
    Load { source_url: String, message: String },
}

impl PlaybackError {
    pub fn is_blocked(&self) -> bool {
        matches!(self, PlaybackError::Blocked { .. })
    }
}

/// Where a player reports its [PlayerEvent]s.
#[derive(Debug, Clone)]
pub struct EventSink(UnboundedSender<PlayerEvent>);

impl EventSink {
    pub fn new(tx: UnboundedSender<PlayerEvent>) -> Self {
        Self(tx)
    }

    /// Reports `event`; events sent after the receiving side is gone are dropped.
    pub fn emit(&self, event: PlayerEvent) {
        if self.0.send(event).is_err() {
            tracing::trace!(?event, "dropped player event after teardown");
        }
    }
}

/// A concrete playback technology: a media element, a hosted player SDK or an embed frame.
///
/// Calls never block. Operations a technology can't perform are no-ops.
pub trait Player: Send + Sync {
    /// Loads `source` and starts reporting events to `events`.
    fn load(&self, source: &str, events: EventSink) -> Result<(), PlaybackError>;

    fn play(&self, activation: Activation) -> Result<(), PlaybackError>;

    fn pause(&self);

    fn seek(&self, seconds: f64);

    /// Media position in seconds, `None` when the technology can't tell yet.
    fn current_time(&self) -> Option<f64>;

    fn set_muted(&self, muted: bool);

    /// Volume in percent, `0..=100`.
    fn set_volume(&self, volume: u8);
}

/// Creates the player technology for a backend kind.
pub trait PlayerFactory: Send + Sync {
    fn create(&self, kind: BackendKind) -> Arc<dyn Player>;
}

impl<F> PlayerFactory for F
where
    F: Fn(BackendKind) -> Arc<dyn Player> + Send + Sync,
{
    fn create(&self, kind: BackendKind) -> Arc<dyn Player> {
        self(kind)
    }
}
