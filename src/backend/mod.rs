use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tracing::instrument;

use crate::model::{BackendKind, PlaybackIdentity, Presentation};

pub use headless::*;
pub use player::*;

mod headless;
mod player;

type Callback = Box<dyn Fn() + Send + Sync>;

/// Uniform playback surface over every supported video technology.
///
/// The variant set is closed: every [BackendKind] maps onto one adapter variant here and
/// nowhere else branches on the kind. Regardless of variant the backend never shows a finished state: the end
/// of the media seeks back to zero and plays again.
pub struct Backend {
    identity: PlaybackIdentity,
    presentation: Presentation,
    variant: Variant,
    subscriptions: Subscriptions,
}

enum Variant {
    /// Files and hosted streams: real media position, seekable before starting.
    Positional(Positional),
    /// Cloud drive preview frame.
    Drive(DriveEmbed),
}

impl Backend {
    /// Loads `identity` into `player` and wraps it in the matching variant.
    ///
    /// Fails when the technology can't load the video; the session then has nothing to play.
    #[instrument(skip(player, events))]
    pub fn select(
        identity: PlaybackIdentity, presentation: Presentation, player: Arc<dyn Player>,
        events: EventSink,
    ) -> Result<Self, PlaybackError> {
        player.load(&identity.embed_url(), events.clone())?;

        let variant = if identity.kind().reports_position() {
            Variant::Positional(Positional { player })
        } else {
            Variant::Drive(DriveEmbed::new(player, events))
        };

        tracing::debug!(?presentation, "selected playback backend");

        Ok(Self {
            identity,
            presentation,
            variant,
            subscriptions: Subscriptions::default(),
        })
    }

    pub fn identity(&self) -> &PlaybackIdentity {
        &self.identity
    }

    pub fn kind(&self) -> BackendKind {
        self.identity.kind()
    }

    fn adapter(&self) -> &dyn Adapter {
        match &self.variant {
            Variant::Positional(inner) => inner as &dyn Adapter,
            Variant::Drive(inner) => inner as &dyn Adapter,
        }
    }

    /// Begins playback from `resume_from` seconds where the variant can seek before starting.
    pub fn start(&self, resume_from: f64, activation: Activation) -> Result<(), PlaybackError> {
        tracing::debug!(identity = %self.identity, resume_from, ?activation, "starting playback");
        self.adapter().start(resume_from, activation)
    }

    /// Elapsed play time in seconds; synthetic wall-clock time for variants without a position.
    pub fn current_time(&self) -> Option<f64> {
        self.adapter().current_time()
    }

    pub fn set_muted(&self, muted: bool) {
        self.adapter().set_muted(muted)
    }

    pub fn set_volume(&self, volume: u8) {
        self.adapter().set_volume(volume.min(100))
    }

    pub fn pause(&self) {
        self.adapter().pause()
    }

    /// Replaces the started subscription.
    pub fn on_playback_started(&self, callback: impl Fn() + Send + Sync + 'static) {
        Subscriptions::replace(&self.subscriptions.started, callback);
    }

    /// Replaces the paused subscription.
    pub fn on_playback_paused(&self, callback: impl Fn() + Send + Sync + 'static) {
        Subscriptions::replace(&self.subscriptions.paused, callback);
    }

    /// Replaces the ended subscription.
    pub fn on_playback_ended(&self, callback: impl Fn() + Send + Sync + 'static) {
        Subscriptions::replace(&self.subscriptions.ended, callback);
    }

    /// Applies the looping and pause policies to a reported event, then notifies its subscriber.
    pub fn dispatch(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::Started => {
                Subscriptions::invoke(&self.subscriptions.started);
            }

            PlayerEvent::Ended => {
                tracing::debug!(identity = %self.identity, "end of media, looping");
                self.adapter().rewind();
                if let Err(error) = self.adapter().resume() {
                    tracing::warn!(identity = %self.identity, %error, "could not restart looped video");
                }
                Subscriptions::invoke(&self.subscriptions.ended);
            }

            PlayerEvent::Paused if self.presentation.resumes_on_pause() => {
                tracing::debug!(identity = %self.identity, "ambient video paused, resuming");
                if let Err(error) = self.adapter().resume() {
                    tracing::warn!(identity = %self.identity, %error, "could not resume ambient video");
                }
                Subscriptions::invoke(&self.subscriptions.paused);
            }

            PlayerEvent::Paused => {
                Subscriptions::invoke(&self.subscriptions.paused);
            }
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("identity", &self.identity)
            .field("presentation", &self.presentation)
            .finish_non_exhaustive()
    }
}

/// Capability surface every variant implements.
trait Adapter {
    fn start(&self, resume_from: f64, activation: Activation) -> Result<(), PlaybackError>;

    /// Plays again after a pause or rewind. Only reached after the session started once, so the
    /// runtime treats it as a continuation of the original gesture.
    fn resume(&self) -> Result<(), PlaybackError>;

    fn rewind(&self);

    fn pause(&self);

    fn current_time(&self) -> Option<f64>;

    fn set_muted(&self, muted: bool);

    fn set_volume(&self, volume: u8);
}

/// A technology that reports its real media position and can seek before starting.
struct Positional {
    player: Arc<dyn Player>,
}

impl Adapter for Positional {
    fn start(&self, resume_from: f64, activation: Activation) -> Result<(), PlaybackError> {
        if resume_from > 0.0 {
            self.player.seek(resume_from);
        }

        self.player.play(activation)
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        self.player.play(Activation::User)
    }

    fn rewind(&self) {
        self.player.seek(0.0);
    }

    fn pause(&self) {
        self.player.pause();
    }

    fn current_time(&self) -> Option<f64> {
        self.player.current_time()
    }

    fn set_muted(&self, muted: bool) {
        self.player.set_muted(muted);
    }

    fn set_volume(&self, volume: u8) {
        self.player.set_volume(volume);
    }
}

/// A preview frame with no progress channel, no seeking and no audio controls.
///
/// Elapsed time is the wall-clock time since playback was started, an approximation that
/// keeps counting through pauses the frame never reports. The frame never reports a start
/// either, so one is reported on its behalf.
struct DriveEmbed {
    player: Arc<dyn Player>,
    events: EventSink,
    started_at: Mutex<Option<Instant>>,
}

impl DriveEmbed {
    fn new(player: Arc<dyn Player>, events: EventSink) -> Self {
        Self {
            player,
            events,
            started_at: Mutex::new(None),
        }
    }

    fn started_at(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.started_at
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Adapter for DriveEmbed {
    fn start(&self, resume_from: f64, activation: Activation) -> Result<(), PlaybackError> {
        if resume_from > 0.0 {
            tracing::debug!(resume_from, "drive embeds can't seek, starting from the beginning");
        }

        self.player.play(activation)?;

        let mut started_at = self.started_at();
        if started_at.is_none() {
            *started_at = Some(Instant::now());
            self.events.emit(PlayerEvent::Started);
        }

        Ok(())
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        self.player.play(Activation::User)
    }

    fn rewind(&self) {
        let mut started_at = self.started_at();
        if started_at.is_some() {
            *started_at = Some(Instant::now());
        }
    }

    fn pause(&self) {
        self.player.pause();
    }

    fn current_time(&self) -> Option<f64> {
        self.started_at()
            .map(|started_at| started_at.elapsed().as_secs_f64())
    }

    fn set_muted(&self, _muted: bool) {}

    fn set_volume(&self, _volume: u8) {}
}

/// One subscriber slot per event; registering again replaces the previous subscriber.
#[derive(Default)]
struct Subscriptions {
    started: Mutex<Option<Callback>>,
    paused: Mutex<Option<Callback>>,
    ended: Mutex<Option<Callback>>,
}

impl Subscriptions {
    fn replace(slot: &Mutex<Option<Callback>>, callback: impl Fn() + Send + Sync + 'static) {
        let mut slot = slot.lock().unwrap_or_else(|poison| poison.into_inner());
        *slot = Some(Box::new(callback));
    }

    fn invoke(slot: &Mutex<Option<Callback>>) {
        let slot = slot.lock().unwrap_or_else(|poison| poison.into_inner());
        if let Some(callback) = slot.as_ref() {
            callback();
        }
    }
}
