use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::select;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::instrument;

use crate::api::{self, ConfigSource};
use crate::backend::{Activation, Backend, EventSink, PlayerEvent, PlayerFactory};
use crate::config::Timings;
use crate::model::{PlaybackIdentity, Presentation, VideoConfig};
use crate::policy::{Gesture, Interaction, InteractionTable};
use crate::store::ProgressStore;
use crate::tracker::{Task, Tracker, TrackingSession};

pub use phase::Phase;

use hooks::Hooks;
use phase::Signal;

mod hooks;
mod phase;

/// Prepares a [Controller] mount.
#[derive(Debug, Default)]
pub struct Mount {
    store: Option<ProgressStore>,
    timings: Timings,
    hooks: Hooks,
}

impl Mount {
    pub fn store(mut self, store: ProgressStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn on_threshold_reached(
        mut self, hook: impl Fn(&PlaybackIdentity) + Send + Sync + 'static,
    ) -> Self {
        self.hooks = self.hooks.on_threshold_reached(hook);
        self
    }

    pub fn on_playback_started(
        mut self, hook: impl Fn(&PlaybackIdentity) + Send + Sync + 'static,
    ) -> Self {
        self.hooks = self.hooks.on_playback_started(hook);
        self
    }

    /// Loads the configuration, selects the backend and starts or arms playback.
    ///
    /// Never fails: an unusable configuration ends up as a session in [Phase::Unavailable].
    #[instrument(skip_all)]
    pub async fn mount(self, source: &impl ConfigSource, players: &dyn PlayerFactory) -> Controller {
        let mut phase = Phase::default();
        advance(&mut phase, Signal::Mount);

        let config = api::load_config(source).await;
        advance(&mut phase, Signal::ConfigLoaded);

        let (tx, events) = unbounded_channel();
        let backend = select_backend(&config, players, EventSink::new(tx));
        let store = self.store.unwrap_or_else(ProgressStore::memory);
        let resume_from = backend
            .as_ref()
            .map(|backend| store.get(backend.identity()))
            .unwrap_or(0.0);

        let inner = Arc::new(Inner {
            session: Arc::new(Mutex::new(TrackingSession::new(config.threshold()))),
            config,
            backend,
            resume_from,
            store,
            timings: self.timings,
            hooks: self.hooks,
            interactions: InteractionTable::default(),
            phase: Mutex::new(phase),
            gesture: Mutex::new(Gesture::Settled),
            tasks: Mutex::new(Vec::new()),
            hud_visible: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        });

        match &inner.backend {
            Some(backend) => {
                inner.wire(backend, events);
                inner.begin(backend);
            }
            None => inner.signal(Signal::Failed),
        }

        Controller { inner }
    }
}

fn advance(phase: &mut Phase, signal: Signal) {
    if let Some(next) = phase.on(signal) {
        tracing::debug!(from = ?phase, to = ?next, ?signal, "controller phase changed");
        *phase = next;
    }
}

fn select_backend(
    config: &VideoConfig, players: &dyn PlayerFactory, events: EventSink,
) -> Option<Arc<Backend>> {
    let identity = match config.identity() {
        Ok(identity) => identity,
        Err(error) => {
            tracing::warn!(url = %config.url, kind = %config.kind, %error, "configured video is not playable");
            return None;
        }
    };

    let player = players.create(config.kind);

    match Backend::select(identity, config.presentation, player, events) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(error) => {
            tracing::warn!(url = %config.url, kind = %config.kind, %error, "could not load the configured video");
            None
        }
    }
}

/// A mounted video session gating the call-to-action behind watch time.
///
/// Owns every timer and listener it creates; [Controller::teardown], or dropping the
/// controller, releases all of them.
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn builder() -> Mount {
        Mount::default()
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase()
    }

    pub fn config(&self) -> &VideoConfig {
        &self.inner.config
    }

    /// The identity of the video in play, `None` when nothing can play.
    pub fn identity(&self) -> Option<&PlaybackIdentity> {
        self.inner.backend.as_ref().map(|backend| backend.identity())
    }

    pub fn resume_from(&self) -> f64 {
        self.inner.resume_from
    }

    pub fn is_unlocked(&self) -> bool {
        self.inner.session().is_unlocked()
    }

    pub fn is_tracking(&self) -> bool {
        self.inner.session().is_armed()
    }

    /// Whether the page should render the explicit play button.
    pub fn shows_play_button(&self) -> bool {
        self.inner.gesture().shows_play_button()
    }

    /// Whether a page-wide interaction would currently start playback.
    pub fn awaits_interaction(&self) -> bool {
        self.inner.interactions.armed() > 0
    }

    pub fn hud_visible(&self) -> bool {
        self.inner.hud_visible.load(Ordering::SeqCst)
    }

    /// The play button was clicked. Returns `false` when no button is shown.
    pub fn click_play(&self) -> bool {
        {
            let mut gesture = self.inner.gesture();
            if !gesture.shows_play_button() {
                return false;
            }
            *gesture = Gesture::Settled;
        }

        self.inner.start_with_gesture();
        true
    }

    /// An interaction happened somewhere on the page. Returns whether it started playback.
    pub fn interact(&self, kind: Interaction) -> bool {
        self.inner.interactions.dispatch(kind)
    }

    pub fn set_muted(&self, muted: bool) {
        if let Some(backend) = &self.inner.backend {
            backend.set_muted(muted);
        }
    }

    pub fn set_volume(&self, volume: u8) {
        if let Some(backend) = &self.inner.backend {
            backend.set_volume(volume);
        }
    }

    /// Stops all timers and listeners after a final progress write. Idempotent.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.inner.config)
            .field("phase", &self.phase())
            .field("unlocked", &self.is_unlocked())
            .finish_non_exhaustive()
    }
}

struct Inner {
    config: VideoConfig,
    backend: Option<Arc<Backend>>,
    resume_from: f64,
    store: ProgressStore,
    timings: Timings,
    hooks: Hooks,
    interactions: InteractionTable,
    session: Arc<Mutex<TrackingSession>>,
    phase: Mutex<Phase>,
    gesture: Mutex<Gesture>,
    tasks: Mutex<Vec<Task>>,
    hud_visible: AtomicBool,
    torn_down: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

impl Inner {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        lock(&self.phase)
    }

    fn session(&self) -> MutexGuard<'_, TrackingSession> {
        lock(&self.session)
    }

    fn gesture(&self) -> MutexGuard<'_, Gesture> {
        lock(&self.gesture)
    }

    fn signal(&self, signal: Signal) {
        advance(&mut self.phase(), signal);
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Keeps `task` until teardown. The torn-down check and the push share the tasks lock, so
    /// a task registered while tearing down is stopped rather than leaked.
    fn push_task(&self, task: Task) {
        let mut tasks = lock(&self.tasks);

        if self.is_torn_down() {
            drop(tasks);
            task.stop();
            return;
        }

        tasks.push(task);
    }

    /// Subscribes to the backend and starts delivering player events to it.
    fn wire(self: &Arc<Self>, backend: &Arc<Backend>, mut events: UnboundedReceiver<PlayerEvent>) {
        let weak = Arc::downgrade(self);
        backend.on_playback_started(with_inner(&weak, Inner::playback_started));
        backend.on_playback_paused(with_inner(&weak, Inner::playback_paused));
        backend.on_playback_ended(with_inner(&weak, Inner::playback_ended));

        let backend = backend.clone();
        let pump = Task::spawn("player-events", move |mut stop| async move {
            loop {
                select! {
                    biased;

                    _ = &mut stop => break,

                    event = events.recv() => match event {
                        Some(event) => backend.dispatch(event),
                        None => break,
                    },
                }
            }
        });

        self.push_task(pump);
    }

    /// Starts muted autoplay or waits for the gesture the presentation calls for.
    fn begin(self: &Arc<Self>, backend: &Backend) {
        let presentation = self.config.presentation;

        if presentation == Presentation::Ambient {
            backend.set_muted(true);

            match backend.start(self.resume_from, Activation::Automatic) {
                Ok(()) => {
                    self.signal(Signal::Started);
                    return;
                }
                Err(error) if error.is_blocked() => {
                    tracing::info!(%error, "autoplay blocked, waiting for the first interaction");
                }
                Err(error) => {
                    tracing::warn!(%error, "could not start ambient playback");
                    self.signal(Signal::Failed);
                    return;
                }
            }
        }

        let weak = Arc::downgrade(self);
        let gesture = Gesture::required_by(presentation, &self.interactions, move |kind| {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!(?kind, "interaction received");
                *inner.gesture() = Gesture::Settled;
                inner.start_with_gesture();
            }
        });

        *self.gesture() = gesture;
        self.signal(Signal::GestureRequired);
    }

    fn start_with_gesture(&self) {
        let Some(backend) = &self.backend else {
            return;
        };

        backend.set_muted(false);

        match backend.start(self.resume_from, Activation::User) {
            Ok(()) => self.signal(Signal::Started),
            Err(error) => tracing::warn!(identity = %backend.identity(), %error, "could not start playback"),
        }
    }

    fn playback_started(self: Arc<Self>) {
        let Some(backend) = &self.backend else {
            return;
        };

        if self.is_torn_down() {
            return;
        }

        self.signal(Signal::Started);

        if !self.session().arm() {
            return;
        }

        tracing::info!(identity = %backend.identity(), threshold = self.config.threshold_seconds, "playback started, tracking watch time");

        let weak = Arc::downgrade(&self);
        let tracker = Tracker::new(
            backend.clone(),
            self.store.clone(),
            self.session.clone(),
            with_inner(&weak, Inner::threshold_reached),
        );

        for task in Arc::new(tracker).spawn(&self.timings) {
            self.push_task(task);
        }

        self.hud_visible.store(true, Ordering::SeqCst);
        let hud = Task::delay("hud-fade", self.timings.hud_fade, with_inner(&weak, |inner| {
            inner.hud_visible.store(false, Ordering::SeqCst);
        }));
        self.push_task(hud);

        self.hooks.playback_started(backend.identity());
    }

    fn playback_paused(self: Arc<Self>) {
        self.signal(Signal::Paused);
    }

    fn playback_ended(self: Arc<Self>) {
        if let Some(backend) = &self.backend {
            tracing::debug!(identity = %backend.identity(), "video looped, clearing saved progress");
            self.store.clear(backend.identity());
        }
    }

    fn threshold_reached(self: Arc<Self>) {
        if self.is_torn_down() {
            return;
        }

        self.signal(Signal::ThresholdReached);

        if let Some(backend) = &self.backend {
            self.hooks.threshold_reached(backend.identity());
        }
    }

    fn teardown(&self) {
        let tasks = {
            let mut tasks = lock(&self.tasks);
            if self.torn_down.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *tasks)
        };

        for task in tasks {
            tracing::trace!(task = task.name(), "stopping task");
            task.stop();
        }

        *self.gesture() = Gesture::Settled;
        self.hud_visible.store(false, Ordering::SeqCst);

        if let Some(backend) = &self.backend {
            let mut session = self.session();
            if session.is_armed() {
                if let Some(elapsed) = backend.current_time().filter(|elapsed| *elapsed > 0.0) {
                    self.store.set(backend.identity(), elapsed);
                }
            }
            session.stop();
            drop(session);

            backend.pause();
        } else {
            self.session().stop();
        }

        self.signal(Signal::Teardown);
        tracing::debug!("controller torn down");
    }
}

/// Adapts a method on [Inner] into a callback that doesn't keep the controller alive.
fn with_inner(
    weak: &Weak<Inner>, f: impl Fn(Arc<Inner>) + Send + Sync + 'static,
) -> impl Fn() + Send + Sync + 'static {
    let weak = weak.clone();
    move || {
        if let Some(inner) = weak.upgrade() {
            f(inner);
        }
    }
}
