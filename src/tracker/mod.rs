use std::sync::{Arc, Mutex};

use tracing::instrument;

use crate::backend::Backend;
use crate::config::Timings;
use crate::store::ProgressStore;

pub use session::*;
pub use task::*;

mod session;
mod task;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Polls a backend's elapsed time for the unlock and persists it for resuming.
///
/// The two run on separate timers so the storage write rate stays bounded no matter how
/// fast the unlock is polled.
pub struct Tracker {
    backend: Arc<Backend>,
    store: ProgressStore,
    session: Arc<Mutex<TrackingSession>>,
    on_unlock: Callback,
}

impl Tracker {
    pub fn new(
        backend: Arc<Backend>, store: ProgressStore, session: Arc<Mutex<TrackingSession>>,
        on_unlock: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            backend,
            store,
            session,
            on_unlock: Arc::new(on_unlock),
        }
    }

    /// One unlock poll. Returns whether this poll unlocked the gate.
    ///
    /// The latch is checked and set under one lock, the callback runs after it is released.
    pub fn poll(&self) -> bool {
        let Some(elapsed) = self.backend.current_time() else {
            return false;
        };

        let unlocked = {
            let mut session = self.session.lock().unwrap_or_else(|poison| poison.into_inner());
            session.observe(elapsed)
        };

        if unlocked {
            tracing::info!(identity = %self.backend.identity(), elapsed, "watch-time threshold reached");
            (self.on_unlock)();
        }

        unlocked
    }

    /// Persists the current position if playback has progressed. Returns what was written.
    ///
    /// The write happens under the session lock, so it never lands after the session stopped.
    #[instrument(skip(self), fields(identity = %self.backend.identity()), level = "trace")]
    pub fn save(&self) -> Option<f64> {
        let session = self.session.lock().unwrap_or_else(|poison| poison.into_inner());
        if !session.is_armed() {
            return None;
        }

        let elapsed = self.backend.current_time().filter(|elapsed| *elapsed > 0.0)?;

        self.store.set(self.backend.identity(), elapsed);
        Some(elapsed)
    }

    /// Starts the poll and save timers.
    pub fn spawn(self: Arc<Self>, timings: &Timings) -> [Task; 2] {
        let poll = {
            let tracker = self.clone();
            Task::repeat("unlock-poll", timings.poll_interval, move || {
                tracker.poll();
            })
        };

        let save = Task::repeat("progress-save", timings.save_interval, move || {
            self.save();
        });

        [poll, save]
    }
}
