use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::model::Presentation;

/// Page-wide user interactions that count as a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    PointerDown,
    TouchStart,
    KeyDown,
    Scroll,
}

impl Interaction {
    pub const ALL: [Interaction; 4] = [
        Interaction::PointerDown,
        Interaction::TouchStart,
        Interaction::KeyDown,
        Interaction::Scroll,
    ];
}

type Listener = Arc<dyn Fn(Interaction) + Send + Sync>;

#[derive(Clone)]
struct Registration {
    id: u64,
    listener: Listener,
}

/// Registration table for page-wide interaction listeners, at most one listener per interaction.
///
/// Listeners are armed through [InteractionTable::arm_once] and live exactly as long as the
/// returned [InteractionGuard], or until they fire.
#[derive(Clone, Default)]
pub struct InteractionTable {
    slots: Arc<Mutex<HashMap<Interaction, Registration>>>,
    next_id: Arc<AtomicU64>,
}

impl InteractionTable {
    /// Arms `listener` on every interaction in `kinds`.
    ///
    /// The first matching interaction removes all of them before the listener runs, so it runs at most once.
    pub fn arm_once(
        &self, kinds: &[Interaction], listener: impl Fn(Interaction) + Send + Sync + 'static,
    ) -> InteractionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            id,
            listener: Arc::new(listener),
        };

        let mut slots = self.lock();
        for kind in kinds {
            if let Some(replaced) = slots.insert(*kind, registration.clone()) {
                tracing::debug!(?kind, replaced = replaced.id, "replaced interaction listener");
            }
        }

        tracing::debug!(id, ?kinds, "armed interaction listener");

        InteractionGuard {
            table: self.clone(),
            id,
        }
    }

    /// Delivers an interaction from the page. Returns whether a listener ran.
    pub fn dispatch(&self, kind: Interaction) -> bool {
        let listener = {
            let mut slots = self.lock();
            let Some(registration) = slots.remove(&kind) else {
                return false;
            };

            slots.retain(|_, other| other.id != registration.id);
            registration.listener
        };

        tracing::debug!(?kind, "interaction listener fired");
        listener(kind);
        true
    }

    /// Number of interactions that currently have a listener.
    pub fn armed(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|_, registration| registration.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Interaction, Registration>> {
        self.slots.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl std::fmt::Debug for InteractionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionTable")
            .field("armed", &self.armed())
            .finish()
    }
}

/// Unregisters its listeners when dropped, whether or not they ever fired.
#[derive(Debug)]
pub struct InteractionGuard {
    table: InteractionTable,
    id: u64,
}

impl Drop for InteractionGuard {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

/// How the session obtains the gesture it needs for audible playback.
///
/// The page-wide listener and the play button never coexist.
#[derive(Debug, Default)]
pub enum Gesture {
    /// Nothing pending: playback already runs, or nothing can play.
    #[default]
    Settled,
    /// Waiting for any interaction on the page.
    Document(InteractionGuard),
    /// Waiting for the visible play button.
    PlayButton,
}

impl Gesture {
    /// The gesture a presentation waits for once automatic playback is out of the question.
    pub fn required_by(
        presentation: Presentation, table: &InteractionTable,
        listener: impl Fn(Interaction) + Send + Sync + 'static,
    ) -> Self {
        match presentation {
            Presentation::ClickToPlay => Gesture::PlayButton,
            Presentation::Ambient => {
                Gesture::Document(table.arm_once(&Interaction::ALL, listener))
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, Gesture::Settled)
    }

    pub fn shows_play_button(&self) -> bool {
        matches!(self, Gesture::PlayButton)
    }
}
