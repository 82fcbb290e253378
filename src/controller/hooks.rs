use std::sync::Arc;

use crate::model::PlaybackIdentity;

type Hook = Arc<dyn Fn(&PlaybackIdentity) + Send + Sync>;

/// Outward events a mounted session reports to the surrounding page.
#[derive(Clone, Default)]
pub struct Hooks {
    threshold_reached: Option<Hook>,
    playback_started: Option<Hook>,
}

impl Hooks {
    pub fn on_threshold_reached(
        mut self, hook: impl Fn(&PlaybackIdentity) + Send + Sync + 'static,
    ) -> Self {
        self.threshold_reached = Some(Arc::new(hook));
        self
    }

    pub fn on_playback_started(
        mut self, hook: impl Fn(&PlaybackIdentity) + Send + Sync + 'static,
    ) -> Self {
        self.playback_started = Some(Arc::new(hook));
        self
    }

    pub(crate) fn threshold_reached(&self, identity: &PlaybackIdentity) {
        if let Some(hook) = &self.threshold_reached {
            hook(identity);
        }
    }

    pub(crate) fn playback_started(&self, identity: &PlaybackIdentity) {
        if let Some(hook) = &self.playback_started {
            hook(identity);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("threshold_reached", &self.threshold_reached.is_some())
            .field("playback_started", &self.playback_started.is_some())
            .finish()
    }
}
