use std::sync::Arc;

use dotenvy::dotenv;
use snafu::ResultExt;

use reel_gate::api::{EngagementEvent, HttpApi};
use reel_gate::backend::{Autoplay, HeadlessPlayer, Player};
use reel_gate::config::Config;
use reel_gate::controller::Controller;
use reel_gate::error::{ApiClientSnafu, ApplicationError, ShutdownSignalSnafu};
use reel_gate::logger;
use reel_gate::model::{BackendKind, PlaybackIdentity};
use reel_gate::policy::Interaction;
use reel_gate::store::{FileStorage, ProgressStore};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let api = Arc::new(HttpApi::from_config(&config).context(ApiClientSnafu)?);
    let store = ProgressStore::new(FileStorage::open(config.progress_file.clone()));

    let players = |kind: BackendKind| {
        tracing::debug!(%kind, "creating headless player");
        Arc::new(HeadlessPlayer::new(Autoplay::MutedOnly)) as Arc<dyn Player>
    };

    let controller = Controller::builder()
        .store(store)
        .timings(config.timings())
        .on_threshold_reached(|identity: &PlaybackIdentity| {
            tracing::info!(%identity, "call-to-action unlocked");
        })
        .on_playback_started({
            let api = api.clone();
            move |identity: &PlaybackIdentity| {
                let api = api.clone();
                let event = EngagementEvent::video_play(identity);

                tokio::spawn(async move {
                    if let Err(error) = api.record_event(&event).await {
                        tracing::warn!(%error, "could not record the engagement event");
                    }
                });
            }
        })
        .mount(api.as_ref(), &players)
        .await;

    if controller.shows_play_button() {
        controller.click_play();
    } else if controller.awaits_interaction() {
        controller.interact(Interaction::PointerDown);
    }

    tracing::info!(phase = ?controller.phase(), "video mounted, press ctrl-c to stop");

    tokio::signal::ctrl_c().await.context(ShutdownSignalSnafu)?;
    controller.teardown();

    Ok(())
}
