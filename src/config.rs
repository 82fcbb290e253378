use std::path::PathBuf;
use std::time::Duration;

use derive_new::new;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use snafu::ResultExt;
use url::Url;

use crate::error::{ApplicationError, ConfigLoadSnafu};

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: Url,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_progress_file")]
    pub progress_file: PathBuf,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "poll_interval_ms", default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "save_interval_ms", default = "default_save_interval")]
    pub save_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "hud_fade_ms", default = "default_hud_fade")]
    pub hud_fade: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "fetch_timeout_ms", default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn timings(&self) -> Timings {
        Timings::new(self.poll_interval, self.save_interval, self.hud_fade)
    }
}

/// Cadences of the timers a playback session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Timings {
    /// How often elapsed time is checked against the threshold.
    pub poll_interval: Duration,
    /// How often progress is persisted.
    pub save_interval: Duration,
    /// How long the HUD overlay stays up after playback starts.
    pub hud_fade: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self::new(
            default_poll_interval(),
            default_save_interval(),
            default_hud_fade(),
        )
    }
}

fn default_api_base() -> Url {
    Url::parse("http://localhost:3000/").expect("default api base is a valid url")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_progress_file() -> PathBuf {
    PathBuf::from("video_progress.json")
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(300)
}

fn default_save_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_hud_fade() -> Duration {
    Duration::from_secs(3)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(5)
}
