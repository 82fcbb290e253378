use std::fmt;

use super::*;

/// Video shown when the collaborator has nothing configured or cannot be reached.
pub const DEFAULT_VIDEO_URL: &str = "https://vimeo.com/76979871";

/// Seconds of playback required before the call-to-action unlocks, unless configured otherwise.
pub const DEFAULT_THRESHOLD_SECONDS: u32 = 180;

/// The active video of the funnel as configured by the admin.
///
/// Loaded once per session; a changed configuration only takes effect on the next mount.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub threshold_seconds: u32,
    #[new(default)]
    #[serde(default)]
    pub presentation: Presentation,
}

impl VideoConfig {
    pub fn with_presentation(mut self, presentation: Presentation) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn threshold(&self) -> f64 {
        f64::from(self.threshold_seconds)
    }

    pub fn identity(&self) -> Result<PlaybackIdentity, ParseIdentityError> {
        PlaybackIdentity::derive(self.kind, &self.url)
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_VIDEO_URL.to_string(),
            BackendKind::Vimeo,
            DEFAULT_THRESHOLD_SECONDS,
        )
    }
}

/// Response body of `GET /api/video/current`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CurrentVideo {
    #[serde(default)]
    pub video: Option<VideoConfig>,
}

/// The playback technology a video is served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A media file played by a native video element.
    #[serde(alias = "direct", alias = "mp4")]
    File,
    /// Hosted stream with a player SDK reporting true position.
    #[serde(alias = "vimeo-like")]
    Vimeo,
    /// Hosted stream driven through an iframe API.
    YouTube,
    /// Cloud drive preview embed; no progress channel at all.
    #[serde(alias = "google-drive", alias = "gdrive")]
    Drive,
}

impl BackendKind {
    /// Whether the backend can report its real media position.
    ///
    /// Backends without it are tracked by wall-clock time since playback started.
    pub fn reports_position(self) -> bool {
        !matches!(self, BackendKind::Drive)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::File => "file",
            BackendKind::Vimeo => "vimeo",
            BackendKind::YouTube => "youtube",
            BackendKind::Drive => "drive",
        };

        f.write_str(name)
    }
}

/// How the page presents the video and obtains the user gesture browsers require for sound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    /// A visible play button; one click starts playback with sound.
    #[default]
    ClickToPlay,
    /// Muted autoplay in a loop, unmuted by the first interaction anywhere on the page.
    Ambient,
}

impl Presentation {
    /// Ambient videos treat any pause as an anomaly and resume straight away.
    pub fn resumes_on_pause(self) -> bool {
        matches!(self, Presentation::Ambient)
    }
}
