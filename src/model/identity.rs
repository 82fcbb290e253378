use std::fmt;

use snafu::{ensure, OptionExt as _, Snafu};
use url::Url;

use super::*;

/// Stable key of one configured video.
///
/// The file path for direct files, the platform-assigned id for everything else. Persisted
/// progress is namespaced by it, so swapping the configured video never resumes another
/// video's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackIdentity {
    kind: BackendKind,
    id: String,
}

impl PlaybackIdentity {
    pub fn derive(kind: BackendKind, text: &str) -> Result<Self, ParseIdentityError> {
        let text = text.trim();
        ensure!(!text.is_empty(), EmptySnafu { kind });

        let id = match kind {
            BackendKind::File => file_path(text)?,
            BackendKind::Vimeo => vimeo_id(text)?,
            BackendKind::YouTube => youtube_id(text)?,
            BackendKind::Drive => drive_id(text)?,
        };

        Ok(Self { kind, id })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The address a page would load for this video.
    pub fn embed_url(&self) -> String {
        match self.kind {
            BackendKind::File => self.id.clone(),
            BackendKind::Vimeo => format!("https://player.vimeo.com/video/{}", self.id),
            BackendKind::YouTube => format!("https://www.youtube.com/embed/{}", self.id),
            BackendKind::Drive => format!("https://drive.google.com/file/d/{}/preview", self.id),
        }
    }
}

impl fmt::Display for PlaybackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl AsRef<str> for PlaybackIdentity {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseIdentityError {
    /// no video reference was configured
    #[snafu(display("empty video reference for a {kind} backend"))]
    Empty { kind: BackendKind },

    /// text is a valid url, but it's missing the id fragment
    #[snafu(display("`{text}` does not contain a video id"))]
    MissingIdFragment { text: String },

    /// text is a url, but it doesn't point to the configured platform
    #[snafu(display("`{text}` is not a {kind} url"))]
    UnexpectedHost { text: String, kind: BackendKind },

    /// text is neither a url nor a bare id
    #[snafu(display("`{text}` is not a valid {kind} id"))]
    NotAnId { text: String, kind: BackendKind },
}

fn file_path(text: &str) -> Result<String, ParseIdentityError> {
    // relative paths like `/videos/intro.mp4` are already the identity
    let Ok(url) = Url::parse(text) else {
        return Ok(text.to_string());
    };

    let path = url.path();
    ensure!(
        !path.is_empty() && path != "/",
        MissingIdFragmentSnafu { text }
    );

    Ok(path.to_string())
}

fn vimeo_id(text: &str) -> Result<String, ParseIdentityError> {
    let kind = BackendKind::Vimeo;

    let Ok(url) = Url::parse(text) else {
        ensure!(is_numeric(text), NotAnIdSnafu { text, kind });
        return Ok(text.to_string());
    };

    let host = url.host_str().unwrap_or_default();
    ensure!(
        matches!(host, "vimeo.com" | "www.vimeo.com" | "player.vimeo.com"),
        UnexpectedHostSnafu { text, kind }
    );

    // covers `/<id>`, `/video/<id>` and `/channels/<name>/<id>`
    let id = segments(&url)
        .into_iter()
        .find(|segment| is_numeric(segment))
        .context(MissingIdFragmentSnafu { text })?;

    Ok(id)
}

fn youtube_id(text: &str) -> Result<String, ParseIdentityError> {
    let kind = BackendKind::YouTube;

    let Ok(url) = Url::parse(text) else {
        ensure!(is_token(text), NotAnIdSnafu { text, kind });
        return Ok(text.to_string());
    };

    match url.host_str().unwrap_or_default() {
        "youtu.be" => segments(&url)
            .into_iter()
            .next()
            .context(MissingIdFragmentSnafu { text }),

        "youtube.com" | "www.youtube.com" | "m.youtube.com" => {
            let segments = segments(&url);

            match segments.first().map(String::as_str) {
                Some("watch") => query_param(&url, "v").context(MissingIdFragmentSnafu { text }),
                Some("embed" | "shorts" | "live") => segments
                    .get(1)
                    .cloned()
                    .context(MissingIdFragmentSnafu { text }),
                _ => MissingIdFragmentSnafu { text }.fail(),
            }
        }

        _ => UnexpectedHostSnafu { text, kind }.fail(),
    }
}

fn drive_id(text: &str) -> Result<String, ParseIdentityError> {
    let kind = BackendKind::Drive;

    let Ok(url) = Url::parse(text) else {
        ensure!(is_token(text), NotAnIdSnafu { text, kind });
        return Ok(text.to_string());
    };

    ensure!(
        url.host_str() == Some("drive.google.com"),
        UnexpectedHostSnafu { text, kind }
    );

    let segments = segments(&url);
    if let Some(position) = segments.iter().position(|segment| segment == "d") {
        return segments
            .get(position + 1)
            .cloned()
            .context(MissingIdFragmentSnafu { text });
    }

    query_param(&url, "id").context(MissingIdFragmentSnafu { text })
}

fn segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find_map(|(key, value)| (key == name).then(|| value.into_owned()))
        .filter(|value| !value.is_empty())
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn is_token(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
