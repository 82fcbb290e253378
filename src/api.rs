use std::time::Duration;

use derive_new::new;
use serde::{Deserialize, Serialize};
use snafu::{Location, ResultExt, Snafu};
use tracing::instrument;
use url::Url;

use crate::config::Config;
use crate::model::{CurrentVideo, PlaybackIdentity, VideoConfig};

/// Where a session gets its video configuration from.
#[allow(async_fn_in_trait)]
pub trait ConfigSource {
    /// The configured video, `None` when the admin hasn't set one.
    async fn current_video(&self) -> Result<Option<VideoConfig>, ApiError>;
}

/// Fetches the video configuration, falling back to [VideoConfig::default] on any failure.
///
/// A broken or unreachable collaborator must never keep the funnel from rendering.
#[instrument(skip(source))]
pub async fn load_config(source: &impl ConfigSource) -> VideoConfig {
    match source.current_video().await {
        Ok(Some(video)) => {
            tracing::info!(url = %video.url, kind = %video.kind, threshold = video.threshold_seconds, "loaded video configuration");
            video
        }
        Ok(None) => {
            tracing::info!("no video configured, using the default video");
            VideoConfig::default()
        }
        Err(error) => {
            tracing::warn!(%error, "could not fetch the video configuration, using the default video");
            VideoConfig::default()
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("could not build the http client: {source}"))]
    Client {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{path}` is not a valid endpoint below the api base: {source}"))]
    Endpoint {
        path: String,
        source: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("request to `{url}` failed: {source}"))]
    Request {
        url: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("malformed response from `{url}`: {source}"))]
    Decode {
        url: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// An engagement event for the analytics collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct EngagementEvent {
    pub event_type: String,
    pub video: String,
}

impl EngagementEvent {
    /// The visitor started watching `identity`.
    pub fn video_play(identity: &PlaybackIdentity) -> Self {
        Self::new("video_play".to_string(), identity.to_string())
    }
}

/// Client of the funnel's CRUD service.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context(ClientSnafu)?;

        Ok(Self { client, base })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.api_base.clone(), config.fetch_timeout)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).context(EndpointSnafu { path })
    }

    #[instrument(skip(self))]
    pub async fn record_event(&self, event: &EngagementEvent) -> Result<(), ApiError> {
        let url = self.endpoint("api/events")?;

        self.client
            .post(url.clone())
            .json(event)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context(RequestSnafu { url: url.as_str() })?;

        tracing::debug!(event_type = %event.event_type, "recorded engagement event");
        Ok(())
    }
}

impl ConfigSource for HttpApi {
    #[instrument(skip(self))]
    async fn current_video(&self) -> Result<Option<VideoConfig>, ApiError> {
        let url = self.endpoint("api/video/current")?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context(RequestSnafu { url: url.as_str() })?;

        let body: CurrentVideo = response
            .json()
            .await
            .context(DecodeSnafu { url: url.as_str() })?;

        Ok(body.video)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::model::{BackendKind, Presentation};

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{address}/")).unwrap()
    }

    fn client(base: Url) -> HttpApi {
        HttpApi::new(base, Duration::from_secs(2)).unwrap()
    }

    fn respond(body: Value) -> Router {
        Router::new().route(
            "/api/video/current",
            get(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        )
    }

    #[tokio::test]
    async fn fetches_the_current_video() {
        let base = serve(respond(json!({
            "video": {
                "url": "https://drive.google.com/file/d/1AbC/view",
                "type": "drive",
                "thresholdSeconds": 60,
                "presentation": "ambient"
            }
        })))
        .await;

        let video = client(base).current_video().await.unwrap().unwrap();

        assert_eq!(video.kind, BackendKind::Drive);
        assert_eq!(video.threshold_seconds, 60);
        assert_eq!(video.presentation, Presentation::Ambient);
    }

    #[tokio::test]
    async fn null_video_falls_back_to_default() {
        let base = serve(respond(json!({ "video": null }))).await;

        assert_eq!(load_config(&client(base)).await, VideoConfig::default());
    }

    #[tokio::test]
    async fn server_error_falls_back_to_default() {
        let app = Router::new().route(
            "/api/video/current",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let api = client(serve(app).await);

        assert!(matches!(
            api.current_video().await,
            Err(ApiError::Request { .. })
        ));
        assert_eq!(load_config(&api).await, VideoConfig::default());
    }

    #[tokio::test]
    async fn malformed_body_falls_back_to_default() {
        let base = serve(respond(json!({ "video": { "url": 5 } }))).await;
        let api = client(base);

        assert!(matches!(
            api.current_video().await,
            Err(ApiError::Decode { .. })
        ));
        assert_eq!(load_config(&api).await, VideoConfig::default());
    }

    #[tokio::test]
    async fn unreachable_server_falls_back_to_default() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let api = client(Url::parse(&format!("http://{address}/")).unwrap());

        assert_eq!(load_config(&api).await, VideoConfig::default());
    }

    #[tokio::test]
    async fn records_engagement_events() {
        let received = Arc::new(Mutex::new(Vec::<Value>::new()));

        let app = Router::new()
            .route(
                "/api/events",
                post(
                    |State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        received.lock().unwrap().push(body);
                        StatusCode::CREATED
                    },
                ),
            )
            .with_state(received.clone());

        let api = client(serve(app).await);
        let identity = PlaybackIdentity::derive(BackendKind::Vimeo, "42").unwrap();

        api.record_event(&EngagementEvent::video_play(&identity))
            .await
            .unwrap();

        assert_eq!(
            received.lock().unwrap().as_slice(),
            &[json!({"event_type": "video_play", "video": "42"})]
        );
    }
}
