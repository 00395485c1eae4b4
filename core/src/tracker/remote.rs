use crate::prelude::{Tracker, TrackerError, TrackerResult};
use crate::telemetry::log::LogManager;
use crate::track_interface::{TrackingOutput, TrackingParams};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Connection settings for the hosted tracking service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteTrackerConfig {
    pub endpoint: String,
    /// Environment variable holding a bearer token, if the service needs one.
    pub api_key_env: Option<String>,
    /// Unset means wait for as long as the service takes.
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteTrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/track".into(),
            api_key_env: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteArtifact {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RemoteReply {
    debug_video: RemoteArtifact,
    #[serde(default)]
    files: BTreeMap<String, RemoteArtifact>,
}

/// Sends the video and parameters to the service in one multipart request,
/// then downloads every artifact it names into a scratch directory.
pub struct RemoteTracker {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    logger: LogManager,
}

impl RemoteTracker {
    pub fn new(config: &RemoteTrackerConfig) -> TrackerResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|err| TrackerError::Config(format!("endpoint {}: {}", config.endpoint, err)))?;
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                TrackerError::Config(format!("environment variable {} is not set", var))
            })?),
            None => None,
        };

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            api_key,
            logger: LogManager::new("remote-tracker"),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn download(&self, url: &str, target: PathBuf) -> TrackerResult<PathBuf> {
        let url = self
            .endpoint
            .join(url)
            .map_err(|err| TrackerError::InvalidResponse(format!("artifact url {}: {}", url, err)))?;
        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(&target, &bytes).await?;
        self.logger
            .record(&format!("downloaded {} ({} bytes)", url, bytes.len()));
        Ok(target)
    }
}

#[async_trait]
impl Tracker for RemoteTracker {
    async fn track(&self, video: &Path, params: &TrackingParams) -> TrackerResult<TrackingOutput> {
        let bytes = tokio::fs::read(video).await?;
        let file_name = video
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.mov")
            .to_string();
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("params", serde_json::to_string(params)?);

        self.logger
            .record(&format!("submitting {} to {}", video.display(), self.endpoint));
        let response = self
            .authorize(self.client.post(self.endpoint.clone()))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        let reply: RemoteReply = response
            .json()
            .await
            .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;

        let scratch = TempDir::new()?;
        let debug_video = self
            .download(&reply.debug_video.url, scratch.path().join("debug_video"))
            .await?;
        let mut files = BTreeMap::new();
        for (index, (name, artifact)) in reply.files.into_iter().enumerate() {
            let target = scratch.path().join(format!("artifact_{}", index));
            let path = self.download(&artifact.url, target).await?;
            files.insert(name, path);
        }

        Ok(TrackingOutput::new(debug_video, files).with_scratch(scratch))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_interface::TrackingOptions;
    use futures::TryStreamExt;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use warp::Filter;

    const TRACK: &str = r#"{"0": [{"bbox": [1, 2, 3, 4], "timestep": 0.0}]}"#;

    /// Fake tracking service; records the names of the multipart parts it received.
    fn spawn_service(status: u16) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_filter = seen.clone();
        let run = warp::path!("v1" / "track")
            .and(warp::post())
            .and(warp::multipart::form())
            .and_then(move |form: warp::multipart::FormData| {
                let seen = seen_filter.clone();
                async move {
                    futures::pin_mut!(form);
                    let mut names = Vec::new();
                    while let Some(part) = form.try_next().await.map_err(|_| warp::reject())? {
                        names.push(part.name().to_string());
                        part.stream()
                            .try_for_each(|_| async { Ok(()) })
                            .await
                            .map_err(|_| warp::reject())?;
                    }
                    seen.lock().unwrap().extend(names);
                    let reply = warp::reply::json(&serde_json::json!({
                        "debug_video": {"url": "/artifacts/debug.mp4"},
                        "files": {"bbox_tracking": {"url": "artifacts/track.json"}}
                    }));
                    Ok::<_, warp::Rejection>(warp::reply::with_status(
                        reply,
                        warp::http::StatusCode::from_u16(status).unwrap(),
                    ))
                }
            });
        let video = warp::path!("artifacts" / "debug.mp4").map(|| "debug-video");
        let track = warp::path!("v1" / "artifacts" / "track.json").map(|| TRACK);
        let (addr, server) =
            warp::serve(run.or(video).or(track)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        (addr, seen)
    }

    fn upload(dir: &Path) -> PathBuf {
        let path = dir.join("clip.mov");
        std::fs::write(&path, b"mov-bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn downloads_named_artifacts() {
        let (addr, seen) = spawn_service(200);
        let temp = TempDir::new().unwrap();
        let tracker = RemoteTracker::new(&RemoteTrackerConfig {
            endpoint: format!("http://{}/v1/track", addr),
            ..Default::default()
        })
        .unwrap();
        let params = TrackingParams::from_click(TrackingOptions::default(), 5.0, 6.0);

        let output = tracker.track(&upload(temp.path()), &params).await.unwrap();

        assert_eq!(std::fs::read(&output.debug_video).unwrap(), b"debug-video");
        assert_eq!(
            std::fs::read_to_string(output.bbox_tracking().unwrap()).unwrap(),
            TRACK
        );
        assert_eq!(*seen.lock().unwrap(), vec!["file", "params"]);
    }

    #[tokio::test]
    async fn service_error_carries_status() {
        let (addr, _) = spawn_service(503);
        let temp = TempDir::new().unwrap();
        let tracker = RemoteTracker::new(&RemoteTrackerConfig {
            endpoint: format!("http://{}/v1/track", addr),
            ..Default::default()
        })
        .unwrap();
        let params = TrackingParams::from_click(TrackingOptions::default(), 5.0, 6.0);

        let err = tracker
            .track(&upload(temp.path()), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Remote { status: 503, .. }));
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let err = RemoteTracker::new(&RemoteTrackerConfig {
            endpoint: "not a url".into(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, TrackerError::Config(_)));
    }
}
