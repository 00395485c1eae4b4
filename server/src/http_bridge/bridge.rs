use crate::http_bridge::model::{ErrorBody, HealthBody, JobResponse};
use crate::http_bridge::upload::read_upload;
use crate::workflow::runner::{JobRequest, Runner};
use anyhow::Context;
use log::{error, info, warn};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::io::ReaderStream;
use trackcore::storage::ArtifactKind;
use warp::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::multipart::FormData;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

const CORS_HEADERS: [&str; 9] = [
    "accept",
    "accept-language",
    "authorization",
    "cache-control",
    "content-language",
    "content-type",
    "origin",
    "range",
    "x-requested-with",
];

fn error_reply(message: impl Into<String>, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody::new(message)), status).into_response()
}

fn internal_error() -> Response {
    error_reply("Internal server error", StatusCode::INTERNAL_SERVER_ERROR)
}

async fn process_video(form: FormData, runner: Arc<Runner>) -> Result<Response, Infallible> {
    let upload = match read_upload(form, runner.config().response).await {
        Ok(upload) => upload,
        Err(err) if err.is_client_error() => {
            runner.metrics().record_rejected();
            info!("rejected upload: {}", err);
            return Ok(error_reply(err.to_string(), StatusCode::BAD_REQUEST));
        }
        Err(err) => {
            runner.metrics().record_error();
            error!("process_video error: {}", err);
            return Ok(internal_error());
        }
    };

    let request = JobRequest {
        video: upload.video.path().to_path_buf(),
        x: upload.x,
        y: upload.y,
        pixel_to_meter: upload.pixel_to_meter,
    };
    match runner.execute(&request).await {
        Ok(outcome) => {
            info!("job {} complete", outcome.job_id);
            Ok(warp::reply::json(&JobResponse::from(outcome)).into_response())
        }
        Err(err) => {
            error!("process_video error: {:#}", err);
            Ok(internal_error())
        }
    }
}

async fn get_debug_video(job_id: String, runner: Arc<Runner>) -> Result<Response, Infallible> {
    match runner.debug_video(&job_id).await {
        Ok(Some(video)) => {
            let response = warp::http::Response::builder()
                .header(CONTENT_TYPE, ArtifactKind::DebugVideo.content_type())
                .header(CONTENT_LENGTH, video.len)
                .body(Body::wrap_stream(ReaderStream::new(video.file)));
            match response {
                Ok(response) => Ok(response),
                Err(err) => {
                    error!("get_debug_video error: {}", err);
                    Ok(internal_error())
                }
            }
        }
        Ok(None) => Ok(error_reply("Video not found", StatusCode::NOT_FOUND)),
        Err(err) => {
            error!("get_debug_video error: {:#}", err);
            Ok(internal_error())
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply("Not found", StatusCode::NOT_FOUND));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_reply("Video file too large", StatusCode::PAYLOAD_TOO_LARGE));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply("Method not allowed", StatusCode::METHOD_NOT_ALLOWED));
    }
    warn!("bad request: {:?}", err);
    Ok(error_reply("Invalid request", StatusCode::BAD_REQUEST))
}

/// Hosts the relay's HTTP surface on top of a shared [`Runner`].
pub struct HttpBridge {
    runner: Arc<Runner>,
}

impl HttpBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let runner = self.runner.clone();
        let max_upload = runner.config().max_upload_bytes;
        let runner_filter = warp::any().map(move || runner.clone());

        let process_route = warp::path("process_video")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::multipart::form().max_length(max_upload))
            .and(runner_filter.clone())
            .and_then(process_video);

        let video_route = warp::path!("get_debug_video" / String)
            .and(warp::get())
            .and(runner_filter.clone())
            .and_then(get_debug_video);

        let health_route = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter)
            .map(|runner: Arc<Runner>| {
                warp::reply::json(&HealthBody {
                    status: "ok",
                    jobs: runner.metrics().snapshot(),
                })
            });

        let cors = warp::cors()
            .allow_any_origin()
            .allow_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_headers(CORS_HEADERS);

        process_route
            .or(video_route)
            .unify()
            .or(health_route.map(Reply::into_response))
            .unify()
            .recover(handle_rejection)
            .unify()
            .with(cors)
    }

    /// Serves until Ctrl+C, then logs the job counters.
    pub async fn serve(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, async {
                if let Err(err) = signal::ctrl_c().await {
                    error!("awaiting Ctrl+C failed: {}", err);
                }
            })
            .with_context(|| format!("binding HTTP server to {}", addr))?;
        info!(
            "relay listening on http://{} (storing jobs under {})",
            bound,
            self.runner.config().output_dir.display()
        );
        server.await;
        let jobs = self.runner.metrics().snapshot();
        info!(
            "relay stopped: processed {}, rejected {}, failed {}",
            jobs.processed, jobs.rejected, jobs.failed
        );
        Ok(())
    }
}
