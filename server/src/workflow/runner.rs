use crate::workflow::config::{RelayConfig, ResponseMode};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use trackcore::prelude::{ArtifactStore, KinematicsError, StoredArtifact, Tracker, TrackerError};
use trackcore::processing::{KinematicSeries, KinematicsProcessor};
use trackcore::storage::{ArtifactKind, FsJobStore, JobId};
use trackcore::telemetry::MetricsRecorder;
use trackcore::track_interface::{TrackDocument, TrackingParams, BBOX_TRACKING_ARTIFACT};

/// One validated click-to-track request.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub video: PathBuf,
    pub x: f64,
    pub y: f64,
    pub pixel_to_meter: Option<f64>,
}

/// Track data returned to the caller, depending on the response mode.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TrackPayload {
    Raw { bbox_tracking: String },
    Kinematics(KinematicSeries),
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub track: TrackPayload,
}

/// Drives one job: tracker call, optional kinematics, artifact persistence.
///
/// A job is stored only once everything else succeeded, so a failed request
/// never leaves a job directory behind.
#[derive(Clone)]
pub struct Runner {
    config: Arc<RelayConfig>,
    tracker: Arc<dyn Tracker>,
    store: Arc<dyn ArtifactStore>,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(
        config: RelayConfig,
        tracker: Arc<dyn Tracker>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tracker,
            store,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn from_config(config: RelayConfig) -> anyhow::Result<Self> {
        let store = FsJobStore::open(&config.output_dir)
            .with_context(|| format!("opening output directory {}", config.output_dir.display()))?;
        let tracker = config.tracker.build().context("building tracker client")?;
        Ok(Self::new(config, tracker, Arc::new(store)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub async fn execute(&self, request: &JobRequest) -> anyhow::Result<JobOutcome> {
        let result = self.run(request).await;
        match &result {
            Ok(_) => self.metrics.record_processed(),
            Err(_) => self.metrics.record_error(),
        }
        result
    }

    async fn run(&self, request: &JobRequest) -> anyhow::Result<JobOutcome> {
        let params = TrackingParams::from_click(self.config.tracking.clone(), request.x, request.y);
        let output = self
            .tracker
            .track(&request.video, &params)
            .await
            .with_context(|| format!("running {} tracker", self.tracker.name()))?;

        let track_path = output
            .bbox_tracking()
            .ok_or_else(|| TrackerError::MissingArtifact(BBOX_TRACKING_ARTIFACT.into()))?;
        let track_text = tokio::fs::read_to_string(track_path)
            .await
            .context("reading track document")?;

        let track = match self.config.response {
            ResponseMode::Raw => TrackPayload::Raw {
                bbox_tracking: track_text,
            },
            ResponseMode::Kinematics => {
                let scale = request
                    .pixel_to_meter
                    .context("kinematics response needs a pixel to meter ratio")?;
                let document = TrackDocument::parse(&track_text).map_err(KinematicsError::from)?;
                let series = KinematicsProcessor::new(scale)?
                    .execute(&document)
                    .context("deriving kinematics")?;
                TrackPayload::Kinematics(series)
            }
        };

        let job_id = JobId::generate();
        self.store
            .put(
                &job_id,
                &[
                    (ArtifactKind::TrackDocument, track_path),
                    (ArtifactKind::DebugVideo, output.debug_video.as_path()),
                ],
            )
            .await
            .with_context(|| format!("storing artifacts for job {}", job_id))?;

        Ok(JobOutcome { job_id, track })
    }

    /// Stored debug video for `job_id`; ids that are not job ids are unknown.
    pub async fn debug_video(&self, job_id: &str) -> anyhow::Result<Option<StoredArtifact>> {
        let Ok(job) = job_id.parse::<JobId>() else {
            return Ok(None);
        };
        Ok(self.store.get(&job, ArtifactKind::DebugVideo).await?)
    }
}
