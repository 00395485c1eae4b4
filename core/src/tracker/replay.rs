use crate::prelude::{Tracker, TrackerResult};
use crate::telemetry::log::LogManager;
use crate::track_interface::{TrackingOutput, TrackingParams, BBOX_TRACKING_ARTIFACT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayTrackerConfig {
    pub debug_video: PathBuf,
    pub bbox_tracking: PathBuf,
}

/// Stand-in collaborator that answers every job with the same stored artifacts.
pub struct ReplayTracker {
    config: ReplayTrackerConfig,
    calls: AtomicUsize,
    last_params: Mutex<Option<TrackingParams>>,
    logger: LogManager,
}

impl ReplayTracker {
    pub fn new(config: &ReplayTrackerConfig) -> Self {
        Self {
            config: config.clone(),
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
            logger: LogManager::new("replay-tracker"),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<TrackingParams> {
        self.last_params.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Tracker for ReplayTracker {
    async fn track(&self, video: &Path, params: &TrackingParams) -> TrackerResult<TrackingOutput> {
        tokio::fs::metadata(video).await?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_params.lock() {
            *guard = Some(params.clone());
        }

        let scratch = TempDir::new()?;
        let debug_video = scratch.path().join("debug_video.mp4");
        let bbox_tracking = scratch.path().join("bbox_tracking.json");
        tokio::fs::copy(&self.config.debug_video, &debug_video).await?;
        tokio::fs::copy(&self.config.bbox_tracking, &bbox_tracking).await?;
        self.logger
            .record(&format!("replayed artifacts for {}", video.display()));

        let files = BTreeMap::from([(BBOX_TRACKING_ARTIFACT.to_string(), bbox_tracking)]);
        Ok(TrackingOutput::new(debug_video, files).with_scratch(scratch))
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}
