use crate::storage::{ArtifactKind, JobId};
use crate::track_interface::{TrackingOutput, TrackingParams};
use async_trait::async_trait;
use std::path::Path;

/// Failure while talking to the tracking collaborator.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("tracking service returned {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("invalid tracking response: {0}")]
    InvalidResponse(String),
    #[error("tracking output is missing artifact `{0}`")]
    MissingArtifact(String),
    #[error("could not encode tracking parameters: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid tracker configuration: {0}")]
    Config(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Failure while persisting or loading job artifacts.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("job {0} already exists")]
    JobExists(JobId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure while deriving kinematics from a track document.
#[derive(thiserror::Error, Debug)]
pub enum KinematicsError {
    #[error("malformed track document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("pixel to meter ratio must be non-zero and finite, got {0}")]
    InvalidScale(f64),
    #[error("zero timestep delta between samples {index} and {next} (t = {timestep})")]
    ZeroTimestepDelta {
        index: usize,
        next: usize,
        timestep: f64,
    },
}

pub type KinematicsResult<T> = Result<T, KinematicsError>;

/// Runs segmentation/tracking on a video file.
///
/// Implementations block (from the caller's point of view) until the
/// collaborator has produced every artifact.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn track(&self, video: &Path, params: &TrackingParams) -> TrackerResult<TrackingOutput>;
    fn name(&self) -> &'static str;
}

/// A stored artifact opened for reading.
#[derive(Debug)]
pub struct StoredArtifact {
    pub file: tokio::fs::File,
    pub len: u64,
}

/// Put/get storage for job artifacts keyed by job id.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores every artifact for a new job. Either all of them are stored or none are.
    async fn put(&self, job: &JobId, artifacts: &[(ArtifactKind, &Path)]) -> StoreResult<()>;
    /// Opens one artifact, `None` when the job or the artifact is unknown.
    async fn get(&self, job: &JobId, kind: ArtifactKind) -> StoreResult<Option<StoredArtifact>>;
}
