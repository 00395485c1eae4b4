use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of one processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Text that is not a lowercase hyphenated job id.
#[derive(Debug, thiserror::Error)]
#[error("not a job id: {0:?}")]
pub struct InvalidJobId(String);

impl FromStr for JobId {
    type Err = InvalidJobId;

    /// Accepts only the form produced by `Display`, so every stored job has
    /// exactly one valid id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Uuid::parse_str(s) {
            Ok(id) if id.hyphenated().to_string() == s => Ok(Self(id)),
            _ => Err(InvalidJobId(s.to_string())),
        }
    }
}

/// Artifacts kept for every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    TrackDocument,
    DebugVideo,
}

impl ArtifactKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::TrackDocument => "bbox_tracking.json",
            ArtifactKind::DebugVideo => "debug_video.mp4",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::TrackDocument => "application/json",
            ArtifactKind::DebugVideo => "video/mp4",
        }
    }
}
