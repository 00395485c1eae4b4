pub mod remote;
pub mod replay;

pub use remote::{RemoteTracker, RemoteTrackerConfig};
pub use replay::{ReplayTracker, ReplayTrackerConfig};

use crate::prelude::{Tracker, TrackerResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Selects the tracking collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerConfig {
    Remote(RemoteTrackerConfig),
    Replay(ReplayTrackerConfig),
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig::Remote(RemoteTrackerConfig::default())
    }
}

impl TrackerConfig {
    pub fn build(&self) -> TrackerResult<Arc<dyn Tracker>> {
        Ok(match self {
            TrackerConfig::Remote(config) => Arc::new(RemoteTracker::new(config)?),
            TrackerConfig::Replay(config) => Arc::new(ReplayTracker::new(config)),
        })
    }
}
