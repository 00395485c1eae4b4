use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name of the bounding-box track among the named output artifacts.
pub const BBOX_TRACKING_ARTIFACT: &str = "bbox_tracking";

/// Artifacts returned by one tracking call.
///
/// Files may live in a scratch directory owned by this value; it is removed
/// when the output is dropped.
#[derive(Debug)]
pub struct TrackingOutput {
    pub debug_video: PathBuf,
    pub files: BTreeMap<String, PathBuf>,
    scratch: Option<TempDir>,
}

impl TrackingOutput {
    pub fn new(debug_video: PathBuf, files: BTreeMap<String, PathBuf>) -> Self {
        Self {
            debug_video,
            files,
            scratch: None,
        }
    }

    pub fn with_scratch(mut self, scratch: TempDir) -> Self {
        self.scratch = Some(scratch);
        self
    }

    pub fn file(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    pub fn bbox_tracking(&self) -> Option<&Path> {
        self.file(BBOX_TRACKING_ARTIFACT)
    }
}
