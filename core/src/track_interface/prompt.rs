use serde::{Deserialize, Serialize};

/// Model size requested from the tracking service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    Tiny,
    Small,
    BasePlus,
    Large,
}

/// Point-and-label hint that seeds tracking of one object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointPrompt {
    pub frame_index: u32,
    pub object_id: u32,
    pub points: Vec<[f64; 2]>,
    /// `1` marks a foreground point, `0` a background point.
    pub labels: Vec<u8>,
}

impl PointPrompt {
    /// Single foreground click on the first frame for object 1.
    pub fn click(x: f64, y: f64) -> Self {
        Self {
            frame_index: 0,
            object_id: 1,
            points: vec![[x, y]],
            labels: vec![1],
        }
    }
}

/// Feature toggles forwarded to the tracking service with every job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingOptions {
    pub model_type: ModelType,
    pub debug_masks: bool,
    pub multimask_output: bool,
    pub bbox_tracking: bool,
    pub pixel_confidences: bool,
    /// `-1` means the first frame of the video.
    pub start_frame: i64,
    /// `-1` means the last frame of the video.
    pub end_frame: i64,
    pub frame_interval: u32,
    pub preview: bool,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            model_type: ModelType::Tiny,
            debug_masks: true,
            multimask_output: false,
            bbox_tracking: true,
            pixel_confidences: false,
            start_frame: -1,
            end_frame: -1,
            frame_interval: 3,
            preview: false,
        }
    }
}

/// Full parameter set for one tracking call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingParams {
    #[serde(flatten)]
    pub options: TrackingOptions,
    pub prompts: Vec<PointPrompt>,
}

impl TrackingParams {
    pub fn new(options: TrackingOptions, prompts: Vec<PointPrompt>) -> Self {
        Self { options, prompts }
    }

    pub fn from_click(options: TrackingOptions, x: f64, y: f64) -> Self {
        Self::new(options, vec![PointPrompt::click(x, y)])
    }
}
