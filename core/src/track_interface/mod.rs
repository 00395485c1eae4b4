pub mod document;
pub mod output;
pub mod prompt;

pub use document::{Detection, TrackDocument};
pub use output::{TrackingOutput, BBOX_TRACKING_ARTIFACT};
pub use prompt::{ModelType, PointPrompt, TrackingOptions, TrackingParams};
