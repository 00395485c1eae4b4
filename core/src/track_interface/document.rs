use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One tracked bounding box as reported by the tracking service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    /// Edges as `[x1, y1, x2, y2]` in pixels.
    pub bbox: [f64; 4],
    pub timestep: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<u32>,
}

impl Detection {
    pub fn new(bbox: [f64; 4], timestep: f64) -> Self {
        Self {
            bbox,
            timestep,
            object_id: None,
        }
    }

    /// Center of the box in pixels.
    pub fn center(&self) -> (f64, f64) {
        let [x1, y1, x2, y2] = self.bbox;
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }
}

/// Bounding-box track keyed by frame identifier, in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct TrackDocument {
    frames: IndexMap<String, Vec<Detection>>,
}

impl TrackDocument {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn push(&mut self, frame: impl Into<String>, detection: Detection) {
        self.frames.entry(frame.into()).or_default().push(detection);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Every detection with its frame key, frames in key order and entries in list order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Detection)> {
        self.frames
            .iter()
            .flat_map(|(frame, detections)| detections.iter().map(move |d| (frame.as_str(), d)))
    }
}
