//! Core types and services for the click-to-track video relay.
//!
//! The relay hands uploaded videos to a remote segmentation/tracking service,
//! keeps the returned artifacts under a per-job key, and can turn the returned
//! bounding-box track into position and velocity series.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod storage;
pub mod telemetry;
pub mod track_interface;
pub mod tracker;

pub use prelude::{ArtifactStore, StoredArtifact, Tracker};
