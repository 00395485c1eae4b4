use crate::math::stats::StatsHelper;
use crate::prelude::{KinematicsError, KinematicsResult};
use crate::telemetry::log::LogManager;
use crate::track_interface::TrackDocument;
use serde::{Deserialize, Serialize};

/// Box center in meters, vertical axis pointing up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionSample {
    pub frame: String,
    pub timestep: f64,
    pub x: f64,
    pub y: f64,
}

/// Velocity between two consecutive samples, stamped with the later timestep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VelocitySample {
    pub timestep: f64,
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KinematicSeries {
    pub positions: Vec<PositionSample>,
    pub velocities: Vec<VelocitySample>,
}

/// Converts a pixel-space track into positions and velocities in meters.
///
/// Samples are taken in document order. Nothing is sorted by timestep, so an
/// out-of-order document yields velocities with the wrong sign.
pub struct KinematicsProcessor {
    pixels_per_meter: f64,
    logger: LogManager,
}

impl KinematicsProcessor {
    pub fn new(pixels_per_meter: f64) -> KinematicsResult<Self> {
        if !pixels_per_meter.is_finite() || pixels_per_meter == 0.0 {
            return Err(KinematicsError::InvalidScale(pixels_per_meter));
        }
        Ok(Self {
            pixels_per_meter,
            logger: LogManager::new("kinematics"),
        })
    }

    pub fn execute(&self, document: &TrackDocument) -> KinematicsResult<KinematicSeries> {
        let mut frames = Vec::new();
        let mut timesteps = Vec::new();
        let mut center_x = Vec::new();
        let mut center_y = Vec::new();
        for (frame, detection) in document.entries() {
            let (cx, cy) = detection.center();
            frames.push(frame.to_string());
            timesteps.push(detection.timestep);
            center_x.push(cx);
            center_y.push(cy);
        }

        let Some(max_y) = StatsHelper::max(&center_y) else {
            return Ok(KinematicSeries::default());
        };

        let xs: Vec<f64> = center_x.iter().map(|cx| cx / self.pixels_per_meter).collect();
        let ys: Vec<f64> = center_y
            .iter()
            .map(|cy| (max_y - cy) / self.pixels_per_meter)
            .collect();

        let dt = StatsHelper::deltas(&timesteps);
        let dx = StatsHelper::deltas(&xs);
        let dy = StatsHelper::deltas(&ys);
        let mut velocities = Vec::with_capacity(dt.len());
        for (index, delta) in dt.iter().enumerate() {
            if *delta == 0.0 {
                return Err(KinematicsError::ZeroTimestepDelta {
                    index,
                    next: index + 1,
                    timestep: timesteps[index],
                });
            }
            velocities.push(VelocitySample {
                timestep: timesteps[index + 1],
                vx: dx[index] / delta,
                vy: dy[index] / delta,
            });
        }

        let positions = frames
            .into_iter()
            .zip(timesteps)
            .zip(xs.into_iter().zip(ys))
            .map(|((frame, timestep), (x, y))| PositionSample {
                frame,
                timestep,
                x,
                y,
            })
            .collect::<Vec<_>>();

        self.logger.record(&format!(
            "{} positions, {} velocities at {} px/m",
            positions.len(),
            velocities.len(),
            self.pixels_per_meter
        ));

        Ok(KinematicSeries {
            positions,
            velocities,
        })
    }
}
