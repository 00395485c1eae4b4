pub mod kinematics;

pub use kinematics::{KinematicSeries, KinematicsProcessor, PositionSample, VelocitySample};
