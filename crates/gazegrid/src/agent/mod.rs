//! Calibration agents: strategies that turn a gaze observation into a
//! point on the screen.
//!
//! All strategies share the same lifecycle. During calibration they absorb
//! observation/target correspondences into a [`CalibrationMap`]; during
//! tracking they resolve fresh observations against that state. Strategy
//! selection happens once, at construction, via [`AgentConfig`]; thereafter
//! the engine drives a `Box<dyn CalibrationAgent>` without knowing which
//! variant is behind it.

mod geometric;
mod interpolation;
mod naive;

pub use geometric::GeometricAgent;
pub use interpolation::InterpolationAgent;
pub use naive::NaiveAgent;

use serde::{Deserialize, Serialize};

use crate::map::{CalibrationMap, CalibrationPoint};
use crate::predictor::GazeObservation;
use crate::screen::ScreenGeometry;

/// A gaze-to-screen mapping strategy.
///
/// Implementations own their [`CalibrationMap`] and any derived state;
/// the engine talks to them only through this interface.
pub trait CalibrationAgent: Send {
    /// Record one calibration correspondence.
    ///
    /// Appends exactly one entry to every column of the map. Agents never
    /// validate or reject points; an implausible correspondence is a
    /// capture-quality problem, not something a strategy can detect.
    fn calibration_step(&mut self, point: CalibrationPoint);

    /// Resolve an observation to an on-screen point in pixels.
    ///
    /// `None` means the strategy cannot produce an estimate in its current
    /// state, such as an interpolating variant with an empty map.
    fn point_of_regard(&self, observation: &GazeObservation) -> Option<[f64; 2]>;

    /// The calibration state accumulated so far.
    fn map(&self) -> &CalibrationMap;

    /// Replace the calibration state wholesale.
    ///
    /// Used when a stored profile is loaded or the session is reset; any
    /// state derived from the old map is rebuilt from the new one.
    fn replace_map(&mut self, map: CalibrationMap);
}

fn default_depth_scale() -> f64 {
    geometric::DEFAULT_DEPTH_SCALE
}

/// Strategy selection and parameters, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AgentConfig {
    /// Angle-only interpolation; head position is ignored.
    Naive,
    /// Head-aware interpolation over the joint (position, angle) distance.
    Interpolation,
    /// Ray/screen-plane intersection against a configured geometry.
    Geometric {
        /// Physical pose and resolution of the target screen.
        #[serde(default)]
        screen: ScreenGeometry,
        /// Ray length used until calibration samples refine it.
        #[serde(default = "default_depth_scale")]
        initial_depth_scale: f64,
    },
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::Interpolation
    }
}

impl AgentConfig {
    /// Construct the agent this configuration describes.
    pub fn build(&self) -> Box<dyn CalibrationAgent> {
        match *self {
            AgentConfig::Naive => Box::new(NaiveAgent::new()),
            AgentConfig::Interpolation => Box::new(InterpolationAgent::new()),
            AgentConfig::Geometric {
                screen,
                initial_depth_scale,
            } => Box::new(GeometricAgent::new(screen, initial_depth_scale)),
        }
    }
}
