//! Head-aware interpolation strategy.

use crate::interpolate::idw_2d;
use crate::map::{CalibrationMap, CalibrationPoint};
use crate::predictor::GazeObservation;

use super::CalibrationAgent;

/// Default strategy: interpolates each screen axis from the joint
/// (head position, gaze angle) distance.
///
/// Anchors captured from a different head position count as farther away
/// even at an identical angle, so estimates track the subject as they
/// shift in front of the screen. The x axis pairs `head_x` with `theta`,
/// the y axis pairs `head_y` with `phi`.
#[derive(Debug, Default)]
pub struct InterpolationAgent {
    map: CalibrationMap,
}

impl InterpolationAgent {
    /// Create an agent with an empty calibration map.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalibrationAgent for InterpolationAgent {
    fn calibration_step(&mut self, point: CalibrationPoint) {
        self.map.push(point);
    }

    fn point_of_regard(&self, observation: &GazeObservation) -> Option<[f64; 2]> {
        let x = idw_2d(
            observation.head_x,
            observation.theta,
            self.map.head_x(),
            self.map.theta(),
            self.map.monitor_x(),
        )?;
        let y = idw_2d(
            observation.head_y,
            observation.phi,
            self.map.head_y(),
            self.map.phi(),
            self.map.monitor_y(),
        )?;
        Some([x, y])
    }

    fn map(&self) -> &CalibrationMap {
        &self.map
    }

    fn replace_map(&mut self, map: CalibrationMap) {
        self.map = map;
    }
}
