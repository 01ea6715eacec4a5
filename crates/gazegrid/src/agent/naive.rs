//! Angle-only interpolation strategy.

use crate::interpolate::idw_1d;
use crate::map::{CalibrationMap, CalibrationPoint};
use crate::predictor::GazeObservation;

use super::CalibrationAgent;

/// Baseline strategy: interpolates each screen axis from the matching gaze
/// angle alone.
///
/// Head position is recorded in the map but ignored at prediction time, so
/// accuracy degrades once the subject moves away from where they sat
/// during calibration. The full correspondence is still stored; a profile
/// calibrated with this strategy can later be tracked by a head-aware one.
#[derive(Debug, Default)]
pub struct NaiveAgent {
    map: CalibrationMap,
}

impl NaiveAgent {
    /// Create an agent with an empty calibration map.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalibrationAgent for NaiveAgent {
    fn calibration_step(&mut self, point: CalibrationPoint) {
        self.map.push(point);
    }

    fn point_of_regard(&self, observation: &GazeObservation) -> Option<[f64; 2]> {
        let x = idw_1d(observation.theta, self.map.theta(), self.map.monitor_x())?;
        let y = idw_1d(observation.phi, self.map.phi(), self.map.monitor_y())?;
        Some([x, y])
    }

    fn map(&self) -> &CalibrationMap {
        &self.map
    }

    fn replace_map(&mut self, map: CalibrationMap) {
        self.map = map;
    }
}
