//! Ray/screen-plane intersection strategy.

use nalgebra::Vector3;

use crate::map::{CalibrationMap, CalibrationPoint};
use crate::predictor::GazeObservation;
use crate::screen::ScreenGeometry;

use super::CalibrationAgent;

/// Ray length used before any calibration sample has been absorbed.
pub(super) const DEFAULT_DEPTH_SCALE: f64 = 1.0;

/// Axis denominators smaller than this are treated as parallel to the
/// screen plane and contribute no depth estimate.
const PARALLEL_EPS: f64 = 1e-12;

/// Model-based strategy: casts a gaze ray from the head position and
/// intersects it with the configured screen plane.
///
/// The gaze direction for angles `(theta, phi)` is
/// `[cos(phi)cos(theta), cos(phi)sin(theta), sin(phi)]`, and the point of
/// regard is `head + depth_scale * direction` projected onto the screen.
/// Calibration refines `depth_scale` only: each sample yields a per-axis
/// closed-form solve for the ray length that would have hit the known
/// target, and the running mean of those solves replaces the configured
/// default. Head positions must be expressed in the same physical frame
/// as the [`ScreenGeometry`], in meters.
///
/// Angles arrive in degrees like everywhere else and are converted to
/// radians internally.
#[derive(Debug)]
pub struct GeometricAgent {
    map: CalibrationMap,
    screen: ScreenGeometry,
    initial_depth_scale: f64,
    depth_sum: f64,
    depth_samples: u32,
}

impl GeometricAgent {
    /// Create an agent for `screen` with a starting ray length.
    pub fn new(screen: ScreenGeometry, initial_depth_scale: f64) -> Self {
        Self {
            map: CalibrationMap::new(),
            screen,
            initial_depth_scale,
            depth_sum: 0.0,
            depth_samples: 0,
        }
    }

    /// Current ray length: the mean of all per-sample solves, or the
    /// configured default while no sample has produced one.
    pub fn depth_scale(&self) -> f64 {
        if self.depth_samples > 0 {
            self.depth_sum / f64::from(self.depth_samples)
        } else {
            self.initial_depth_scale
        }
    }

    /// Unit-free gaze direction for angles in radians.
    fn gaze_direction(theta: f64, phi: f64) -> Vector3<f64> {
        Vector3::new(
            phi.cos() * theta.cos(),
            phi.cos() * theta.sin(),
            phi.sin(),
        )
    }

    /// Solve for the ray length that would have carried this sample's ray
    /// onto its known target, averaging the horizontal and vertical
    /// solutions. Axes whose direction component is parallel to the
    /// screen plane are skipped; a sample degenerate on both axes yields
    /// nothing.
    fn solve_depth(&self, point: &CalibrationPoint) -> Option<f64> {
        let target = self
            .screen
            .pixel_to_physical([point.monitor_x, point.monitor_y]);
        let direction =
            Self::gaze_direction(point.theta.to_radians(), point.phi.to_radians());

        let mut sum = 0.0;
        let mut axes = 0u32;
        if direction.x.abs() > PARALLEL_EPS {
            sum += (target[0] - point.head_x) / direction.x;
            axes += 1;
        }
        if direction.y.abs() > PARALLEL_EPS {
            sum += (target[1] - point.head_y) / direction.y;
            axes += 1;
        }
        if axes == 0 {
            tracing::debug!(
                theta = point.theta,
                phi = point.phi,
                "gaze ray parallel to screen plane, sample carries no depth"
            );
            return None;
        }
        Some(sum / f64::from(axes))
    }

    fn absorb(&mut self, point: &CalibrationPoint) {
        if let Some(depth) = self.solve_depth(point) {
            self.depth_sum += depth;
            self.depth_samples += 1;
        }
    }
}

impl CalibrationAgent for GeometricAgent {
    fn calibration_step(&mut self, point: CalibrationPoint) {
        self.absorb(&point);
        self.map.push(point);
    }

    fn point_of_regard(&self, observation: &GazeObservation) -> Option<[f64; 2]> {
        let head = [observation.head_x, observation.head_y];
        // A perfectly level gaze never converges on a depth along the
        // vertical axis; fall back to the head position itself.
        let physical = if observation.phi == 0.0 {
            head
        } else {
            let direction = Self::gaze_direction(
                observation.theta.to_radians(),
                observation.phi.to_radians(),
            );
            let depth = self.depth_scale();
            [
                head[0] + depth * direction.x,
                head[1] + depth * direction.y,
            ]
        };
        Some(self.screen.physical_to_pixel(physical))
    }

    fn map(&self) -> &CalibrationMap {
        &self.map
    }

    fn replace_map(&mut self, map: CalibrationMap) {
        // Derived state follows the map: rebuild the running depth mean
        // from the incoming points.
        self.map = map;
        self.depth_sum = 0.0;
        self.depth_samples = 0;
        let points: Vec<_> = self.map.points().collect();
        for point in &points {
            self.absorb(point);
        }
    }
}
