//! Physical screen model for the geometric mapping strategy.

use serde::{Deserialize, Serialize};

/// Pose and resolution of the display surface.
///
/// The physical frame is the one the gaze predictor reports head positions
/// in: x grows to the subject's right, y grows upward, and the screen
/// plane sits at a fixed depth. `origin_x_m`/`origin_y_m` locate the
/// screen's top-left corner in that frame, so pixel y grows downward
/// while physical y grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Top-left corner x in meters.
    pub origin_x_m: f64,
    /// Top-left corner y in meters.
    pub origin_y_m: f64,
    /// Physical width in meters.
    pub width_m: f64,
    /// Physical height in meters.
    pub height_m: f64,
    /// Horizontal resolution in pixels.
    pub width_px: f64,
    /// Vertical resolution in pixels.
    pub height_px: f64,
}

impl Default for ScreenGeometry {
    /// A 16:9 desktop monitor, 0.6 m wide, top-left corner 0.3 m left of
    /// and 0.2 m above the frame origin.
    fn default() -> Self {
        Self {
            origin_x_m: -0.3,
            origin_y_m: 0.2,
            width_m: 0.6,
            height_m: 0.4,
            width_px: 1920.0,
            height_px: 1080.0,
        }
    }
}

impl ScreenGeometry {
    /// Check that the geometry describes a usable screen.
    pub fn is_valid(&self) -> bool {
        self.origin_x_m.is_finite()
            && self.origin_y_m.is_finite()
            && self.width_m.is_finite()
            && self.height_m.is_finite()
            && self.width_m > 0.0
            && self.height_m > 0.0
            && self.width_px > 0.0
            && self.height_px > 0.0
    }

    /// Map a point on the screen plane from meters to pixels.
    ///
    /// The top-left corner maps to `(0, 0)`; the y axis flips because
    /// pixel rows grow downward. Points off the panel map to coordinates
    /// outside `[0, width_px] x [0, height_px]`; no clamping is applied.
    pub fn physical_to_pixel(&self, physical: [f64; 2]) -> [f64; 2] {
        let x = (physical[0] - self.origin_x_m) / self.width_m * self.width_px;
        let y = -((physical[1] - self.origin_y_m) / self.height_m) * self.height_px;
        [x, y]
    }

    /// Map a pixel coordinate back onto the screen plane in meters.
    ///
    /// Exact inverse of [`physical_to_pixel`](Self::physical_to_pixel).
    pub fn pixel_to_physical(&self, pixel: [f64; 2]) -> [f64; 2] {
        let x = self.origin_x_m + pixel[0] / self.width_px * self.width_m;
        let y = self.origin_y_m - pixel[1] / self.height_px * self.height_m;
        [x, y]
    }
}
