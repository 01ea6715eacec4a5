//! Gaze predictor contract and a synthetic reference implementation.
//!
//! The engine treats the predictor as an opaque collaborator: frame in,
//! observation out. Anything that can estimate a head position and a pair
//! of gaze angles from a grayscale frame can sit behind [`GazePredictor`],
//! from a neural model to the deterministic [`SyntheticPredictor`] used in
//! demos and tests.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single gaze measurement.
///
/// An observation is all-or-nothing: either every field is populated or
/// the predictor reports no subject at all. A partially populated
/// observation never exists. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeObservation {
    /// Estimated head center x, in the predictor's frame.
    pub head_x: f64,
    /// Estimated head center y, in the predictor's frame.
    pub head_y: f64,
    /// Horizontal gaze angle in degrees.
    pub theta: f64,
    /// Vertical gaze angle in degrees.
    pub phi: f64,
}

/// Failure of the prediction backend itself.
///
/// A frame with no detectable subject is not an error; predictors report
/// that as `Ok(None)`.
#[derive(Debug, Error)]
pub enum PredictorError {
    /// The frame has a zero dimension and cannot carry a subject.
    #[error("malformed frame: {width}x{height}")]
    MalformedFrame {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },
    /// The inference backend failed.
    #[error("predictor backend failure: {0}")]
    Backend(String),
}

/// Estimates the gaze signal on a single frame.
pub trait GazePredictor: Send + Sync {
    /// Run prediction on `frame`.
    ///
    /// `Ok(None)` means no subject was detected, which callers handle as a
    /// recoverable outcome. `Err` is reserved for malformed input or a
    /// failing backend.
    fn predict_gaze(&self, frame: &GrayImage) -> Result<Option<GazeObservation>, PredictorError>;
}

/// Deterministic stand-in for a learned gaze model.
///
/// Treats the darkest region of the frame as the subject: the centroid of
/// all pixels at or below `dark_threshold` becomes the head estimate, and
/// the centroid's offset from the frame center maps linearly to gaze
/// angles in `[-angle_span_deg, angle_span_deg]`. A frame with no dark
/// pixels has no subject. Head positions are reported in image pixels, so
/// pair this predictor with the interpolating strategies rather than the
/// geometric one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyntheticPredictor {
    /// Luma at or below this value counts as subject pixels.
    pub dark_threshold: u8,
    /// Angle magnitude mapped to a centroid at the frame edge, degrees.
    pub angle_span_deg: f64,
}

impl Default for SyntheticPredictor {
    fn default() -> Self {
        Self {
            dark_threshold: 60,
            angle_span_deg: 45.0,
        }
    }
}

impl GazePredictor for SyntheticPredictor {
    fn predict_gaze(&self, frame: &GrayImage) -> Result<Option<GazeObservation>, PredictorError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(PredictorError::MalformedFrame { width, height });
        }

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut count = 0usize;
        for (x, y, pixel) in frame.enumerate_pixels() {
            if pixel[0] <= self.dark_threshold {
                sum_x += x as f64;
                sum_y += y as f64;
                count += 1;
            }
        }
        if count == 0 {
            return Ok(None);
        }

        let head_x = sum_x / count as f64;
        let head_y = sum_y / count as f64;
        let theta = (head_x / width as f64 - 0.5) * 2.0 * self.angle_span_deg;
        let phi = (head_y / height as f64 - 0.5) * 2.0 * self.angle_span_deg;
        Ok(Some(GazeObservation {
            head_x,
            head_y,
            theta,
            phi,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn frame_with_dark_square(
        width: u32,
        height: u32,
        corner: (u32, u32),
        side: u32,
    ) -> GrayImage {
        let mut frame = GrayImage::from_pixel(width, height, Luma([255u8]));
        for dy in 0..side {
            for dx in 0..side {
                frame.put_pixel(corner.0 + dx, corner.1 + dy, Luma([0u8]));
            }
        }
        frame
    }

    #[test]
    fn blank_frame_has_no_subject() {
        let predictor = SyntheticPredictor::default();
        let frame = GrayImage::from_pixel(64, 48, Luma([255u8]));
        assert!(predictor.predict_gaze(&frame).unwrap().is_none());
    }

    #[test]
    fn dark_blob_centroid_becomes_head_estimate() {
        let predictor = SyntheticPredictor::default();
        let frame = frame_with_dark_square(100, 100, (10, 40), 3);
        let obs = predictor.predict_gaze(&frame).unwrap().unwrap();

        assert_relative_eq!(obs.head_x, 11.0);
        assert_relative_eq!(obs.head_y, 41.0);
        // Left of center means a negative horizontal angle.
        assert!(obs.theta < 0.0);
        assert_relative_eq!(obs.theta, (11.0 / 100.0 - 0.5) * 90.0, epsilon = 1e-9);
    }

    #[test]
    fn centered_blob_has_near_zero_angles() {
        let predictor = SyntheticPredictor::default();
        // A 2x2 blob whose centroid is exactly the frame center of a
        // 100x100 image at (49.5, 49.5).
        let frame = frame_with_dark_square(100, 100, (49, 49), 2);
        let obs = predictor.predict_gaze(&frame).unwrap().unwrap();
        assert_relative_eq!(obs.theta, -0.45, epsilon = 1e-9);
        assert_relative_eq!(obs.phi, -0.45, epsilon = 1e-9);
    }

    #[test]
    fn zero_sized_frame_is_malformed() {
        let predictor = SyntheticPredictor::default();
        let frame = GrayImage::new(0, 0);
        assert!(matches!(
            predictor.predict_gaze(&frame),
            Err(PredictorError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn repeated_prediction_is_deterministic() {
        let predictor = SyntheticPredictor::default();
        let frame = frame_with_dark_square(64, 64, (5, 5), 4);
        let first = predictor.predict_gaze(&frame).unwrap().unwrap();
        let second = predictor.predict_gaze(&frame).unwrap().unwrap();
        assert_eq!(first, second);
    }
}
