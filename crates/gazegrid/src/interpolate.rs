//! Inverse-distance-weighted interpolation over calibration anchors.
//!
//! Both estimators form a weighted average of anchor screen coordinates,
//! with weights `1 / (distance + EPSILON)`. The epsilon keeps an exact
//! anchor match finite instead of dividing by zero, at the cost of the
//! result landing near (not exactly on) the anchor. Queries outside the
//! anchor span extrapolate with the same weighting and degrade smoothly.

/// Guard added to every distance before inversion.
pub const EPSILON: f64 = 1e-6;

/// Interpolate a screen coordinate from gaze angle alone.
///
/// `anchor_angles[i]` and `anchor_coords[i]` describe the same calibration
/// point. Returns `None` when there are no anchors; interpolation over an
/// empty set has no meaningful value.
pub fn idw_1d(angle: f64, anchor_angles: &[f64], anchor_coords: &[f64]) -> Option<f64> {
    debug_assert_eq!(anchor_angles.len(), anchor_coords.len());
    if anchor_angles.is_empty() {
        return None;
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (&a, &coord) in anchor_angles.iter().zip(anchor_coords) {
        let weight = 1.0 / ((angle - a).abs() + EPSILON);
        weighted_sum += weight * coord;
        weight_total += weight;
    }
    Some(weighted_sum / weight_total)
}

/// Interpolate a screen coordinate from gaze angle and head position
/// jointly.
///
/// The distance is Euclidean in the (position, angle) plane, so anchors
/// captured from a different head position count as farther away even at
/// an identical angle. The two quantities are deliberately unnormalized;
/// their native scales set the relative influence. Returns `None` when
/// there are no anchors.
pub fn idw_2d(
    position: f64,
    angle: f64,
    anchor_positions: &[f64],
    anchor_angles: &[f64],
    anchor_coords: &[f64],
) -> Option<f64> {
    debug_assert_eq!(anchor_positions.len(), anchor_coords.len());
    debug_assert_eq!(anchor_angles.len(), anchor_coords.len());
    if anchor_coords.is_empty() {
        return None;
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for ((&p, &a), &coord) in anchor_positions.iter().zip(anchor_angles).zip(anchor_coords) {
        let distance = ((position - p).powi(2) + (angle - a).powi(2)).sqrt();
        let weight = 1.0 / (distance + EPSILON);
        weighted_sum += weight * coord;
        weight_total += weight;
    }
    Some(weighted_sum / weight_total)
}
