//! Calibration sample storage.
//!
//! A [`CalibrationMap`] records correspondences between known on-screen
//! targets and the gaze signal observed while the subject fixated them.
//! The map is append-only: entries are never edited, deduplicated or
//! reordered, so index `i` refers to the same calibration event in every
//! column. Repeated captures of the same target simply add weight near
//! that target during interpolation.

use serde::{Deserialize, Serialize};

/// One recorded correspondence between an on-screen target and the gaze
/// signal observed while the subject fixated it.
///
/// `monitor_*` are screen pixels; `head_*` are in the predictor's frame;
/// angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Target x on the screen, in pixels.
    pub monitor_x: f64,
    /// Target y on the screen, in pixels.
    pub monitor_y: f64,
    /// Estimated head center x at capture time.
    pub head_x: f64,
    /// Estimated head center y at capture time.
    pub head_y: f64,
    /// Horizontal gaze angle in degrees.
    pub theta: f64,
    /// Vertical gaze angle in degrees.
    pub phi: f64,
}

/// Append-only store of [`CalibrationPoint`]s, kept as parallel columns.
///
/// The columnar layout keeps the interpolation inner loops free of
/// per-point indirection. Columns are private so the one structural
/// invariant (all six have equal length at all times) cannot be broken
/// from outside; [`push`](Self::push) is the only mutator besides
/// wholesale replacement. Deserialization validates the same invariant,
/// so a persisted payload with ragged columns is an error, not a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationMap {
    monitor_x: Vec<f64>,
    monitor_y: Vec<f64>,
    head_x: Vec<f64>,
    head_y: Vec<f64>,
    theta: Vec<f64>,
    phi: Vec<f64>,
}

impl CalibrationMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one calibration point to every column.
    pub fn push(&mut self, point: CalibrationPoint) {
        self.monitor_x.push(point.monitor_x);
        self.monitor_y.push(point.monitor_y);
        self.head_x.push(point.head_x);
        self.head_y.push(point.head_y);
        self.theta.push(point.theta);
        self.phi.push(point.phi);
    }

    /// Number of recorded calibration points.
    pub fn len(&self) -> usize {
        self.monitor_x.len()
    }

    /// True when no calibration points have been recorded.
    pub fn is_empty(&self) -> bool {
        self.monitor_x.is_empty()
    }

    /// Target x column, in screen pixels.
    pub fn monitor_x(&self) -> &[f64] {
        &self.monitor_x
    }

    /// Target y column, in screen pixels.
    pub fn monitor_y(&self) -> &[f64] {
        &self.monitor_y
    }

    /// Head center x column.
    pub fn head_x(&self) -> &[f64] {
        &self.head_x
    }

    /// Head center y column.
    pub fn head_y(&self) -> &[f64] {
        &self.head_y
    }

    /// Horizontal gaze angle column, degrees.
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    /// Vertical gaze angle column, degrees.
    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    /// Iterate over the recorded points in insertion order.
    pub fn points(&self) -> impl Iterator<Item = CalibrationPoint> + '_ {
        (0..self.len()).map(move |i| CalibrationPoint {
            monitor_x: self.monitor_x[i],
            monitor_y: self.monitor_y[i],
            head_x: self.head_x[i],
            head_y: self.head_y[i],
            theta: self.theta[i],
            phi: self.phi[i],
        })
    }
}

/// Serialized shape of a [`CalibrationMap`], lengths not yet checked.
#[derive(Deserialize)]
struct RawColumns {
    monitor_x: Vec<f64>,
    monitor_y: Vec<f64>,
    head_x: Vec<f64>,
    head_y: Vec<f64>,
    theta: Vec<f64>,
    phi: Vec<f64>,
}

impl<'de> Deserialize<'de> for CalibrationMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawColumns::deserialize(deserializer)?;
        validate_columns(&raw).map_err(serde::de::Error::custom)?;
        Ok(Self {
            monitor_x: raw.monitor_x,
            monitor_y: raw.monitor_y,
            head_x: raw.head_x,
            head_y: raw.head_y,
            theta: raw.theta,
            phi: raw.phi,
        })
    }
}

fn validate_columns(raw: &RawColumns) -> Result<(), String> {
    let len = raw.monitor_x.len();
    let parallel = raw.monitor_y.len() == len
        && raw.head_x.len() == len
        && raw.head_y.len() == len
        && raw.theta.len() == len
        && raw.phi.len() == len;
    if !parallel {
        return Err(format!(
            "calibration map columns must have equal lengths \
             (monitor_x {}, monitor_y {}, head_x {}, head_y {}, theta {}, phi {})",
            len,
            raw.monitor_y.len(),
            raw.head_x.len(),
            raw.head_y.len(),
            raw.theta.len(),
            raw.phi.len(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(
        monitor_x: f64,
        monitor_y: f64,
        head_x: f64,
        head_y: f64,
        theta: f64,
        phi: f64,
    ) -> CalibrationPoint {
        CalibrationPoint {
            monitor_x,
            monitor_y,
            head_x,
            head_y,
            theta,
            phi,
        }
    }

    #[test]
    fn push_appends_to_every_column_in_order() {
        let mut map = CalibrationMap::new();
        map.push(point(100.0, 200.0, 50.0, 55.0, 30.0, 45.0));
        map.push(point(200.0, 5000.0, 99.0, 91.0, 120.0, 55.0));
        map.push(point(1.0, 1.0, 1.0, 1.0, 1.0, 1.0));

        assert_eq!(map.len(), 3);
        assert_eq!(map.monitor_x(), &[100.0, 200.0, 1.0]);
        assert_eq!(map.monitor_y(), &[200.0, 5000.0, 1.0]);
        assert_eq!(map.head_x(), &[50.0, 99.0, 1.0]);
        assert_eq!(map.head_y(), &[55.0, 91.0, 1.0]);
        assert_eq!(map.theta(), &[30.0, 120.0, 1.0]);
        assert_eq!(map.phi(), &[45.0, 55.0, 1.0]);
    }

    #[test]
    fn columns_stay_parallel() {
        let mut map = CalibrationMap::new();
        for i in 0..7 {
            map.push(point(i as f64, 0.0, 0.0, 0.0, 0.0, 0.0));
        }
        assert_eq!(map.monitor_y().len(), map.len());
        assert_eq!(map.head_x().len(), map.len());
        assert_eq!(map.head_y().len(), map.len());
        assert_eq!(map.theta().len(), map.len());
        assert_eq!(map.phi().len(), map.len());
    }

    #[test]
    fn points_iterates_in_insertion_order() {
        let mut map = CalibrationMap::new();
        let a = point(10.0, 20.0, 1.0, 2.0, 3.0, 4.0);
        let b = point(30.0, 40.0, 5.0, 6.0, 7.0, 8.0);
        map.push(a);
        map.push(b);

        let collected: Vec<_> = map.points().collect();
        assert_eq!(collected, vec![a, b]);
    }

    #[test]
    fn empty_map_has_no_points() {
        let map = CalibrationMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.points().count(), 0);
    }

    #[test]
    fn serialized_maps_restore_losslessly() {
        let mut map = CalibrationMap::new();
        map.push(point(100.0, 200.0, 50.0, 55.0, 30.0, 45.0));
        map.push(point(200.0, 5000.0, 99.0, 91.0, 120.0, 55.0));

        let payload = serde_json::to_string(&map).unwrap();
        let restored: CalibrationMap = serde_json::from_str(&payload).unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn deserialize_rejects_ragged_columns() {
        let payload = r#"{
            "monitor_x": [1.0, 9.0],
            "monitor_y": [2.0, 8.0],
            "head_x": [3.0, 7.0],
            "head_y": [4.0, 6.0],
            "theta": [],
            "phi": [5.0, 5.0]
        }"#;
        let err = serde_json::from_str::<CalibrationMap>(payload).unwrap_err();
        assert!(err.to_string().contains("equal lengths"));
    }
}
