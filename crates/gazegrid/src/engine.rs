//! Tracking engine: orchestrates predictor, agent, and profile store.
//!
//! The engine owns one calibration session at a time. Collaborators are
//! injected at construction: a [`GazePredictor`] for inference, one
//! strategy from the agent family, and a [`ProfileStore`] for
//! persistence. All session state sits behind a single mutex; predictor
//! inference, the slow part of every operation, runs outside it so
//! concurrent calibration and prediction only serialize on the cheap map
//! updates and lookups.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::CalibrationAgent;
use crate::map::{CalibrationMap, CalibrationPoint};
use crate::predictor::{GazePredictor, PredictorError};
use crate::store::{ProfileRecord, ProfileStore, StoreError};

/// Why a request could not produce a screen point. These are expected
/// runtime conditions, not errors; callers recover by calibrating or by
/// waiting for the subject to reappear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The predictor found no subject in the frame.
    NoSubjectDetected,
    /// The strategy has no calibration state to resolve against.
    EmptyCalibrationMap,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::NoSubjectDetected => write!(f, "no subject detected"),
            UndefinedReason::EmptyCalibrationMap => write!(f, "calibration map empty"),
        }
    }
}

/// Outcome of a prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    /// Resolved point of regard in screen pixels.
    Point([f64; 2]),
    /// No point could be resolved; see the reason.
    Undefined(UndefinedReason),
}

/// Outcome of a single calibration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStepOutcome {
    /// The correspondence was appended to the calibration map.
    Appended,
    /// The predictor found no subject; the map is unchanged.
    NoSubject,
}

/// One target/frame pair of a calibration batch.
#[derive(Debug, Clone)]
pub struct CalibrationTarget {
    /// On-screen target the subject fixated, in pixels.
    pub target: [f64; 2],
    /// Frame captured during the fixation.
    pub frame: GrayImage,
}

/// A calibration point that produced no map entry.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationFailure {
    /// Position of the point in the submitted batch.
    pub index: usize,
    /// The on-screen target of the failed point.
    pub target: [f64; 2],
    /// Human-readable failure cause.
    pub reason: String,
}

/// Summary of a calibration batch.
///
/// A batch never aborts early: every point is attempted, failures are
/// recorded here, and successful points land in the map in submission
/// order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CalibrationReport {
    /// Points appended to the calibration map.
    pub appended: usize,
    /// Points skipped because no subject was visible.
    pub no_subject: usize,
    /// Points skipped because the step itself failed.
    pub failures: Vec<CalibrationFailure>,
}

impl CalibrationReport {
    /// Total number of points attempted.
    pub fn attempted(&self) -> usize {
        self.appended + self.no_subject + self.failures.len()
    }
}

/// Engine-level failure. Prediction outcomes like a missing subject are
/// not errors; see [`Prediction::Undefined`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The gaze predictor failed.
    #[error(transparent)]
    Predictor(#[from] PredictorError),
    /// The profile store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Session {
    agent: Box<dyn CalibrationAgent>,
    bound_profile: Option<i64>,
}

/// Facade over one tracking session.
///
/// Construct it per subject or per screen; there is no process-wide
/// instance. The engine is `Send + Sync` and all methods take `&self`,
/// so one engine can be shared across threads behind an `Arc`.
pub struct TrackingEngine {
    predictor: Arc<dyn GazePredictor>,
    store: Arc<dyn ProfileStore>,
    session: Mutex<Session>,
}

impl TrackingEngine {
    /// Create an engine from its three collaborators. The session starts
    /// with an empty calibration map, bound to no stored profile.
    pub fn new(
        predictor: Arc<dyn GazePredictor>,
        agent: Box<dyn CalibrationAgent>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            predictor,
            store,
            session: Mutex::new(Session {
                agent,
                bound_profile: None,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("engine session lock poisoned")
    }

    /// Run one calibration step: predict the gaze signal on `frame` and
    /// record it against the known on-screen `target`.
    ///
    /// A frame without a subject leaves the map untouched and reports
    /// [`CalibrationStepOutcome::NoSubject`]; predictor failures
    /// propagate as errors.
    pub fn run_single_calibration_step(
        &self,
        target: [f64; 2],
        frame: &GrayImage,
    ) -> Result<CalibrationStepOutcome, EngineError> {
        let observation = match self.predictor.predict_gaze(frame)? {
            Some(observation) => observation,
            None => {
                tracing::debug!(point = ?target, "no subject in calibration frame");
                return Ok(CalibrationStepOutcome::NoSubject);
            }
        };

        let point = CalibrationPoint {
            monitor_x: target[0],
            monitor_y: target[1],
            head_x: observation.head_x,
            head_y: observation.head_y,
            theta: observation.theta,
            phi: observation.phi,
        };
        let mut session = self.session();
        session.agent.calibration_step(point);
        tracing::debug!(
            point = ?target,
            points = session.agent.map().len(),
            "recorded calibration point"
        );
        Ok(CalibrationStepOutcome::Appended)
    }

    /// Run a whole calibration batch, one step per entry.
    ///
    /// Failed points are logged, counted, and skipped; the batch always
    /// runs to the end and surviving points keep their submission order.
    pub fn run_calibration_steps(&self, targets: &[CalibrationTarget]) -> CalibrationReport {
        let mut report = CalibrationReport::default();
        for (index, entry) in targets.iter().enumerate() {
            match self.run_single_calibration_step(entry.target, &entry.frame) {
                Ok(CalibrationStepOutcome::Appended) => report.appended += 1,
                Ok(CalibrationStepOutcome::NoSubject) => report.no_subject += 1,
                Err(error) => {
                    tracing::warn!(
                        index,
                        point = ?entry.target,
                        %error,
                        "calibration step failed, skipping point"
                    );
                    report.failures.push(CalibrationFailure {
                        index,
                        target: entry.target,
                        reason: error.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            appended = report.appended,
            no_subject = report.no_subject,
            failed = report.failures.len(),
            "calibration batch complete"
        );
        report
    }

    /// Predict where on the screen the subject in `frame` is looking.
    ///
    /// Missing subject and missing calibration are reported as
    /// [`Prediction::Undefined`] outcomes; only predictor or store
    /// failures surface as errors.
    pub fn predict_gaze_position(&self, frame: &GrayImage) -> Result<Prediction, EngineError> {
        let observation = match self.predictor.predict_gaze(frame)? {
            Some(observation) => observation,
            None => return Ok(Prediction::Undefined(UndefinedReason::NoSubjectDetected)),
        };

        let session = self.session();
        match session.agent.point_of_regard(&observation) {
            Some(point) => Ok(Prediction::Point(point)),
            None => Ok(Prediction::Undefined(UndefinedReason::EmptyCalibrationMap)),
        }
    }

    /// Persist the current calibration map under `name` and bind the
    /// session to the stored profile. Returns the profile id.
    pub fn save_profile(&self, name: &str) -> Result<i64, EngineError> {
        let mut session = self.session();
        let id = self.store.save(name, session.agent.map())?;
        session.bound_profile = Some(id);
        tracing::info!(
            id,
            name,
            points = session.agent.map().len(),
            "saved calibration profile"
        );
        Ok(id)
    }

    /// Replace the session's calibration state with the profile stored
    /// under `id` and bind the session to it.
    ///
    /// An unknown id follows the store contract and installs an empty
    /// map; predictions then report an empty calibration map until the
    /// session is recalibrated.
    pub fn load_profile(&self, id: i64) -> Result<(), EngineError> {
        let mut session = self.session();
        let map = self.store.load(id)?;
        let points = map.len();
        session.agent.replace_map(map);
        session.bound_profile = Some(id);
        tracing::info!(id, points, "loaded calibration profile");
        Ok(())
    }

    /// Discard the in-session calibration map and profile binding.
    /// Stored profiles are not touched.
    pub fn reset_profile(&self) {
        let mut session = self.session();
        session.agent.replace_map(CalibrationMap::new());
        session.bound_profile = None;
        tracing::info!("reset calibration session");
    }

    /// Enumerate stored profiles.
    pub fn list_profiles(&self) -> Result<Vec<ProfileRecord>, EngineError> {
        Ok(self.store.list()?)
    }

    /// Delete the profile stored under `id`; unknown ids are a no-op.
    /// A session bound to the deleted profile keeps its map but loses
    /// the binding.
    pub fn delete_profile(&self, id: i64) -> Result<(), EngineError> {
        self.store.delete(id)?;
        let mut session = self.session();
        if session.bound_profile == Some(id) {
            session.bound_profile = None;
        }
        tracing::info!(id, "deleted calibration profile");
        Ok(())
    }

    /// Id of the stored profile this session is bound to, if any.
    pub fn bound_profile(&self) -> Option<i64> {
        self.session().bound_profile
    }

    /// Number of points in the session's calibration map.
    pub fn calibration_point_count(&self) -> usize {
        self.session().agent.map().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use approx::assert_relative_eq;

    use crate::agent::AgentConfig;
    use crate::predictor::GazeObservation;
    use crate::store::MemoryProfileStore;

    type ScriptEntry = Result<Option<GazeObservation>, PredictorError>;

    /// Predictor that replays a fixed script, then reports no subject.
    struct ScriptedPredictor {
        script: Mutex<VecDeque<ScriptEntry>>,
    }

    impl ScriptedPredictor {
        fn new(script: Vec<ScriptEntry>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl GazePredictor for ScriptedPredictor {
        fn predict_gaze(
            &self,
            _frame: &GrayImage,
        ) -> Result<Option<GazeObservation>, PredictorError> {
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    fn obs(theta: f64, phi: f64) -> GazeObservation {
        GazeObservation {
            head_x: 0.0,
            head_y: 0.0,
            theta,
            phi,
        }
    }

    fn frame() -> GrayImage {
        GrayImage::new(4, 4)
    }

    fn engine_with(script: Vec<ScriptEntry>) -> (TrackingEngine, Arc<MemoryProfileStore>) {
        let store = Arc::new(MemoryProfileStore::new());
        let engine = TrackingEngine::new(
            Arc::new(ScriptedPredictor::new(script)),
            AgentConfig::Naive.build(),
            store.clone(),
        );
        (engine, store)
    }

    #[test]
    fn step_without_subject_leaves_map_untouched() {
        let (engine, _) = engine_with(vec![Ok(None)]);
        let outcome = engine
            .run_single_calibration_step([100.0, 100.0], &frame())
            .unwrap();
        assert_eq!(outcome, CalibrationStepOutcome::NoSubject);
        assert_eq!(engine.calibration_point_count(), 0);
    }

    #[test]
    fn prediction_without_subject_is_undefined_even_when_calibrated() {
        let (engine, _) = engine_with(vec![Ok(Some(obs(0.0, 0.0))), Ok(None)]);
        engine
            .run_single_calibration_step([100.0, 100.0], &frame())
            .unwrap();

        let prediction = engine.predict_gaze_position(&frame()).unwrap();
        assert_eq!(
            prediction,
            Prediction::Undefined(UndefinedReason::NoSubjectDetected)
        );
    }

    #[test]
    fn prediction_with_empty_map_is_undefined() {
        let (engine, _) = engine_with(vec![Ok(Some(obs(1.0, 1.0)))]);
        let prediction = engine.predict_gaze_position(&frame()).unwrap();
        assert_eq!(
            prediction,
            Prediction::Undefined(UndefinedReason::EmptyCalibrationMap)
        );
    }

    #[test]
    fn prediction_resolves_after_calibration() {
        let (engine, _) = engine_with(vec![
            Ok(Some(obs(0.0, 0.0))),
            Ok(Some(obs(2.0, 2.0))),
            Ok(Some(obs(1.0, 1.0))),
        ]);
        engine
            .run_single_calibration_step([100.0, 1000.0], &frame())
            .unwrap();
        engine
            .run_single_calibration_step([300.0, 3000.0], &frame())
            .unwrap();

        match engine.predict_gaze_position(&frame()).unwrap() {
            Prediction::Point([x, y]) => {
                assert_relative_eq!(x, 200.0, epsilon = 1e-6);
                assert_relative_eq!(y, 2000.0, epsilon = 1e-6);
            }
            other => panic!("expected a point, got {other:?}"),
        }
    }

    #[test]
    fn predictor_failure_propagates_from_prediction() {
        let (engine, _) = engine_with(vec![Err(PredictorError::Backend("model crashed".into()))]);
        let err = engine.predict_gaze_position(&frame()).unwrap_err();
        assert!(matches!(err, EngineError::Predictor(_)));
    }

    #[test]
    fn batch_skips_failures_and_preserves_order() {
        let (engine, store) = engine_with(vec![
            Ok(Some(obs(0.0, 0.0))),
            Err(PredictorError::Backend("model crashed".into())),
            Ok(None),
            Ok(Some(obs(2.0, 2.0))),
        ]);
        let targets = vec![
            CalibrationTarget {
                target: [100.0, 1000.0],
                frame: frame(),
            },
            CalibrationTarget {
                target: [999.0, 999.0],
                frame: frame(),
            },
            CalibrationTarget {
                target: [555.0, 555.0],
                frame: frame(),
            },
            CalibrationTarget {
                target: [300.0, 3000.0],
                frame: frame(),
            },
        ];

        let report = engine.run_calibration_steps(&targets);
        assert_eq!(report.appended, 2);
        assert_eq!(report.no_subject, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].target, [999.0, 999.0]);
        assert_eq!(report.attempted(), 4);

        // Surviving points keep submission order.
        let id = engine.save_profile("batch").unwrap();
        let map = store.load(id).unwrap();
        assert_eq!(map.monitor_x(), &[100.0, 300.0]);
        assert_eq!(map.monitor_y(), &[1000.0, 3000.0]);
    }

    #[test]
    fn report_serializes_with_failure_details() {
        let (engine, _) = engine_with(vec![
            Ok(Some(obs(0.0, 0.0))),
            Err(PredictorError::Backend("model crashed".into())),
            Ok(None),
        ]);
        let targets = vec![
            CalibrationTarget {
                target: [100.0, 1000.0],
                frame: frame(),
            },
            CalibrationTarget {
                target: [999.0, 999.0],
                frame: frame(),
            },
            CalibrationTarget {
                target: [555.0, 555.0],
                frame: frame(),
            },
        ];

        let report = engine.run_calibration_steps(&targets);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["appended"], 1);
        assert_eq!(value["no_subject"], 1);
        assert_eq!(value["failures"][0]["index"], 1);
        assert_eq!(
            value["failures"][0]["target"],
            serde_json::json!([999.0, 999.0])
        );
        assert!(value["failures"][0]["reason"]
            .as_str()
            .unwrap()
            .contains("model crashed"));
    }

    #[test]
    fn profile_round_trip_restores_predictions() {
        let (engine, _) = engine_with(vec![
            Ok(Some(obs(0.0, 0.0))),
            Ok(Some(obs(2.0, 2.0))),
            Ok(Some(obs(1.0, 1.0))),
            Ok(Some(obs(1.0, 1.0))),
            Ok(Some(obs(1.0, 1.0))),
        ]);
        engine
            .run_single_calibration_step([100.0, 1000.0], &frame())
            .unwrap();
        engine
            .run_single_calibration_step([300.0, 3000.0], &frame())
            .unwrap();

        let id = engine.save_profile("subject").unwrap();
        assert_eq!(engine.bound_profile(), Some(id));

        engine.reset_profile();
        assert_eq!(engine.bound_profile(), None);
        assert_eq!(engine.calibration_point_count(), 0);
        assert_eq!(
            engine.predict_gaze_position(&frame()).unwrap(),
            Prediction::Undefined(UndefinedReason::EmptyCalibrationMap)
        );

        engine.load_profile(id).unwrap();
        assert_eq!(engine.bound_profile(), Some(id));
        assert_eq!(engine.calibration_point_count(), 2);
        match engine.predict_gaze_position(&frame()).unwrap() {
            Prediction::Point([x, y]) => {
                assert_relative_eq!(x, 200.0, epsilon = 1e-6);
                assert_relative_eq!(y, 2000.0, epsilon = 1e-6);
            }
            other => panic!("expected a point, got {other:?}"),
        }
    }

    #[test]
    fn loading_unknown_profile_installs_empty_map() {
        let (engine, _) = engine_with(vec![Ok(Some(obs(0.0, 0.0))), Ok(Some(obs(1.0, 1.0)))]);
        engine
            .run_single_calibration_step([100.0, 100.0], &frame())
            .unwrap();

        engine.load_profile(12345).unwrap();
        assert_eq!(engine.calibration_point_count(), 0);
        assert_eq!(engine.bound_profile(), Some(12345));
        assert_eq!(
            engine.predict_gaze_position(&frame()).unwrap(),
            Prediction::Undefined(UndefinedReason::EmptyCalibrationMap)
        );
    }

    #[test]
    fn deleting_bound_profile_clears_binding() {
        let (engine, store) = engine_with(vec![Ok(Some(obs(0.0, 0.0)))]);
        engine
            .run_single_calibration_step([100.0, 100.0], &frame())
            .unwrap();
        let id = engine.save_profile("doomed").unwrap();

        engine.delete_profile(id).unwrap();
        assert_eq!(engine.bound_profile(), None);
        assert!(store.list().unwrap().is_empty());
        // The in-session map is kept.
        assert_eq!(engine.calibration_point_count(), 1);
    }

    #[test]
    fn listing_sees_profiles_from_other_sessions() {
        let (engine, store) = engine_with(vec![]);
        store
            .save("someone-else", &CalibrationMap::new())
            .unwrap();

        let records = engine.list_profiles().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "someone-else");
    }
}
