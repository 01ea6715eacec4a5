//! gazegrid: calibration and gaze-to-screen mapping for eye tracking.
//!
//! Turns a raw gaze signal (head position estimate plus a pair of gaze
//! angles) into a point on a display surface, personalized per subject
//! through a short calibration procedure. The crate does no computer
//! vision of its own; frames go through an injected [`GazePredictor`]
//! and everything downstream is geometry and interpolation.
//!
//! # Architecture
//!
//! - [`map`]: append-only storage of target/observation correspondences.
//! - [`interpolate`]: inverse-distance-weighted estimators, the numeric
//!   core of the interpolating strategies.
//! - [`agent`]: the mapping strategy family. [`NaiveAgent`] interpolates
//!   from angles alone, [`InterpolationAgent`] adds head position to the
//!   distance metric, [`GeometricAgent`] intersects an explicit gaze ray
//!   with a configured [`ScreenGeometry`].
//! - [`engine`]: the [`TrackingEngine`] facade driving calibration,
//!   prediction, and profile management.
//! - [`store`]: durable calibration profiles, sqlite-backed or in-memory.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gazegrid::{
//!     AgentConfig, MemoryProfileStore, Prediction, SyntheticPredictor, TrackingEngine,
//! };
//! use image::GrayImage;
//!
//! # fn main() -> Result<(), gazegrid::EngineError> {
//! let engine = TrackingEngine::new(
//!     Arc::new(SyntheticPredictor::default()),
//!     AgentConfig::Interpolation.build(),
//!     Arc::new(MemoryProfileStore::new()),
//! );
//!
//! // Show a target, capture a frame, repeat over the calibration grid.
//! let frame = GrayImage::new(640, 480);
//! engine.run_single_calibration_step([960.0, 540.0], &frame)?;
//!
//! // Then resolve live frames to screen points.
//! match engine.predict_gaze_position(&frame)? {
//!     Prediction::Point([x, y]) => println!("looking at ({x:.0}, {y:.0})"),
//!     Prediction::Undefined(reason) => println!("no estimate: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod engine;
pub mod interpolate;
pub mod map;
pub mod predictor;
pub mod screen;
pub mod store;

pub use agent::{AgentConfig, CalibrationAgent, GeometricAgent, InterpolationAgent, NaiveAgent};
pub use engine::{
    CalibrationFailure, CalibrationReport, CalibrationStepOutcome, CalibrationTarget,
    EngineError, Prediction, TrackingEngine, UndefinedReason,
};
pub use map::{CalibrationMap, CalibrationPoint};
pub use predictor::{GazeObservation, GazePredictor, PredictorError, SyntheticPredictor};
pub use screen::ScreenGeometry;
pub use store::{
    MemoryProfileStore, ProfileRecord, ProfileStore, SqliteProfileStore, StoreError, StoreResult,
};
