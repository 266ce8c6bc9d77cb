//! Vorsight - On-device compute engine for VOR rehabilitation metrics
//!
//! Vorsight turns a noisy stream of eye/head tracker frames into calibrated
//! screen-space gaze points and clinical vestibulo-ocular-reflex metrics
//! through a deterministic per-frame pipeline: tracker adaptation →
//! calibration mapping → gaze filtering → kinematics derivation → exercise
//! scheduling → session recording.
//!
//! ## Modules
//!
//! - **Calibration**: map raw gaze vectors to screen coordinates from a
//!   user-collected point grid, with a fixed-scale fallback before
//!   calibration completes
//! - **Kinematics**: head angle, head/eye velocities, VOR gain, saccade
//!   detection, reflex latency pairing, and fixation stability
//! - **Exercise**: target trajectory generation, on-target scoring, and the
//!   session state machine
//! - **Recorder**: per-frame metric rows and CSV export

pub mod adapters;
pub mod calibration;
pub mod config;
pub mod error;
pub mod exercise;
pub mod filter;
pub mod kinematics;
pub mod levels;
pub mod pipeline;
pub mod recorder;
pub mod schema;
pub mod types;

pub use calibration::CalibrationMapper;
pub use error::ComputeError;
pub use exercise::{ExercisePhase, ExerciseScheduler};
pub use filter::GazeFilter;
pub use kinematics::KinematicsEngine;
pub use pipeline::{SessionContext, VorProcessor};
pub use recorder::{CsvExport, SessionRecorder};

// Schema exports
pub use schema::{RawFrame, SCHEMA_VERSION};

// Core type exports
pub use types::{GazeVector, MetricsSnapshot, ScreenPoint, SessionSummary, Viewport};

/// Vorsight version embedded in exported session metadata
pub const VORSIGHT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported session metadata
pub const PRODUCER_NAME: &str = "vorsight";
