//! Pipeline orchestration
//!
//! This module provides the public API for Vorsight. Each incoming tracker
//! sample drives one complete pass in a fixed order (calibration mapping →
//! gaze filtering → kinematics → exercise scheduling → session recording)
//! before the next sample is accepted, so metrics for sample *n* always see
//! state as of sample *n−1* and no component's state is re-entered
//! mid-update.

use crate::adapters::TrackerAdapter;
use crate::calibration::CalibrationMapper;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::exercise::{ExercisePhase, ExerciseScheduler};
use crate::filter::GazeFilter;
use crate::kinematics::KinematicsEngine;
use crate::recorder::{CsvExport, SessionRecorder};
use crate::schema::RawFrame;
use crate::types::{
    GazeInput, GazeVector, MetricsSnapshot, PrecisionReport, ScreenPoint, SessionSummary,
    TrackerSample, Viewport,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit session-wide context, passed state instead of ambient globals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Unique id of this processor instance
    pub session_id: String,
    /// Screen dimensions the session maps into
    pub viewport: Viewport,
    /// Whether a calibration pass has been finished
    pub calibrated: bool,
    /// Frames processed so far
    pub frame_count: u64,
}

/// An in-progress calibration dwell for a single target
#[derive(Debug, Clone)]
struct CalibrationDwell {
    target: ScreenPoint,
    samples: Vec<GazeVector>,
    started_at: Option<f64>,
    last_seen_at: Option<f64>,
}

/// Stateful processor driving the full per-frame pipeline
///
/// Owns every component exclusively; single-threaded and tick-driven, with
/// suspension only between frames.
pub struct VorProcessor {
    config: EngineConfig,
    context: SessionContext,
    mapper: CalibrationMapper,
    filter: GazeFilter,
    kinematics: KinematicsEngine,
    scheduler: ExerciseScheduler,
    recorder: SessionRecorder,
    dwell: Option<CalibrationDwell>,
    last_snapshot: Option<MetricsSnapshot>,
}

impl Default for VorProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl VorProcessor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            context: SessionContext {
                session_id: Uuid::new_v4().to_string(),
                viewport: config.viewport,
                calibrated: false,
                frame_count: 0,
            },
            mapper: CalibrationMapper::new(config.viewport, config.calibration),
            filter: GazeFilter::new(config.filter),
            kinematics: KinematicsEngine::new(config.kinematics),
            scheduler: ExerciseScheduler::new(config.viewport, config.scoring),
            recorder: SessionRecorder::new(),
            dwell: None,
            last_snapshot: None,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Per-frame pipeline
    // ------------------------------------------------------------------

    /// Adapt and process one raw frame
    pub fn process_raw(
        &mut self,
        adapter: &dyn TrackerAdapter,
        frame: &RawFrame,
    ) -> Result<MetricsSnapshot, ComputeError> {
        let sample = adapter.adapt(frame)?;
        self.process_sample(sample)
    }

    /// Drive one complete pipeline pass for an adapted sample
    ///
    /// A frame whose derived metrics degrade (missing landmarks, Δt = 0)
    /// still produces a snapshot; nothing a single frame carries can halt
    /// the stream.
    pub fn process_sample(
        &mut self,
        sample: TrackerSample,
    ) -> Result<MetricsSnapshot, ComputeError> {
        self.context.frame_count += 1;

        // Stage 1: resolve the observation to screen space, feeding any
        // in-progress calibration dwell with the raw vector
        let screen_point = match sample.gaze {
            GazeInput::Screen(point) => self.config.viewport.clamp(point),
            GazeInput::Vector(vector) => {
                if let Some(dwell) = &mut self.dwell {
                    dwell.samples.push(vector);
                    dwell.started_at.get_or_insert(sample.t);
                    dwell.last_seen_at = Some(sample.t);
                }
                self.mapper.map(vector)
            }
        };

        // Stage 2: smooth
        let smoothed = self.filter.filter(screen_point);

        // Stage 3: derive kinematics
        let kin = self
            .kinematics
            .update(smoothed, sample.t, sample.landmarks.as_ref());

        // Stage 4: advance the exercise
        let tick = self.scheduler.tick(Some(smoothed), sample.t);

        let snapshot = MetricsSnapshot {
            t: sample.t,
            gaze_x: smoothed.x,
            gaze_y: smoothed.y,
            head_angle: kin.head_angle,
            head_vel: kin.head_vel,
            eye_vel: kin.eye_vel,
            vor_gain: kin.vor_gain,
            latency_ms: kin.latency_ms,
            fixation_rms: kin.fixation_rms,
            saccade_count: kin.saccade_count,
            level: self.scheduler.level_id().filter(|_| self.scheduler.is_active()),
            on_target: tick.map(|t| t.on_target).unwrap_or(false),
        };

        // Stage 5: record while a session is running
        if tick.is_some() {
            self.recorder.record(snapshot.clone());
        }

        self.last_snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Calibration control surface
    // ------------------------------------------------------------------

    /// Begin a calibration pass, discarding any previous calibration
    pub fn start_calibration(&mut self) -> Result<(), ComputeError> {
        if self.scheduler.is_active() {
            return Err(ComputeError::InvalidState(
                "cannot calibrate while an exercise is active".to_string(),
            ));
        }
        self.mapper.clear();
        self.context.calibrated = false;
        self.dwell = None;
        Ok(())
    }

    /// Begin collecting a dwell for one fixation target
    ///
    /// Raw gaze vectors from subsequent frames accumulate until
    /// [`VorProcessor::record_calibration_point`] commits the point.
    pub fn start_calibration_point(&mut self, target: ScreenPoint) {
        self.dwell = Some(CalibrationDwell {
            target,
            samples: Vec::new(),
            started_at: None,
            last_seen_at: None,
        });
    }

    /// Commit the current dwell as a calibration point
    ///
    /// Requires the configured dwell duration and minimum sample count;
    /// the dwell is kept on failure so collection can simply continue.
    pub fn record_calibration_point(&mut self) -> Result<usize, ComputeError> {
        let dwell = self.dwell.as_ref().ok_or_else(|| {
            ComputeError::InvalidState("no calibration point in progress".to_string())
        })?;

        let elapsed = match (dwell.started_at, dwell.last_seen_at) {
            (Some(start), Some(end)) => end - start,
            _ => 0.0,
        };
        if elapsed < self.config.calibration.dwell_ms {
            return Err(ComputeError::InsufficientSamples(format!(
                "dwell lasted {elapsed:.0}ms, need {:.0}ms",
                self.config.calibration.dwell_ms
            )));
        }

        let dwell = self.dwell.take().ok_or_else(|| {
            ComputeError::InvalidState("no calibration point in progress".to_string())
        })?;
        match self.mapper.record_point(dwell.target, &dwell.samples) {
            Ok(()) => Ok(self.mapper.len()),
            Err(e) => {
                // Keep collecting into the same dwell rather than discarding
                self.dwell = Some(dwell);
                Err(e)
            }
        }
    }

    /// Finish the calibration pass and self-test its precision
    pub fn finish_calibration(&mut self) -> Result<PrecisionReport, ComputeError> {
        if self.mapper.is_empty() {
            return Err(ComputeError::InvalidState(
                "no calibration points recorded".to_string(),
            ));
        }
        self.dwell = None;
        self.context.calibrated = true;
        Ok(self.mapper.measure_precision(self.mapper.points()))
    }

    /// Load a previously saved calibration
    pub fn load_calibration(&mut self, json: &str) -> Result<(), ComputeError> {
        let mapper = CalibrationMapper::from_json(json)
            .map_err(|e| ComputeError::ParseError(e.to_string()))?;
        self.context.calibrated = mapper.is_interpolating();
        self.mapper = mapper;
        Ok(())
    }

    /// Save the current calibration to JSON
    pub fn save_calibration(&self) -> Result<String, ComputeError> {
        self.mapper
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Exercise control surface
    // ------------------------------------------------------------------

    /// Start an exercise at the given level
    ///
    /// Rejected while uncalibrated or while another session is active;
    /// kinematic state and the recorder reset on success.
    pub fn start_exercise(&mut self, level_id: u8) -> Result<(), ComputeError> {
        if !self.context.calibrated {
            return Err(ComputeError::InvalidState(
                "calibration must finish before an exercise starts".to_string(),
            ));
        }
        self.scheduler.start(level_id)?;
        self.kinematics.reset();
        self.recorder.clear();
        Ok(())
    }

    /// Freeze the exercise clock; gaze filtering continues for preview
    pub fn pause_exercise(&mut self) -> Result<(), ComputeError> {
        self.scheduler.pause()
    }

    /// Resume a paused exercise
    pub fn resume_exercise(&mut self) -> Result<(), ComputeError> {
        self.scheduler.resume()
    }

    /// Stop the exercise and return its results summary
    pub fn stop_exercise(&mut self) -> Result<SessionSummary, ComputeError> {
        self.scheduler.stop()
    }

    /// Scheduler phase, for UI state
    pub fn exercise_phase(&self) -> ExercisePhase {
        self.scheduler.phase()
    }

    /// Results summary of the current/last session, if any
    pub fn session_summary(&self) -> Option<SessionSummary> {
        self.scheduler.summary()
    }

    // ------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------

    /// Latest smoothed gaze point; `None` until the first frame
    pub fn current_gaze(&self) -> Option<ScreenPoint> {
        self.filter.current()
    }

    /// Latest metrics snapshot; `None` until the first frame
    pub fn current_metrics(&self) -> Option<&MetricsSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Rows recorded for the active/last session
    pub fn recorded_len(&self) -> usize {
        self.recorder.len()
    }

    /// Export the recorded session as CSV
    pub fn export_session(&self) -> Result<CsvExport, ComputeError> {
        self.recorder.export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::GRID_9;
    use pretty_assertions::assert_eq;

    fn vector_sample(x: f64, y: f64, t: f64) -> TrackerSample {
        TrackerSample {
            t,
            gaze: GazeInput::Vector(GazeVector::new(x, y)),
            landmarks: None,
        }
    }

    fn screen_sample(x: f64, y: f64, t: f64) -> TrackerSample {
        TrackerSample {
            t,
            gaze: GazeInput::Screen(ScreenPoint::new(x, y)),
            landmarks: None,
        }
    }

    fn processor() -> VorProcessor {
        VorProcessor::new(EngineConfig::for_viewport(1000.0, 1000.0))
    }

    /// Run a full 9-point calibration pass through the control surface
    fn calibrate(processor: &mut VorProcessor, t0: f64) -> f64 {
        processor.start_calibration().unwrap();
        let mut t = t0;
        for (fx, fy) in GRID_9 {
            let target = ScreenPoint::new(fx * 1000.0, fy * 1000.0);
            processor.start_calibration_point(target);
            let vector = GazeVector::new((fx - 0.5) * 2.0, (fy - 0.5) * 2.0);
            for _ in 0..20 {
                processor
                    .process_sample(vector_sample(vector.x, vector.y, t))
                    .unwrap();
                t += 100.0;
            }
            processor.record_calibration_point().unwrap();
        }
        let report = processor.finish_calibration().unwrap();
        assert_eq!(report.precision_pct, 100);
        t
    }

    #[test]
    fn test_uncalibrated_preview_uses_fallback() {
        let mut p = processor();
        let snapshot = p.process_sample(vector_sample(0.0, 0.0, 0.0)).unwrap();

        // Centered vector maps to screen center through the fallback
        assert_eq!(snapshot.gaze_x, 500.0);
        assert_eq!(snapshot.gaze_y, 500.0);
        assert_eq!(snapshot.level, None);
        assert!(!snapshot.on_target);
    }

    #[test]
    fn test_current_gaze_none_before_first_frame() {
        let p = processor();
        assert_eq!(p.current_gaze(), None);
        assert!(p.current_metrics().is_none());
    }

    #[test]
    fn test_calibration_pass_and_exercise_gate() {
        let mut p = processor();

        // Uncalibrated start is rejected without mutation
        let err = p.start_exercise(1).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidState(_)));
        assert_eq!(p.exercise_phase(), ExercisePhase::Idle);

        let t = calibrate(&mut p, 0.0);
        assert!(p.context().calibrated);

        p.start_exercise(1).unwrap();
        assert_eq!(p.exercise_phase(), ExercisePhase::Running);

        // Frames now record
        p.process_sample(vector_sample(0.0, 0.0, t)).unwrap();
        p.process_sample(vector_sample(0.0, 0.0, t + 100.0)).unwrap();
        assert_eq!(p.recorded_len(), 2);
    }

    #[test]
    fn test_dwell_too_short_is_rejected() {
        let mut p = processor();
        p.start_calibration().unwrap();
        p.start_calibration_point(ScreenPoint::new(100.0, 100.0));

        // 12 samples but only 1.1s of dwell
        for i in 0..12 {
            p.process_sample(vector_sample(-0.8, -0.8, i as f64 * 100.0))
                .unwrap();
        }
        let err = p.record_calibration_point().unwrap_err();
        assert!(matches!(err, ComputeError::InsufficientSamples(_)));

        // Collection continues into the same dwell; more frames fix it
        for i in 12..20 {
            p.process_sample(vector_sample(-0.8, -0.8, i as f64 * 100.0))
                .unwrap();
        }
        assert_eq!(p.record_calibration_point().unwrap(), 1);
    }

    #[test]
    fn test_exercise_records_and_exports() {
        let mut p = processor();
        let mut t = calibrate(&mut p, 0.0);

        // Settle the filter on the center fixation before starting
        for _ in 0..10 {
            p.process_sample(vector_sample(0.0, 0.0, t)).unwrap();
            t += 100.0;
        }

        p.start_exercise(1).unwrap();
        for _ in 0..20 {
            // Fixate screen center, where the static target sits
            p.process_sample(vector_sample(0.0, 0.0, t)).unwrap();
            t += 100.0;
        }

        let summary = p.stop_exercise().unwrap();
        assert_eq!(summary.level, 1);
        assert!(summary.time_on_target_pct > 99.0);
        assert!(summary.score > 900);

        let export = p.export_session().unwrap();
        assert!(export.filename.starts_with("vor_session_level1_"));
        let text = String::from_utf8(export.data).unwrap();
        assert_eq!(text.lines().count(), 2 + p.recorded_len());
    }

    #[test]
    fn test_pause_stops_recording_resume_continues() {
        let mut p = processor();
        let mut t = calibrate(&mut p, 0.0);

        p.start_exercise(1).unwrap();
        p.process_sample(vector_sample(0.0, 0.0, t)).unwrap();
        t += 100.0;
        p.process_sample(vector_sample(0.0, 0.0, t)).unwrap();
        assert_eq!(p.recorded_len(), 2);

        p.pause_exercise().unwrap();
        // Gaze filtering continues while paused, but nothing records
        t += 100.0;
        let snapshot = p.process_sample(vector_sample(0.1, 0.1, t)).unwrap();
        assert_eq!(p.recorded_len(), 2);
        assert_eq!(snapshot.level, Some(1));
        assert!(p.current_gaze().is_some());

        p.resume_exercise().unwrap();
        t += 100.0;
        p.process_sample(vector_sample(0.0, 0.0, t)).unwrap();
        assert_eq!(p.recorded_len(), 3);
    }

    #[test]
    fn test_export_empty_reports() {
        let p = processor();
        assert!(matches!(
            p.export_session().unwrap_err(),
            ComputeError::ExportEmpty
        ));
    }

    #[test]
    fn test_screen_space_tracker_skips_mapping() {
        let mut p = processor();
        let snapshot = p.process_sample(screen_sample(321.0, 654.0, 0.0)).unwrap();
        assert_eq!(snapshot.gaze_x, 321.0);
        assert_eq!(snapshot.gaze_y, 654.0);
    }

    #[test]
    fn test_calibration_persistence_round_trip() {
        let mut p = processor();
        calibrate(&mut p, 0.0);
        let saved = p.save_calibration().unwrap();

        let mut fresh = processor();
        assert!(!fresh.context().calibrated);
        fresh.load_calibration(&saved).unwrap();
        assert!(fresh.context().calibrated);

        // Loaded calibration maps a stored vector back to its target
        let snapshot = fresh.process_sample(vector_sample(0.8, 0.8, 0.0)).unwrap();
        assert!((snapshot.gaze_x - 900.0).abs() < 1.0);
        assert!((snapshot.gaze_y - 900.0).abs() < 1.0);
    }

    #[test]
    fn test_calibration_blocked_during_exercise() {
        let mut p = processor();
        calibrate(&mut p, 0.0);
        p.start_exercise(1).unwrap();

        assert!(p.start_calibration().is_err());
    }
}
