//! Core types for the Vorsight pipeline
//!
//! This module defines the data structures that flow through each stage of
//! the pipeline: tracker samples, calibration points, kinematic snapshots,
//! and session summaries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Screen dimensions used for mapping, clamping, and trajectory generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Screen center
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }

    /// Screen diagonal in pixels
    pub fn diagonal(&self) -> f64 {
        (self.width * self.width + self.height * self.height).sqrt()
    }

    /// Clamp a point to the viewport bounds
    pub fn clamp(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint {
            x: point.x.clamp(0.0, self.width),
            y: point.y.clamp(0.0, self.height),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// A 2D point in screen-pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A normalized 2D gaze direction estimate, prior to screen mapping
///
/// Components are roughly in [-1, 1]: (0, 0) means gaze at the face-relative
/// center, positive x to the subject's right, positive y downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeVector {
    pub x: f64,
    pub y: f64,
}

impl GazeVector {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another vector in gaze-vector space
    pub fn distance_to(&self, other: GazeVector) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A single timestamped gaze observation in screen-pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    /// Monotonic timestamp in milliseconds
    pub t: f64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    pub fn point(&self) -> ScreenPoint {
        ScreenPoint {
            x: self.x,
            y: self.y,
        }
    }
}

/// Pairs a known on-screen fixation target with the averaged raw gaze
/// vector observed while the subject fixated it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Fixation target in screen-pixel space
    pub target_screen: ScreenPoint,
    /// Trimmed-average gaze vector observed during the dwell
    pub gaze_vector: GazeVector,
}

/// Facial landmark positions for one tracked frame, in tracker-video space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Landmark index → (x, y) position in tracker-video coordinates
    pub points: HashMap<u32, (f64, f64)>,
    /// Video→screen scale ratio (x, y)
    pub scale: (f64, f64),
}

impl LandmarkFrame {
    /// Look up a landmark, falling back to an alternate index
    ///
    /// Tracker models differ in which of a cluster of neighboring indices
    /// they report reliably, so each reference point carries a fallback.
    pub fn get_with_fallback(&self, primary: u32, fallback: u32) -> Option<(f64, f64)> {
        self.points
            .get(&primary)
            .or_else(|| self.points.get(&fallback))
            .copied()
    }
}

/// Gaze observation shapes a tracker adapter can produce
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeInput {
    /// Already mapped to screen-pixel space by the tracker
    Screen(ScreenPoint),
    /// Normalized gaze vector that still needs calibration mapping
    Vector(GazeVector),
}

/// One adapted tracker frame, ready for the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSample {
    /// Monotonic timestamp in milliseconds
    pub t: f64,
    /// Gaze observation
    pub gaze: GazeInput,
    /// Landmark geometry, when the tracker provides it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkFrame>,
}

/// Per-frame output record appended to the session's record sequence
///
/// Immutable once produced. Optional fields are `None` when the underlying
/// data was missing or a guard suppressed the derivation for that frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Frame timestamp in milliseconds
    pub t: f64,
    /// Smoothed gaze x in screen pixels
    pub gaze_x: f64,
    /// Smoothed gaze y in screen pixels
    pub gaze_y: f64,
    /// Head tilt angle in degrees, when landmarks were available
    pub head_angle: Option<f64>,
    /// Head angular velocity in degrees/second
    pub head_vel: f64,
    /// Eye (gaze) linear velocity in pixels/second
    pub eye_vel: f64,
    /// VOR gain |eye_vel|/|head_vel|, when head motion exceeded the guard
    pub vor_gain: Option<f64>,
    /// Running mean of responded reflex latencies in milliseconds
    pub latency_ms: Option<f64>,
    /// Fixation stability RMS over the sliding window, in pixels
    pub fixation_rms: f64,
    /// Saccades detected so far this session
    pub saccade_count: u32,
    /// Active exercise level, when a session is running
    pub level: Option<u8>,
    /// Whether the gaze was within the level's allowed deviation
    pub on_target: bool,
}

/// Results summary produced when an exercise stops or completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Level that was exercised
    pub level: u8,
    /// Level display name
    pub level_name: String,
    /// Final score on the 0-1000 scale
    pub score: u32,
    /// Fraction of active time spent on target, as a percentage
    pub time_on_target_pct: f64,
    /// Fraction of recorded samples that were on target, as a percentage
    pub sample_accuracy_pct: f64,
    /// Number of samples recorded during the session
    pub samples_recorded: u32,
    /// Active exercise time in milliseconds
    pub duration_ms: f64,
    /// Whether the level ran to its configured duration
    pub completed: bool,
}

/// Result of a calibration precision self-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionReport {
    /// Mean Euclidean mapping error in pixels
    pub mean_error_px: f64,
    /// Normalized precision percentage in [0, 100]
    pub precision_pct: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_viewport_center_and_diagonal() {
        let vp = Viewport::new(1000.0, 1000.0);
        assert_eq!(vp.center(), ScreenPoint::new(500.0, 500.0));
        assert!((vp.diagonal() - 1414.2135623730951).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_clamp() {
        let vp = Viewport::new(800.0, 600.0);
        let clamped = vp.clamp(ScreenPoint::new(-10.0, 700.0));
        assert_eq!(clamped, ScreenPoint::new(0.0, 600.0));
    }

    #[test]
    fn test_screen_point_distance() {
        let a = ScreenPoint::new(0.0, 0.0);
        let b = ScreenPoint::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn test_landmark_fallback_lookup() {
        let mut points = HashMap::new();
        points.insert(4u32, (10.0, 20.0));
        let frame = LandmarkFrame {
            points,
            scale: (1.0, 1.0),
        };

        // Primary index 1 is absent, fallback 4 resolves
        assert_eq!(frame.get_with_fallback(1, 4), Some((10.0, 20.0)));
        assert_eq!(frame.get_with_fallback(33, 145), None);
    }

    #[test]
    fn test_tracker_sample_serialization() {
        let json = r#"{
            "t": 1250.5,
            "gaze": { "vector": { "x": 0.25, "y": -0.1 } }
        }"#;

        let sample: TrackerSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.t, 1250.5);
        assert_eq!(
            sample.gaze,
            GazeInput::Vector(GazeVector::new(0.25, -0.1))
        );
        assert!(sample.landmarks.is_none());
    }

    #[test]
    fn test_metrics_snapshot_round_trip() {
        let snapshot = MetricsSnapshot {
            t: 100.0,
            gaze_x: 512.0,
            gaze_y: 384.0,
            head_angle: Some(-3.5),
            head_vel: 12.0,
            eye_vel: 250.0,
            vor_gain: Some(0.93),
            latency_ms: None,
            fixation_rms: 4.2,
            saccade_count: 2,
            level: Some(3),
            on_target: true,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
