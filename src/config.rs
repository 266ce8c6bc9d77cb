//! Pipeline configuration
//!
//! Every tunable threshold lives here as an enumerated constant with its
//! default, rather than being hardcoded at a call site. Configs serialize
//! so a deployment can pin its thresholds alongside exported data.

use crate::types::Viewport;
use serde::{Deserialize, Serialize};

/// Gaze filter tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Number of raw points kept for the median pre-filter
    pub median_window: usize,
    /// Instantaneous jump (pixels) above which the responsive alpha is used
    pub jump_threshold_px: f64,
    /// Smoothing alpha applied on large jumps (responsive)
    pub alpha_fast: f64,
    /// Smoothing alpha applied during fixation (steady)
    pub alpha_slow: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            median_window: 5,
            jump_threshold_px: 50.0,
            alpha_fast: 0.6,
            alpha_slow: 0.2,
        }
    }
}

/// Calibration mapper tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Minimum samples a fixation dwell must collect before a point counts
    pub min_samples: usize,
    /// Required dwell duration per point, in milliseconds
    pub dwell_ms: f64,
    /// Number of nearest calibration points used for interpolation
    pub neighbors: usize,
    /// Distance floor for inverse-distance weights
    pub epsilon: f64,
    /// Linear gain of the pre-calibration fallback mapping
    pub fallback_gain: f64,
    /// Fraction of dwell samples discarded as outliers (farthest from the
    /// centroid) before averaging
    pub trim_ratio: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            dwell_ms: 1500.0,
            neighbors: 4,
            epsilon: 1e-6,
            fallback_gain: 0.8,
            trim_ratio: 0.2,
        }
    }
}

/// Kinematics engine thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Eye velocity (px/s) above which a saccade is counted
    pub saccade_vel_threshold: f64,
    /// Head velocity (deg/s) above which a head-movement onset is queued
    pub head_vel_threshold: f64,
    /// Eye velocity (px/s) that counts as a response to a queued onset
    pub eye_vel_threshold: f64,
    /// Minimum head velocity (deg/s) for VOR gain to be defined
    pub min_head_vel_for_gain: f64,
    /// Fixation stability window, in milliseconds
    pub fixation_window_ms: f64,
    /// Unresponded onsets older than this are pruned, in milliseconds
    pub pending_horizon_ms: f64,
    /// Tracker preview width (pixels) used to mirror landmark x coordinates
    pub preview_width: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            saccade_vel_threshold: 1500.0,
            head_vel_threshold: 50.0,
            eye_vel_threshold: 200.0,
            min_head_vel_for_gain: 5.0,
            fixation_window_ms: 100.0,
            pending_horizon_ms: 500.0,
            preview_width: 320.0,
        }
    }
}

/// Exercise scoring weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight of time-on-target percentage
    pub accuracy_weight: f64,
    /// Weight of instantaneous fixation stability percentage
    pub stability_weight: f64,
    /// Score ceiling
    pub max_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            accuracy_weight: 0.7,
            stability_weight: 0.3,
            max_score: 1000.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub viewport: Viewport,
    pub filter: FilterConfig,
    pub calibration: CalibrationConfig,
    pub kinematics: KinematicsConfig,
    pub scoring: ScoringConfig,
}

impl EngineConfig {
    /// Configuration for a specific viewport, defaults elsewhere
    pub fn for_viewport(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_clinical_constants() {
        let config = KinematicsConfig::default();
        assert_eq!(config.saccade_vel_threshold, 1500.0);
        assert_eq!(config.head_vel_threshold, 50.0);
        assert_eq!(config.eye_vel_threshold, 200.0);
        assert_eq!(config.min_head_vel_for_gain, 5.0);
        assert_eq!(config.fixation_window_ms, 100.0);
    }

    #[test]
    fn test_scoring_weights_sum_to_one() {
        let scoring = ScoringConfig::default();
        assert!((scoring.accuracy_weight + scoring.stability_weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_round_trip() {
        let config = EngineConfig::for_viewport(1280.0, 800.0);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
