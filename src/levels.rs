//! Level definitions for VOR training
//!
//! Five progressive levels, each with a target trajectory pattern, a
//! duration, and an on-target tolerance. The table is fixed; callers look
//! levels up by id and never mutate them.

use crate::types::{ScreenPoint, Viewport};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Target trajectory pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPattern {
    Static,
    Horizontal,
    Vertical,
    Diagonal,
    Complex,
}

/// Trajectory amplitude, either relative to the viewport or absolute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amplitude {
    None,
    /// Fractions of viewport width/height
    ViewportFraction { x: f64, y: f64 },
    /// Absolute pixels
    Pixels { x: f64, y: f64 },
}

/// Immutable descriptor of one training level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelConfig {
    pub id: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub instruction: &'static str,
    /// 1 (easiest) to 5
    pub difficulty: u8,
    pub duration_ms: f64,
    pub pattern: TargetPattern,
    /// Base oscillation frequency in Hz (unused for static/complex)
    pub frequency_hz: f64,
    pub amplitude: Amplitude,
    /// On-target tolerance radius in pixels
    pub allowed_deviation_px: f64,
    /// Rendered target diameter in pixels
    pub target_size_px: f64,
}

/// Complex-pattern component frequencies (Hz): a two-frequency Lissajous
/// superposition per axis
const COMPLEX_X_FREQ: (f64, f64) = (0.3, 0.1);
const COMPLEX_Y_FREQ: (f64, f64) = (0.4, 0.15);

/// Vertical secondary-frequency multiplier of the diagonal pattern
const DIAGONAL_Y_RATE: f64 = 1.5;

const LEVELS: [LevelConfig; 5] = [
    LevelConfig {
        id: 1,
        name: "Basic Fixation",
        description: "Hold your gaze on the central target while slowly moving \
                      your head from side to side",
        instruction: "Watch the target and move your head slowly without losing \
                      visual fixation",
        difficulty: 1,
        duration_ms: 30_000.0,
        pattern: TargetPattern::Static,
        frequency_hz: 0.0,
        amplitude: Amplitude::None,
        allowed_deviation_px: 100.0,
        target_size_px: 30.0,
    },
    LevelConfig {
        id: 2,
        name: "Horizontal Pursuit",
        description: "Follow the target with your eyes while keeping your head \
                      still, then keep fixation while moving your head",
        instruction: "Phase 1: follow the target with your eyes. Phase 2: hold \
                      fixation while moving your head",
        difficulty: 2,
        duration_ms: 45_000.0,
        pattern: TargetPattern::Horizontal,
        frequency_hz: 0.5,
        amplitude: Amplitude::ViewportFraction { x: 0.3, y: 0.0 },
        allowed_deviation_px: 90.0,
        target_size_px: 28.0,
    },
    LevelConfig {
        id: 3,
        name: "Vertical Pursuit",
        description: "Vertical head movements while holding visual fixation on \
                      the target",
        instruction: "Keep your gaze on the target while moving your head up \
                      and down",
        difficulty: 3,
        duration_ms: 45_000.0,
        pattern: TargetPattern::Vertical,
        frequency_hz: 0.4,
        amplitude: Amplitude::ViewportFraction { x: 0.0, y: 0.3 },
        allowed_deviation_px: 90.0,
        target_size_px: 28.0,
    },
    LevelConfig {
        id: 4,
        name: "Diagonal Pattern",
        description: "Diagonal head movements with gaze stabilization",
        instruction: "Follow the diagonal pattern keeping eye-head coordination",
        difficulty: 4,
        duration_ms: 60_000.0,
        pattern: TargetPattern::Diagonal,
        frequency_hz: 0.3,
        amplitude: Amplitude::ViewportFraction { x: 0.25, y: 0.25 },
        allowed_deviation_px: 80.0,
        target_size_px: 24.0,
    },
    LevelConfig {
        id: 5,
        name: "Complex Pattern",
        description: "Advanced VOR training with unpredictable target motion",
        instruction: "Advanced challenge: keep visual stability through complex \
                      patterns",
        difficulty: 5,
        duration_ms: 90_000.0,
        pattern: TargetPattern::Complex,
        frequency_hz: 0.0,
        amplitude: Amplitude::Pixels { x: 200.0, y: 150.0 },
        allowed_deviation_px: 70.0,
        target_size_px: 20.0,
    },
];

/// Look up a level by id
pub fn level(id: u8) -> Option<&'static LevelConfig> {
    LEVELS.iter().find(|l| l.id == id)
}

/// All levels in difficulty order
pub fn all_levels() -> &'static [LevelConfig] {
    &LEVELS
}

/// Target position for a level at `elapsed_sec` of active exercise time
pub fn target_position(
    level: &LevelConfig,
    viewport: Viewport,
    elapsed_sec: f64,
) -> ScreenPoint {
    let center = viewport.center();
    let (ax, ay) = match level.amplitude {
        Amplitude::None => (0.0, 0.0),
        Amplitude::ViewportFraction { x, y } => (viewport.width * x, viewport.height * y),
        Amplitude::Pixels { x, y } => (x, y),
    };
    let phase = 2.0 * PI * level.frequency_hz * elapsed_sec;

    let point = match level.pattern {
        TargetPattern::Static => center,
        TargetPattern::Horizontal => ScreenPoint::new(center.x + ax * phase.sin(), center.y),
        TargetPattern::Vertical => ScreenPoint::new(center.x, center.y + ay * phase.sin()),
        TargetPattern::Diagonal => ScreenPoint::new(
            center.x + ax * phase.sin(),
            center.y + ay * (phase * DIAGONAL_Y_RATE).cos(),
        ),
        TargetPattern::Complex => {
            let (fx1, fx2) = COMPLEX_X_FREQ;
            let (fy1, fy2) = COMPLEX_Y_FREQ;
            ScreenPoint::new(
                center.x
                    + ax * (2.0 * PI * fx1 * elapsed_sec).sin()
                        * (2.0 * PI * fx2 * elapsed_sec).cos(),
                center.y
                    + ay * (2.0 * PI * fy1 * elapsed_sec).sin()
                        * (2.0 * PI * fy2 * elapsed_sec).sin(),
            )
        }
    };

    viewport.clamp(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_is_complete_and_ordered() {
        assert_eq!(all_levels().len(), 5);
        for (i, lvl) in all_levels().iter().enumerate() {
            assert_eq!(lvl.id as usize, i + 1);
            assert_eq!(lvl.difficulty as usize, i + 1);
            assert!(lvl.duration_ms > 0.0);
            assert!(lvl.allowed_deviation_px > 0.0);
        }
    }

    #[test]
    fn test_unknown_level_is_none() {
        assert!(level(0).is_none());
        assert!(level(6).is_none());
        assert_eq!(level(3).unwrap().name, "Vertical Pursuit");
    }

    #[test]
    fn test_static_target_stays_centered() {
        let vp = Viewport::new(1000.0, 800.0);
        let lvl = level(1).unwrap();
        assert_eq!(target_position(lvl, vp, 0.0), vp.center());
        assert_eq!(target_position(lvl, vp, 12.34), vp.center());
    }

    #[test]
    fn test_horizontal_oscillation() {
        let vp = Viewport::new(1000.0, 800.0);
        let lvl = level(2).unwrap();

        // At t=0 the target is at center
        assert_eq!(target_position(lvl, vp, 0.0), vp.center());

        // Quarter period of a 0.5Hz sine: peak deflection of 0.3 * width
        let peak = target_position(lvl, vp, 0.5);
        assert!((peak.x - (500.0 + 300.0)).abs() < 1e-6);
        assert_eq!(peak.y, 400.0);
    }

    #[test]
    fn test_vertical_keeps_x_centered() {
        let vp = Viewport::new(1000.0, 800.0);
        let lvl = level(3).unwrap();
        let p = target_position(lvl, vp, 0.3);
        assert_eq!(p.x, 500.0);
        assert!(p.y != 400.0);
    }

    #[test]
    fn test_diagonal_moves_both_axes() {
        let vp = Viewport::new(1000.0, 800.0);
        let lvl = level(4).unwrap();
        let p = target_position(lvl, vp, 0.4);
        assert!(p.x != 500.0);
        assert!(p.y != 400.0);
    }

    #[test]
    fn test_complex_starts_centered_and_stays_bounded() {
        let vp = Viewport::new(1000.0, 800.0);
        let lvl = level(5).unwrap();
        assert_eq!(target_position(lvl, vp, 0.0), vp.center());

        for i in 0..90 {
            let p = target_position(lvl, vp, i as f64);
            assert!(p.x >= 300.0 && p.x <= 700.0);
            assert!(p.y >= 250.0 && p.y <= 550.0);
        }
    }
}
