//! Calibration mapping
//!
//! This module maps normalized gaze vectors to screen coordinates using a
//! small set of user-collected calibration points. Before four points have
//! been collected, a fixed linear scale-and-offset around screen center
//! keeps the system usable; from four points on, mapping interpolates over
//! the nearest stored points by inverse distance in gaze-vector space.

use crate::config::CalibrationConfig;
use crate::error::ComputeError;
use crate::types::{CalibrationPoint, GazeVector, PrecisionReport, ScreenPoint, Viewport};
use serde::{Deserialize, Serialize};

/// Calibration points required before interpolation replaces the fallback
pub const MIN_POINTS_FOR_INTERPOLATION: usize = 4;

/// The 9-point calibration grid, as viewport fractions
pub const GRID_9: [(f64, f64); 9] = [
    (0.1, 0.1),
    (0.5, 0.1),
    (0.9, 0.1),
    (0.1, 0.5),
    (0.5, 0.5),
    (0.9, 0.5),
    (0.1, 0.9),
    (0.5, 0.9),
    (0.9, 0.9),
];

/// Maps raw gaze vectors to calibrated screen coordinates
///
/// The point collection is append-only during a calibration pass and owned
/// exclusively by the mapper afterwards. State serializes to JSON so a
/// calibration can outlive the process that collected it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationMapper {
    points: Vec<CalibrationPoint>,
    viewport: Viewport,
    config: CalibrationConfig,
}

impl CalibrationMapper {
    pub fn new(viewport: Viewport, config: CalibrationConfig) -> Self {
        Self {
            points: Vec::new(),
            viewport,
            config,
        }
    }

    /// Number of stored calibration points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether enough points exist for interpolated mapping
    pub fn is_interpolating(&self) -> bool {
        self.points.len() >= MIN_POINTS_FOR_INTERPOLATION
    }

    /// Discard all stored points, returning the mapper to fallback mode
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Record one calibration point from the samples collected while the
    /// subject fixated `target`
    ///
    /// Samples farthest from the centroid are trimmed before averaging, so
    /// a stray glance during the dwell does not skew the stored vector.
    pub fn record_point(
        &mut self,
        target: ScreenPoint,
        samples: &[GazeVector],
    ) -> Result<(), ComputeError> {
        if samples.len() < self.config.min_samples {
            return Err(ComputeError::InsufficientSamples(format!(
                "collected {} samples, need at least {}",
                samples.len(),
                self.config.min_samples
            )));
        }

        let gaze_vector = trimmed_mean(samples, self.config.trim_ratio);
        self.points.push(CalibrationPoint {
            target_screen: target,
            gaze_vector,
        });
        Ok(())
    }

    /// Resolve a live gaze vector to a screen coordinate
    ///
    /// Never fails: with an empty or sparse point set the fallback mapping
    /// applies, so gaze preview works before calibration completes.
    pub fn map(&self, vector: GazeVector) -> ScreenPoint {
        if self.points.len() < MIN_POINTS_FOR_INTERPOLATION {
            return self.fallback_map(vector);
        }

        // k nearest stored points by distance in gaze-vector space
        let mut by_distance: Vec<(f64, &CalibrationPoint)> = self
            .points
            .iter()
            .map(|p| (vector.distance_to(p.gaze_vector), p))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_distance.truncate(self.config.neighbors);

        // An exact (within epsilon) hit dominates: its weight would explode,
        // so return the stored target directly instead of dividing by ~zero.
        if let Some((distance, point)) = by_distance.first() {
            if *distance <= self.config.epsilon {
                return self.viewport.clamp(point.target_screen);
            }
        }

        let mut weight_sum = 0.0;
        let mut x = 0.0;
        let mut y = 0.0;
        for (distance, point) in &by_distance {
            let weight = 1.0 / (distance + self.config.epsilon);
            weight_sum += weight;
            x += point.target_screen.x * weight;
            y += point.target_screen.y * weight;
        }

        self.viewport
            .clamp(ScreenPoint::new(x / weight_sum, y / weight_sum))
    }

    /// Fixed linear scale-and-offset around screen center
    fn fallback_map(&self, vector: GazeVector) -> ScreenPoint {
        let gain = self.config.fallback_gain;
        self.viewport.clamp(ScreenPoint::new(
            self.viewport.width * (0.5 + vector.x * gain),
            self.viewport.height * (0.5 + vector.y * gain),
        ))
    }

    /// Replay the mapping against held-out fixation points
    ///
    /// Returns the mean Euclidean error in pixels and a normalized
    /// percentage relative to the screen diagonal, clamped to [0, 100].
    pub fn measure_precision(&self, test_points: &[CalibrationPoint]) -> PrecisionReport {
        if test_points.is_empty() {
            return PrecisionReport {
                mean_error_px: 0.0,
                precision_pct: 0,
            };
        }

        let total_error: f64 = test_points
            .iter()
            .map(|p| self.map(p.gaze_vector).distance_to(p.target_screen))
            .sum();
        let mean_error_px = total_error / test_points.len() as f64;

        let pct = ((1.0 - mean_error_px / self.viewport.diagonal()) * 100.0).round();
        PrecisionReport {
            mean_error_px,
            precision_pct: pct.clamp(0.0, 100.0) as u8,
        }
    }

    /// Stored points, for precision self-tests and persistence
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Load calibration state from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize calibration state to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Average samples after dropping the `trim_ratio` fraction farthest from
/// the centroid
fn trimmed_mean(samples: &[GazeVector], trim_ratio: f64) -> GazeVector {
    let n = samples.len() as f64;
    let centroid = GazeVector::new(
        samples.iter().map(|s| s.x).sum::<f64>() / n,
        samples.iter().map(|s| s.y).sum::<f64>() / n,
    );

    let mut by_distance: Vec<(f64, GazeVector)> = samples
        .iter()
        .map(|&s| (centroid.distance_to(s), s))
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

    let keep = (samples.len() as f64 * (1.0 - trim_ratio)).ceil().max(1.0) as usize;
    by_distance.truncate(keep);

    let kept = by_distance.len() as f64;
    GazeVector::new(
        by_distance.iter().map(|(_, s)| s.x).sum::<f64>() / kept,
        by_distance.iter().map(|(_, s)| s.y).sum::<f64>() / kept,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use pretty_assertions::assert_eq;

    fn grid_vector(fx: f64, fy: f64) -> GazeVector {
        // The grid fraction re-expressed as a [-1, 1] face-relative vector
        GazeVector::new((fx - 0.5) * 2.0, (fy - 0.5) * 2.0)
    }

    fn calibrated_mapper() -> CalibrationMapper {
        let viewport = Viewport::new(1000.0, 1000.0);
        let mut mapper = CalibrationMapper::new(viewport, CalibrationConfig::default());

        for (fx, fy) in GRID_9 {
            let target = ScreenPoint::new(fx * 1000.0, fy * 1000.0);
            let samples: Vec<GazeVector> = (0..10).map(|_| grid_vector(fx, fy)).collect();
            mapper.record_point(target, &samples).unwrap();
        }
        mapper
    }

    #[test]
    fn test_fallback_formula_is_exact() {
        let viewport = Viewport::new(1000.0, 800.0);
        let mapper = CalibrationMapper::new(viewport, CalibrationConfig::default());

        let mapped = mapper.map(GazeVector::new(0.25, -0.5));
        assert_eq!(mapped.x, 1000.0 * (0.5 + 0.25 * 0.8));
        assert_eq!(mapped.y, 800.0 * (0.5 - 0.5 * 0.8));
    }

    #[test]
    fn test_fallback_applies_below_four_points() {
        let viewport = Viewport::new(1000.0, 1000.0);
        let mut mapper = CalibrationMapper::new(viewport, CalibrationConfig::default());

        for (fx, fy) in GRID_9.iter().take(3) {
            let samples: Vec<GazeVector> = (0..10).map(|_| grid_vector(*fx, *fy)).collect();
            mapper
                .record_point(ScreenPoint::new(fx * 1000.0, fy * 1000.0), &samples)
                .unwrap();
        }

        assert!(!mapper.is_interpolating());
        let v = GazeVector::new(0.1, 0.1);
        let mapped = mapper.map(v);
        assert_eq!(mapped.x, 1000.0 * (0.5 + 0.1 * 0.8));
        assert_eq!(mapped.y, 1000.0 * (0.5 + 0.1 * 0.8));
    }

    #[test]
    fn test_exactness_at_stored_vectors() {
        let mapper = calibrated_mapper();

        for (fx, fy) in GRID_9 {
            let mapped = mapper.map(grid_vector(fx, fy));
            assert!((mapped.x - fx * 1000.0).abs() < 1e-6);
            assert!((mapped.y - fy * 1000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_map_is_idempotent() {
        let mapper = calibrated_mapper();
        let v = GazeVector::new(0.33, -0.4);
        assert_eq!(mapper.map(v), mapper.map(v));
    }

    #[test]
    fn test_interpolation_stays_in_viewport() {
        let mapper = calibrated_mapper();
        let mapped = mapper.map(GazeVector::new(5.0, -5.0));
        assert!(mapped.x >= 0.0 && mapped.x <= 1000.0);
        assert!(mapped.y >= 0.0 && mapped.y <= 1000.0);
    }

    #[test]
    fn test_record_rejects_short_dwell() {
        let mut mapper =
            CalibrationMapper::new(Viewport::default(), CalibrationConfig::default());
        let samples = vec![GazeVector::new(0.0, 0.0); 5];

        let err = mapper
            .record_point(ScreenPoint::new(100.0, 100.0), &samples)
            .unwrap_err();
        assert!(matches!(err, ComputeError::InsufficientSamples(_)));
        assert!(mapper.is_empty());
    }

    #[test]
    fn test_outlier_trimming() {
        let mut samples = vec![GazeVector::new(0.2, 0.2); 9];
        // One stray glance far away from the fixation
        samples.push(GazeVector::new(0.9, -0.9));

        let mean = trimmed_mean(&samples, 0.2);
        assert!((mean.x - 0.2).abs() < 1e-9);
        assert!((mean.y - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_precision_self_test() {
        let mapper = calibrated_mapper();
        let report = mapper.measure_precision(mapper.points());

        // Mapping its own points back must be near-exact
        assert!(report.mean_error_px < 1e-6);
        assert_eq!(report.precision_pct, 100);
    }

    #[test]
    fn test_precision_with_empty_test_set() {
        let mapper = calibrated_mapper();
        let report = mapper.measure_precision(&[]);
        assert_eq!(report.precision_pct, 0);
    }

    #[test]
    fn test_state_round_trip() {
        let mapper = calibrated_mapper();
        let json = mapper.to_json().unwrap();
        let loaded = CalibrationMapper::from_json(&json).unwrap();

        assert_eq!(loaded.len(), mapper.len());
        let v = GazeVector::new(0.4, 0.4);
        assert_eq!(loaded.map(v), mapper.map(v));
    }
}
