//! Gaze filtering
//!
//! Two-stage smoothing of the raw gaze stream: a short median window
//! rejects single-frame outliers, then an exponential filter with an
//! adaptive smoothing factor damps jitter during fixation without lagging
//! behind deliberate large saccades.

use crate::config::FilterConfig;
use crate::types::ScreenPoint;
use std::collections::VecDeque;

/// Stateful gaze smoother
///
/// Output is undefined until the first sample: [`GazeFilter::current`]
/// returns `None` rather than a fabricated origin point, so "no gaze yet"
/// is distinguishable from a legitimate top-left fixation.
#[derive(Debug, Clone)]
pub struct GazeFilter {
    raw: VecDeque<ScreenPoint>,
    smoothed: Option<ScreenPoint>,
    config: FilterConfig,
}

impl GazeFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            raw: VecDeque::with_capacity(config.median_window),
            smoothed: None,
            config,
        }
    }

    /// Latest smoothed point, `None` before any sample has been seen
    pub fn current(&self) -> Option<ScreenPoint> {
        self.smoothed
    }

    /// Feed one raw point and return the updated smoothed point
    pub fn filter(&mut self, raw: ScreenPoint) -> ScreenPoint {
        self.raw.push_back(raw);
        while self.raw.len() > self.config.median_window {
            self.raw.pop_front();
        }

        let median = ScreenPoint::new(
            median_of(self.raw.iter().map(|p| p.x)),
            median_of(self.raw.iter().map(|p| p.y)),
        );

        let smoothed = match self.smoothed {
            None => median,
            Some(prev) => {
                let jump = median.distance_to(prev);
                let alpha = if jump > self.config.jump_threshold_px {
                    self.config.alpha_fast
                } else {
                    self.config.alpha_slow
                };
                ScreenPoint::new(
                    alpha * median.x + (1.0 - alpha) * prev.x,
                    alpha * median.y + (1.0 - alpha) * prev.y,
                )
            }
        };

        self.smoothed = Some(smoothed);
        smoothed
    }

    /// Drop all filter state
    pub fn reset(&mut self) {
        self.raw.clear();
        self.smoothed = None;
    }
}

/// Median of a scalar sequence: middle sorted value for odd counts, mean of
/// the two middle values for even counts
fn median_of(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
