//! Point tracker adapter
//!
//! Adapts trackers that emit a per-frame gaze prediction directly, either
//! already in screen pixels or as a normalized gaze vector.

use crate::error::ComputeError;
use crate::schema::{GazeSpace, RawFrame};
use crate::types::{GazeInput, GazeVector, ScreenPoint, TrackerSample};

use super::TrackerAdapter;

/// Adapter for point-prediction trackers
pub struct PointTrackerAdapter;

impl TrackerAdapter for PointTrackerAdapter {
    fn adapt(&self, frame: &RawFrame) -> Result<TrackerSample, ComputeError> {
        frame.validate()?;

        let raw = frame.gaze.ok_or_else(|| {
            ComputeError::MissingField("gaze (required for point trackers)".to_string())
        })?;

        let gaze = match raw.space {
            GazeSpace::Screen => GazeInput::Screen(ScreenPoint::new(raw.x, raw.y)),
            GazeSpace::Normalized => GazeInput::Vector(GazeVector::new(raw.x, raw.y)),
        };

        Ok(TrackerSample {
            t: frame.t_ms,
            gaze,
            landmarks: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FrameSource, RawGaze, TrackerKind, SCHEMA_VERSION};
    use pretty_assertions::assert_eq;

    fn make_frame(x: f64, y: f64, space: GazeSpace) -> RawFrame {
        RawFrame {
            schema_version: SCHEMA_VERSION.to_string(),
            t_ms: 42.0,
            source: FrameSource {
                tracker: TrackerKind::Point,
                device_id: None,
                model_version: None,
            },
            gaze: Some(RawGaze { x, y, space }),
            landmarks: None,
            scale: None,
        }
    }

    #[test]
    fn test_screen_space_passthrough() {
        let sample = PointTrackerAdapter
            .adapt(&make_frame(640.0, 360.0, GazeSpace::Screen))
            .unwrap();

        assert_eq!(sample.t, 42.0);
        assert_eq!(
            sample.gaze,
            GazeInput::Screen(ScreenPoint::new(640.0, 360.0))
        );
    }

    #[test]
    fn test_normalized_becomes_vector() {
        let sample = PointTrackerAdapter
            .adapt(&make_frame(0.3, -0.2, GazeSpace::Normalized))
            .unwrap();

        assert_eq!(
            sample.gaze,
            GazeInput::Vector(GazeVector::new(0.3, -0.2))
        );
    }

    #[test]
    fn test_missing_gaze_is_rejected() {
        let mut frame = make_frame(0.0, 0.0, GazeSpace::Screen);
        frame.gaze = None;
        // validate() already fails on a frame with neither gaze nor landmarks
        assert!(PointTrackerAdapter.adapt(&frame).is_err());
    }
}
