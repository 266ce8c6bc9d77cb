//! Landmark tracker adapter
//!
//! Adapts mesh trackers that emit a facial landmark map per frame. The
//! gaze vector is derived from eye-center position relative to face
//! geometry; the landmark map itself is carried through for head-angle
//! derivation in the kinematics engine.

use crate::error::ComputeError;
use crate::schema::RawFrame;
use crate::types::{GazeInput, GazeVector, LandmarkFrame, TrackerSample};
use std::collections::HashMap;

use super::TrackerAdapter;

/// Facial landmark indices (face-mesh convention)
pub mod landmark_indices {
    /// Nose tip, with fallback
    pub const NOSE_TIP: u32 = 1;
    pub const NOSE_TIP_ALT: u32 = 4;

    /// Left eye outer corner, with fallback
    pub const LEFT_EYE: u32 = 33;
    pub const LEFT_EYE_ALT: u32 = 145;

    /// Right eye outer corner, with fallback
    pub const RIGHT_EYE: u32 = 263;
    pub const RIGHT_EYE_ALT: u32 = 374;

    /// Cheek references for face width
    pub const LEFT_CHEEK: u32 = 234;
    pub const RIGHT_CHEEK: u32 = 454;

    /// Vertical references for face height
    pub const FOREHEAD: u32 = 9;
    pub const CHIN: u32 = 175;
}

use landmark_indices::*;

/// Fraction of the face dimension that maps to a full-scale gaze deflection
const GAZE_NORMALIZATION_DIVISOR: f64 = 3.0;

/// Adapter for landmark-mesh trackers
pub struct LandmarkTrackerAdapter;

impl TrackerAdapter for LandmarkTrackerAdapter {
    fn adapt(&self, frame: &RawFrame) -> Result<TrackerSample, ComputeError> {
        frame.validate()?;

        let raw_points = frame.landmarks.as_ref().ok_or_else(|| {
            ComputeError::MissingField("landmarks (required for landmark trackers)".to_string())
        })?;
        let scale = frame.scale.ok_or_else(|| {
            ComputeError::MissingField("scale (required with landmarks)".to_string())
        })?;

        let points: HashMap<u32, (f64, f64)> = raw_points
            .iter()
            .map(|(&idx, &[x, y])| (idx, (x, y)))
            .collect();

        let landmarks = LandmarkFrame { points, scale };
        let gaze = derive_gaze_vector(&landmarks).ok_or_else(|| {
            ComputeError::MissingField(
                "eye/face reference landmarks for gaze derivation".to_string(),
            )
        })?;

        Ok(TrackerSample {
            t: frame.t_ms,
            gaze: GazeInput::Vector(gaze),
            landmarks: Some(landmarks),
        })
    }
}

/// Derive a normalized gaze vector from landmark geometry
///
/// The eye midpoint is compared against the face center (cheek midpoint
/// horizontally, forehead/chin midpoint vertically) and normalized by the
/// face dimensions, yielding a face-relative direction estimate that is
/// independent of the subject's distance to the camera.
fn derive_gaze_vector(landmarks: &LandmarkFrame) -> Option<GazeVector> {
    let left_eye = landmarks.get_with_fallback(LEFT_EYE, LEFT_EYE_ALT)?;
    let right_eye = landmarks.get_with_fallback(RIGHT_EYE, RIGHT_EYE_ALT)?;
    let left_cheek = landmarks.points.get(&LEFT_CHEEK).copied()?;
    let right_cheek = landmarks.points.get(&RIGHT_CHEEK).copied()?;
    let forehead = landmarks.points.get(&FOREHEAD).copied()?;
    let chin = landmarks.points.get(&CHIN).copied()?;

    let eye_center = (
        (left_eye.0 + right_eye.0) / 2.0,
        (left_eye.1 + right_eye.1) / 2.0,
    );
    let face_center = (
        (left_cheek.0 + right_cheek.0) / 2.0,
        (forehead.1 + chin.1) / 2.0,
    );

    let face_width = (right_cheek.0 - left_cheek.0).abs();
    let face_height = (chin.1 - forehead.1).abs();
    if face_width <= 0.0 || face_height <= 0.0 {
        return None;
    }

    Some(GazeVector::new(
        (eye_center.0 - face_center.0) / (face_width / GAZE_NORMALIZATION_DIVISOR),
        (eye_center.1 - face_center.1) / (face_height / GAZE_NORMALIZATION_DIVISOR),
    ))
}
