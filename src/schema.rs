//! tracker.frame.v1 schema definition
//!
//! A tracker-agnostic input schema for per-frame gaze data that supports:
//! - Screen-space gaze predictions (point trackers)
//! - Normalized gaze vectors (regression trackers)
//! - Facial landmark maps with a video→screen scale ratio (mesh trackers)

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current schema version
pub const SCHEMA_VERSION: &str = "tracker.frame.v1";

/// Supported tracker families
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Emits screen-space gaze predictions directly
    Point,
    /// Emits a facial landmark map the engine derives gaze from
    Landmark,
    /// For custom/unknown trackers, use Other with a name
    #[serde(untagged)]
    Other(String),
}

impl TrackerKind {
    pub fn as_str(&self) -> &str {
        match self {
            TrackerKind::Point => "point",
            TrackerKind::Landmark => "landmark",
            TrackerKind::Other(name) => name.as_str(),
        }
    }
}

/// Frame source information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSource {
    /// Tracker family that produced the frame
    pub tracker: TrackerKind,
    /// Unique device/camera identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Model or library version of the tracker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// Coordinate space of a raw gaze reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeSpace {
    /// Screen pixels, origin top-left
    Screen,
    /// Normalized face-relative direction, roughly [-1, 1] per axis
    Normalized,
}

/// Raw gaze reading carried by a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawGaze {
    pub x: f64,
    pub y: f64,
    pub space: GazeSpace,
}

/// One raw frame as delivered by an external tracker
///
/// A frame carries a gaze reading, a landmark map, or both. Frames with
/// neither are rejected by [`RawFrame::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Schema version (must be "tracker.frame.v1")
    pub schema_version: String,
    /// Monotonic frame timestamp in milliseconds
    pub t_ms: f64,
    /// Source tracker information
    pub source: FrameSource,
    /// Gaze reading, if the tracker produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze: Option<RawGaze>,
    /// Landmark index → [x, y] in tracker-video coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<HashMap<u32, [f64; 2]>>,
    /// Video→screen scale ratio (x, y); required with landmarks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<(f64, f64)>,
}

impl RawFrame {
    /// Validate the frame against the schema contract
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ComputeError::InvalidFrame(format!(
                "unsupported schema version '{}', expected '{}'",
                self.schema_version, SCHEMA_VERSION
            )));
        }

        if !self.t_ms.is_finite() || self.t_ms < 0.0 {
            return Err(ComputeError::InvalidFrame(format!(
                "timestamp must be finite and non-negative, got {}",
                self.t_ms
            )));
        }

        if self.gaze.is_none() && self.landmarks.is_none() {
            return Err(ComputeError::InvalidFrame(
                "frame carries neither gaze nor landmarks".to_string(),
            ));
        }

        if let Some(gaze) = &self.gaze {
            if !gaze.x.is_finite() || !gaze.y.is_finite() {
                return Err(ComputeError::InvalidFrame(
                    "gaze coordinates must be finite".to_string(),
                ));
            }
        }

        if let Some(landmarks) = &self.landmarks {
            if landmarks.is_empty() {
                return Err(ComputeError::InvalidFrame(
                    "landmark map is empty".to_string(),
                ));
            }
            if self.scale.is_none() {
                return Err(ComputeError::MissingField(
                    "scale (required with landmarks)".to_string(),
                ));
            }
            if landmarks
                .values()
                .any(|p| !p[0].is_finite() || !p[1].is_finite())
            {
                return Err(ComputeError::InvalidFrame(
                    "landmark coordinates must be finite".to_string(),
                ));
            }
        }

        if let Some((sx, sy)) = self.scale {
            if !(sx.is_finite() && sy.is_finite()) || sx <= 0.0 || sy <= 0.0 {
                return Err(ComputeError::InvalidFrame(format!(
                    "scale ratio must be positive, got ({sx}, {sy})"
                )));
            }
        }

        Ok(())
    }
}

/// Parse newline-delimited JSON into frames (one frame per line)
pub fn parse_ndjson(input: &str) -> Result<Vec<RawFrame>, ComputeError> {
    let mut frames = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let frame: RawFrame = serde_json::from_str(trimmed).map_err(|e| {
            ComputeError::ParseError(format!("line {}: {}", line_no + 1, e))
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Parse a JSON array of frames
pub fn parse_array(input: &str) -> Result<Vec<RawFrame>, ComputeError> {
    serde_json::from_str(input)
        .map_err(|e| ComputeError::ParseError(format!("frame array: {}", e)))
}
