//! Kinematics derivation
//!
//! This module derives the clinical metrics from the filtered gaze stream
//! and landmark geometry: head angle and angular velocity, eye velocity,
//! VOR gain, saccade events, reflex latency pairing, and fixation
//! stability over a sliding window.

use crate::adapters::landmark_indices::{
    LEFT_EYE, LEFT_EYE_ALT, NOSE_TIP, NOSE_TIP_ALT, RIGHT_EYE, RIGHT_EYE_ALT,
};
use crate::config::KinematicsConfig;
use crate::types::{GazeSample, LandmarkFrame, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A head-movement onset awaiting its compensatory eye response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct PendingOnset {
    /// Timestamp of the onset, in milliseconds
    onset_t: f64,
    /// Head velocity at onset, in degrees/second
    head_vel: f64,
}

/// Metrics derived for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsFrame {
    pub head_angle: Option<f64>,
    pub head_vel: f64,
    pub eye_vel: f64,
    pub vor_gain: Option<f64>,
    /// Running mean of all responded latencies, in milliseconds
    pub latency_ms: Option<f64>,
    pub fixation_rms: f64,
    pub saccade_count: u32,
}

/// Rolling per-session kinematic state and its update logic
///
/// Mutated exactly once per processed frame; metrics for frame *n* are
/// always computed against state as of frame *n−1*.
#[derive(Debug, Clone)]
pub struct KinematicsEngine {
    config: KinematicsConfig,
    last_head_angle: Option<f64>,
    last_gaze: Option<ScreenPoint>,
    last_t: Option<f64>,
    pending: VecDeque<PendingOnset>,
    fixation_window: VecDeque<GazeSample>,
    latency_sum_ms: f64,
    latency_count: u32,
    saccade_count: u32,
}

impl KinematicsEngine {
    pub fn new(config: KinematicsConfig) -> Self {
        Self {
            config,
            last_head_angle: None,
            last_gaze: None,
            last_t: None,
            pending: VecDeque::new(),
            fixation_window: VecDeque::new(),
            latency_sum_ms: 0.0,
            latency_count: 0,
            saccade_count: 0,
        }
    }

    /// Saccades detected since the last reset
    pub fn saccade_count(&self) -> u32 {
        self.saccade_count
    }

    /// Unresponded onsets currently queued
    pub fn pending_onsets(&self) -> usize {
        self.pending.len()
    }

    /// Reset all rolling state, as at session start
    pub fn reset(&mut self) {
        self.last_head_angle = None;
        self.last_gaze = None;
        self.last_t = None;
        self.pending.clear();
        self.fixation_window.clear();
        self.latency_sum_ms = 0.0;
        self.latency_count = 0;
        self.saccade_count = 0;
    }

    /// Process one filtered gaze point and optional landmark frame
    pub fn update(
        &mut self,
        gaze: ScreenPoint,
        t: f64,
        landmarks: Option<&LandmarkFrame>,
    ) -> KinematicsFrame {
        let head_angle = landmarks.and_then(|lm| head_angle(lm, self.config.preview_width));

        // A non-monotonic or duplicate timestamp would corrupt Δt: skip the
        // velocity update for this frame and leave the previous state alone.
        let dt_sec = match self.last_t {
            Some(last_t) if t > last_t => Some((t - last_t) / 1000.0),
            Some(_) => None,
            None => None,
        };
        let monotonic = !matches!(self.last_t, Some(last_t) if t <= last_t);

        let mut head_vel = 0.0;
        let mut eye_vel = 0.0;
        if let Some(dt) = dt_sec {
            if let (Some(angle), Some(last_angle)) = (head_angle, self.last_head_angle) {
                head_vel = (angle - last_angle) / dt;
            }
            if let Some(last_gaze) = self.last_gaze {
                eye_vel = gaze.distance_to(last_gaze) / dt;
            }
        }

        if eye_vel > self.config.saccade_vel_threshold {
            self.saccade_count += 1;
        }

        if monotonic {
            self.update_latency_queue(head_vel, eye_vel, t);
        }

        let vor_gain = if head_vel.abs() > self.config.min_head_vel_for_gain {
            Some(eye_vel.abs() / head_vel.abs())
        } else {
            None
        };

        let fixation_rms = self.update_fixation_window(gaze, t);

        if monotonic {
            // A frame without landmarks clears the angle pair, so head
            // velocity never spans a landmark gap
            self.last_head_angle = head_angle;
            self.last_gaze = Some(gaze);
            self.last_t = Some(t);
        }

        KinematicsFrame {
            head_angle,
            head_vel,
            eye_vel,
            vor_gain,
            latency_ms: self.average_latency(),
            fixation_rms,
            saccade_count: self.saccade_count,
        }
    }

    /// Queue head-movement onsets and pair them with eye responses
    ///
    /// Matching is first-unresponded-first-matched: one eye response
    /// resolves exactly one onset, the oldest. Onsets that stay unresponded
    /// past the horizon are discarded.
    fn update_latency_queue(&mut self, head_vel: f64, eye_vel: f64, t: f64) {
        while let Some(front) = self.pending.front() {
            if t - front.onset_t > self.config.pending_horizon_ms {
                self.pending.pop_front();
            } else {
                break;
            }
        }

        if head_vel.abs() > self.config.head_vel_threshold {
            self.pending.push_back(PendingOnset {
                onset_t: t,
                head_vel,
            });
        }

        if eye_vel.abs() > self.config.eye_vel_threshold {
            if let Some(onset) = self.pending.pop_front() {
                self.latency_sum_ms += t - onset.onset_t;
                self.latency_count += 1;
            }
        }
    }

    fn average_latency(&self) -> Option<f64> {
        if self.latency_count == 0 {
            None
        } else {
            Some(self.latency_sum_ms / self.latency_count as f64)
        }
    }

    /// Slide the fixation window forward and compute the RMS deviation of
    /// its points from the window mean
    fn update_fixation_window(&mut self, gaze: ScreenPoint, t: f64) -> f64 {
        self.fixation_window.push_back(GazeSample::new(gaze.x, gaze.y, t));

        let cutoff = t - self.config.fixation_window_ms;
        while let Some(front) = self.fixation_window.front() {
            if front.t < cutoff {
                self.fixation_window.pop_front();
            } else {
                break;
            }
        }

        let n = self.fixation_window.len() as f64;
        let mean_x = self.fixation_window.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y = self.fixation_window.iter().map(|p| p.y).sum::<f64>() / n;

        // RMS over the concatenated x and y deviations
        let sum_sq: f64 = self
            .fixation_window
            .iter()
            .map(|p| (p.x - mean_x).powi(2) + (p.y - mean_y).powi(2))
            .sum();
        (sum_sq / (2.0 * n)).sqrt()
    }
}

/// Head tilt angle in degrees from the nose and eye reference landmarks
///
/// Landmark x coordinates are mirrored across the preview width (the
/// tracker video is a mirror image of the subject) and scaled from video
/// to screen-proportional space. `None` when any reference is missing.
pub fn head_angle(landmarks: &LandmarkFrame, preview_width: f64) -> Option<f64> {
    let nose = landmarks.get_with_fallback(NOSE_TIP, NOSE_TIP_ALT)?;
    let left = landmarks.get_with_fallback(LEFT_EYE, LEFT_EYE_ALT)?;
    let right = landmarks.get_with_fallback(RIGHT_EYE, RIGHT_EYE_ALT)?;

    let (sx, sy) = landmarks.scale;
    let nose_x = preview_width - nose.0 * sx;
    let nose_y = nose.1 * sy;
    let left_x = preview_width - left.0 * sx;
    let right_x = preview_width - right.0 * sx;

    let mid_eyes_x = (left_x + right_x) / 2.0;
    let mid_eyes_y = ((left.1 + right.1) / 2.0) * sy;

    let vx = nose_x - mid_eyes_x;
    let vy = nose_y - mid_eyes_y;

    Some(vx.atan2(vy).to_degrees())
}
