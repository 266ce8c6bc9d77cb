//! Exercise scheduling and scoring
//!
//! One exercise session at a time moves through a small state machine:
//! Idle → Running ⇄ Paused → Completed/Stopped. Ticks are caller-
//! timestamped; pausing freezes the trajectory clock and every accumulator
//! without resetting them.

use crate::config::ScoringConfig;
use crate::error::ComputeError;
use crate::levels::{self, LevelConfig};
use crate::types::{ScreenPoint, SessionSummary, Viewport};
use serde::{Deserialize, Serialize};

/// Session state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExercisePhase {
    Idle,
    Running,
    Paused,
    Completed,
    Stopped,
}

impl ExercisePhase {
    /// Whether a new exercise may start from this phase
    pub fn can_start(&self) -> bool {
        !matches!(self, ExercisePhase::Running | ExercisePhase::Paused)
    }
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Target position at this tick
    pub target: ScreenPoint,
    /// Gaze-to-target distance in pixels, when gaze was available
    pub distance: Option<f64>,
    /// Whether the gaze was within the allowed deviation
    pub on_target: bool,
    /// Running score on the 0-max scale
    pub score: u32,
    /// Whether this tick completed the level
    pub completed: bool,
}

/// Generates the target trajectory and converts gaze/target distance into
/// time-on-target, accuracy, and a running score
#[derive(Debug, Clone)]
pub struct ExerciseScheduler {
    viewport: Viewport,
    scoring: ScoringConfig,
    phase: ExercisePhase,
    level: Option<&'static LevelConfig>,
    target: ScreenPoint,
    active_elapsed_ms: f64,
    time_on_target_ms: f64,
    last_tick_t: Option<f64>,
    last_distance: Option<f64>,
    score: u32,
    samples_total: u32,
    samples_on_target: u32,
}

impl ExerciseScheduler {
    pub fn new(viewport: Viewport, scoring: ScoringConfig) -> Self {
        Self {
            viewport,
            scoring,
            phase: ExercisePhase::Idle,
            level: None,
            target: viewport.center(),
            active_elapsed_ms: 0.0,
            time_on_target_ms: 0.0,
            last_tick_t: None,
            last_distance: None,
            score: 0,
            samples_total: 0,
            samples_on_target: 0,
        }
    }

    pub fn phase(&self) -> ExercisePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, ExercisePhase::Running | ExercisePhase::Paused)
    }

    /// Active level id, while a session exists
    pub fn level_id(&self) -> Option<u8> {
        self.level.map(|l| l.id)
    }

    /// Current target position
    pub fn target(&self) -> ScreenPoint {
        self.target
    }

    /// Running score
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Start an exercise at the given level
    ///
    /// Rejected while another session is active; no state is mutated on
    /// rejection.
    pub fn start(&mut self, level_id: u8) -> Result<(), ComputeError> {
        if !self.phase.can_start() {
            return Err(ComputeError::InvalidState(format!(
                "exercise already active (level {})",
                self.level.map(|l| l.id).unwrap_or(0)
            )));
        }

        let level = levels::level(level_id).ok_or(ComputeError::UnknownLevel(level_id))?;

        self.level = Some(level);
        self.phase = ExercisePhase::Running;
        self.target = self.viewport.center();
        self.active_elapsed_ms = 0.0;
        self.time_on_target_ms = 0.0;
        self.last_tick_t = None;
        self.last_distance = None;
        self.score = 0;
        self.samples_total = 0;
        self.samples_on_target = 0;
        Ok(())
    }

    /// Advance the session by one tick
    ///
    /// Returns `None` unless the session is running. Elapsed time advances
    /// only while running, so a paused session resumes exactly where its
    /// trajectory left off.
    pub fn tick(&mut self, gaze: Option<ScreenPoint>, t: f64) -> Option<TickOutcome> {
        if self.phase != ExercisePhase::Running {
            return None;
        }
        let level = self.level?;

        let dt = match self.last_tick_t {
            // Non-monotonic tick timestamps contribute no elapsed time
            Some(last) if t > last => t - last,
            _ => 0.0,
        };
        self.last_tick_t = Some(t);
        self.active_elapsed_ms += dt;

        self.target =
            levels::target_position(level, self.viewport, self.active_elapsed_ms / 1000.0);

        let distance = gaze.map(|g| g.distance_to(self.target));
        let on_target = match distance {
            Some(d) => d <= level.allowed_deviation_px,
            None => false,
        };

        if let Some(d) = distance {
            self.last_distance = Some(d);
            self.samples_total += 1;
            if on_target {
                self.samples_on_target += 1;
                self.time_on_target_ms += dt;
            }
        }

        self.score = self.compute_score();

        let completed = self.active_elapsed_ms >= level.duration_ms;
        if completed {
            self.phase = ExercisePhase::Completed;
        }

        Some(TickOutcome {
            target: self.target,
            distance,
            on_target,
            score: self.score,
            completed,
        })
    }

    /// Freeze trajectory advancement and accumulators
    pub fn pause(&mut self) -> Result<(), ComputeError> {
        if self.phase != ExercisePhase::Running {
            return Err(ComputeError::InvalidState(format!(
                "cannot pause from {:?}",
                self.phase
            )));
        }
        self.phase = ExercisePhase::Paused;
        self.last_tick_t = None;
        Ok(())
    }

    /// Resume a paused session without resetting accumulators
    pub fn resume(&mut self) -> Result<(), ComputeError> {
        if self.phase != ExercisePhase::Paused {
            return Err(ComputeError::InvalidState(format!(
                "cannot resume from {:?}",
                self.phase
            )));
        }
        self.phase = ExercisePhase::Running;
        Ok(())
    }

    /// Stop the session and finalize its summary
    pub fn stop(&mut self) -> Result<SessionSummary, ComputeError> {
        if !self.is_active() && self.phase != ExercisePhase::Completed {
            return Err(ComputeError::InvalidState(format!(
                "no session to stop from {:?}",
                self.phase
            )));
        }
        if self.phase != ExercisePhase::Completed {
            self.phase = ExercisePhase::Stopped;
        }
        self.summary()
            .ok_or_else(|| ComputeError::InvalidState("no session summary".to_string()))
    }

    /// Results summary for the current session, `None` before any start
    pub fn summary(&self) -> Option<SessionSummary> {
        let level = self.level?;
        Some(SessionSummary {
            level: level.id,
            level_name: level.name.to_string(),
            score: self.score,
            time_on_target_pct: self.time_on_target_pct(),
            sample_accuracy_pct: if self.samples_total > 0 {
                100.0 * self.samples_on_target as f64 / self.samples_total as f64
            } else {
                0.0
            },
            samples_recorded: self.samples_total,
            duration_ms: self.active_elapsed_ms,
            completed: self.phase == ExercisePhase::Completed,
        })
    }

    fn time_on_target_pct(&self) -> f64 {
        if self.active_elapsed_ms > 0.0 {
            100.0 * self.time_on_target_ms / self.active_elapsed_ms
        } else {
            0.0
        }
    }

    /// Weighted score on the 0-max scale
    ///
    /// `score = round((time_on_target_pct * w_accuracy +
    /// stability_pct * w_stability) * max_score / 100)` where the stability
    /// percentage degrades linearly with the latest gaze/target distance.
    fn compute_score(&self) -> u32 {
        let level = match self.level {
            Some(level) => level,
            None => return 0,
        };

        let stability_pct = match self.last_distance {
            Some(d) => (100.0 * (1.0 - d / level.allowed_deviation_px)).max(0.0),
            None => 0.0,
        };

        let weighted = self.time_on_target_pct() * self.scoring.accuracy_weight
            + stability_pct * self.scoring.stability_weight;
        (weighted * self.scoring.max_score / 100.0).round() as u32
    }
}
