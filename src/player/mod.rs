// src/player/mod.rs
//! Session players: the state machines that walk a [`SessionPlan`].
//!
//! [`StandardPlayer`] collects weight/reps for every set and runs rest
//! countdowns between them; [`CircuitPlayer`] is a pure countdown over timed
//! stations. Both own exactly one [`Countdown`](crate::countdown::Countdown)
//! and write exactly one completed-session summary when they finish.
//!
//! [`SessionPlan`]: crate::plan::SessionPlan

use chrono::Utc;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::{Config, WriteFailurePolicy, MAX_WRITE_RETRIES};
use crate::db::DbError;
use crate::model::{
    CompletedSessionSummary, NewCompletedSession, SessionMode, Theme, Workout,
};
use crate::plan::PlanError;
use crate::store::HistoryStore;

mod circuit;
mod standard;

pub use circuit::{CircuitPlayer, CircuitState};
pub use standard::{SetResult, StandardPlayer, StandardState};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Workout not found: ID {0}")]
    WorkoutNotFound(i64),
    #[error("Failed to load workout {id}")]
    LoadFailed {
        id: i64,
        #[source]
        source: DbError,
    },
    #[error("Workout {0} has no exercises, nothing to play")]
    EmptyPlan(i64),
    #[error(transparent)]
    InvalidPlan(#[from] PlanError),
    #[error("The session is already finished")]
    AlreadyFinished,
    #[error("No set is waiting to be validated right now")]
    NotAwaitingInput,
    #[error("Not currently resting")]
    NotResting,
    #[error("Enter the weight used for '{0}' before validating the set")]
    WeightRequired(String),
    #[error("Weight must be zero or positive, got {0}")]
    InvalidWeight(f64),
    #[error("Enter the number of reps before validating the set")]
    RepsRequired,
    #[error("Reps must be a positive integer, got {0}")]
    InvalidReps(i64),
    #[error("Set could not be saved after {attempts} attempt(s); validate again to retry")]
    WriteFailed {
        attempts: u32,
        #[source]
        source: DbError,
    },
}

/// Knobs a player reads from the user's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub calories_per_minute: u32,
    pub write_retries: u32,
    pub on_write_failure: WriteFailurePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            calories_per_minute: config.calories_per_minute,
            write_retries: config.write_retries.min(MAX_WRITE_RETRIES),
            on_write_failure: config.on_write_failure,
        }
    }
}

/// What a player needs to know about the workout besides its plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHeader {
    pub workout_id: i64,
    pub title: String,
    pub duration_min: u32,
    pub mode: SessionMode,
    pub theme: Theme,
}

impl From<&Workout> for SessionHeader {
    fn from(workout: &Workout) -> Self {
        Self {
            workout_id: workout.id,
            title: workout.title.clone(),
            duration_min: workout.duration_min,
            mode: workout.mode(),
            theme: workout.theme(),
        }
    }
}

/// A write that never reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsyncedWrite {
    Set { step_index: usize },
    Summary,
    CircuitMarker,
}

/// Produced once, when a player reaches its terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishReport {
    /// `None` when the summary could not be stored.
    pub summary: Option<CompletedSessionSummary>,
    pub calories: u32,
    pub unsynced: Vec<UnsyncedWrite>,
}

impl FinishReport {
    pub fn fully_synced(&self) -> bool {
        self.unsynced.is_empty()
    }
}

pub fn estimated_calories(duration_min: u32, calories_per_minute: u32) -> u32 {
    duration_min.saturating_mul(calories_per_minute)
}

/// Runs `op`, retrying up to `retries` more times (never more than
/// [`MAX_WRITE_RETRIES`]). On failure returns the number of attempts made
/// with the last error.
pub(crate) fn write_with_retry<T>(
    what: &str,
    retries: u32,
    mut op: impl FnMut() -> Result<T, DbError>,
) -> Result<T, (u32, DbError)> {
    let retries = retries.min(MAX_WRITE_RETRIES);
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempts <= retries => {
                warn!("Writing {} failed (attempt {}): {}. Retrying.", what, attempts, e);
            }
            Err(e) => {
                error!("Writing {} failed after {} attempt(s): {}", what, attempts, e);
                return Err((attempts, e));
            }
        }
    }
}

/// Writes the completed-session summary for a finished player.
pub(crate) fn write_summary<S: HistoryStore + ?Sized>(
    store: &S,
    header: &SessionHeader,
    settings: &SessionSettings,
) -> (u32, Option<CompletedSessionSummary>) {
    let calories = estimated_calories(header.duration_min, settings.calories_per_minute);
    let new_summary = NewCompletedSession {
        workout_id: header.workout_id,
        duration_min: header.duration_min,
        calories,
        completed_at: Utc::now(),
    };
    let summary = write_with_retry("session summary", settings.write_retries, || {
        store.insert_completed_session(&new_summary)
    })
    .ok()
    .map(|id| CompletedSessionSummary {
        id,
        workout_id: new_summary.workout_id,
        duration_min: new_summary.duration_min,
        calories: new_summary.calories,
        completed_at: new_summary.completed_at,
    });
    (calories, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> DbError {
        DbError::InsertFailed(rusqlite::Error::InvalidQuery)
    }

    #[test]
    fn retry_succeeds_on_second_attempt() {
        let mut calls = 0;
        let result = write_with_retry("log", 1, || {
            calls += 1;
            if calls == 1 {
                Err(failure())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 2);
    }

    #[test]
    fn retry_gives_up_after_configured_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = write_with_retry("log", 1, || {
            calls += 1;
            Err(failure())
        });
        let (attempts, _) = result.unwrap_err();
        assert_eq!(attempts, 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let mut calls = 0;
        let result: Result<(), _> = write_with_retry("log", 0, || {
            calls += 1;
            Err(failure())
        });
        assert_eq!(result.unwrap_err().0, 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_are_capped_at_one() {
        let mut calls = 0;
        let result: Result<(), _> = write_with_retry("log", 5, || {
            calls += 1;
            Err(failure())
        });
        assert_eq!(result.unwrap_err().0, 2);
        assert_eq!(calls, 2);

        let mut calls = 0;
        let result: Result<(), _> = write_with_retry("log", u32::MAX, || {
            calls += 1;
            Err(failure())
        });
        assert_eq!(result.unwrap_err().0, 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn settings_clamp_configured_retries() {
        let config = Config {
            write_retries: 9,
            ..Config::default()
        };
        assert_eq!(SessionSettings::from(&config).write_retries, MAX_WRITE_RETRIES);
        assert_eq!(SessionSettings::default().write_retries, 1);
    }

    #[test]
    fn calories_use_fixed_factor() {
        assert_eq!(estimated_calories(45, 7), 315);
        assert_eq!(estimated_calories(0, 7), 0);
    }
}
