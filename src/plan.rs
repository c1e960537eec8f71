// src/plan.rs
//! Flattening of a workout's exercise list into a linear sequence of steps.
//!
//! Both builders are pure: the same input always produces the same plan, and
//! the resulting [`SessionPlan`] is never modified once built.

use crate::model::{Exercise, SessionMode, WorkoutExercise};
use thiserror::Error;

/// Fallback hold duration when a circuit duration spec can't be parsed.
pub const DEFAULT_CIRCUIT_SECONDS: u32 = 30;
/// Label of the generic rest between circuit stations.
pub const CIRCUIT_REST_LABEL: &str = "Repos";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("Exercise '{0}' must have at least one set")]
    NoSets(String),
    #[error("Exercise '{0}' has an empty rep/duration target")]
    EmptyRepSpec(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkTarget {
    /// Standard mode: log weight and reps for one set.
    Set {
        set_number: u32,
        total_sets: u32,
        target_reps: String,
    },
    /// Circuit mode: hold for a fixed time.
    Timed {
        round_number: u32,
        total_rounds: u32,
        duration_seconds: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Work {
        exercise: Exercise,
        target: WorkTarget,
    },
    Rest {
        duration_seconds: u32,
        next_label: String,
    },
}

impl Step {
    pub const fn is_rest(&self) -> bool {
        matches!(self, Self::Rest { .. })
    }

    /// Countdown length of the step, if it has one.
    pub const fn duration_seconds(&self) -> Option<u32> {
        match self {
            Self::Rest {
                duration_seconds, ..
            }
            | Self::Work {
                target: WorkTarget::Timed {
                    duration_seconds, ..
                },
                ..
            } => Some(*duration_seconds),
            Self::Work { .. } => None,
        }
    }

    pub fn exercise(&self) -> Option<&Exercise> {
        match self {
            Self::Work { exercise, .. } => Some(exercise),
            Self::Rest { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPlan {
    steps: Vec<Step>,
}

impl SessionPlan {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn work_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_rest()).count()
    }

    pub fn rest_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_rest()).count()
    }
}

/// Builds the plan matching the given mode.
pub fn build_plan(mode: SessionMode, exercises: &[WorkoutExercise]) -> Result<SessionPlan, PlanError> {
    match mode {
        SessionMode::Standard => build_standard_plan(exercises),
        SessionMode::Circuit => build_circuit_plan(exercises),
    }
}

fn validate(exercises: &[WorkoutExercise]) -> Result<(), PlanError> {
    for we in exercises {
        if we.sets == 0 {
            return Err(PlanError::NoSets(we.exercise.name.clone()));
        }
        if we.reps.trim().is_empty() {
            return Err(PlanError::EmptyRepSpec(we.exercise.name.clone()));
        }
    }
    Ok(())
}

/// Set-by-set plan. A rest follows every set except the last set of the
/// last exercise, and only when the exercise's rest is non-zero.
pub fn build_standard_plan(exercises: &[WorkoutExercise]) -> Result<SessionPlan, PlanError> {
    validate(exercises)?;
    let mut steps = Vec::new();

    for (i, we) in exercises.iter().enumerate() {
        let is_last_exercise = i + 1 == exercises.len();
        for set_number in 1..=we.sets {
            steps.push(Step::Work {
                exercise: we.exercise.clone(),
                target: WorkTarget::Set {
                    set_number,
                    total_sets: we.sets,
                    target_reps: we.reps.clone(),
                },
            });

            let is_last_set = set_number == we.sets;
            if we.rest_seconds == 0 || (is_last_set && is_last_exercise) {
                continue;
            }
            let next_label = if is_last_set {
                exercises[i + 1].exercise.name.clone()
            } else {
                we.exercise.name.clone()
            };
            steps.push(Step::Rest {
                duration_seconds: we.rest_seconds,
                next_label,
            });
        }
    }

    Ok(SessionPlan { steps })
}

/// Timed round-robin plan. Every station shares the round count configured
/// on the first exercise.
pub fn build_circuit_plan(exercises: &[WorkoutExercise]) -> Result<SessionPlan, PlanError> {
    validate(exercises)?;
    let Some(first) = exercises.first() else {
        return Ok(SessionPlan::default());
    };
    let total_rounds = first.sets;
    let mut steps = Vec::new();

    for round_number in 1..=total_rounds {
        for we in exercises {
            steps.push(Step::Work {
                exercise: we.exercise.clone(),
                target: WorkTarget::Timed {
                    round_number,
                    total_rounds,
                    duration_seconds: parse_duration_spec(&we.reps),
                },
            });
            if we.rest_seconds > 0 {
                steps.push(Step::Rest {
                    duration_seconds: we.rest_seconds,
                    next_label: CIRCUIT_REST_LABEL.to_string(),
                });
            }
        }
    }

    // Nothing to rest for after the final station.
    if steps.last().is_some_and(Step::is_rest) {
        steps.pop();
    }

    Ok(SessionPlan { steps })
}

/// Parses a hold duration like "45s". Returns [`DEFAULT_CIRCUIT_SECONDS`] for
/// anything that isn't a positive number of seconds.
pub fn parse_duration_spec(spec: &str) -> u32 {
    let trimmed = spec.trim();
    let digits = trimmed
        .strip_suffix('s')
        .or_else(|| trimmed.strip_suffix('S'))
        .unwrap_or(trimmed)
        .trim();
    match digits.parse::<u32>() {
        Ok(secs) if secs > 0 => secs,
        _ => DEFAULT_CIRCUIT_SECONDS,
    }
}

/// Lower bound of a rep target: "8-12" -> 8, "10" -> 10, "12 reps" -> 12.
/// `None` when the spec has no leading number (e.g. "AMRAP").
pub fn parse_rep_floor(spec: &str) -> Option<i64> {
    let floor = spec.split('-').next()?.trim();
    let digits: String = floor.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().filter(|r| *r > 0)
}
