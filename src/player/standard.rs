// src/player/standard.rs
use tracing::{debug, info, warn};

use super::{
    write_summary, write_with_retry, FinishReport, SessionError, SessionHeader, SessionSettings,
    UnsyncedWrite,
};
use crate::config::WriteFailurePolicy;
use crate::countdown::{Countdown, TickResult};
use crate::history::{is_personal_record, max_weight, LastPerformance, SetInput};
use crate::model::{NewLogEntry, PR_NOTE};
use crate::plan::{SessionPlan, Step, WorkTarget};
use crate::store::HistoryStore;

/// Observable state of a standard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardState {
    Active { step_index: usize },
    Resting { step_index: usize, seconds_remaining: u32 },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active(usize),
    Resting(usize),
    Finished,
}

/// Result of a successful `validate_set`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetResult {
    /// `None` when the log could not be written and the step was marked unsynced.
    pub log_id: Option<i64>,
    pub personal_record: bool,
    pub state: StandardState,
}

/// Set-by-set player: log weight and reps, rest, repeat.
pub struct StandardPlayer<'s, S: HistoryStore + ?Sized> {
    store: &'s S,
    header: SessionHeader,
    plan: SessionPlan,
    settings: SessionSettings,
    phase: Phase,
    countdown: Countdown,
    input: SetInput,
    last_performance: Option<LastPerformance>,
    unsynced: Vec<UnsyncedWrite>,
    report: Option<FinishReport>,
}

impl<'s, S: HistoryStore + ?Sized> StandardPlayer<'s, S> {
    /// Enters the first step of the plan.
    /// # Errors
    /// `SessionError::EmptyPlan` if there is nothing to play.
    pub fn start(
        store: &'s S,
        header: SessionHeader,
        plan: SessionPlan,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        if plan.is_empty() {
            return Err(SessionError::EmptyPlan(header.workout_id));
        }
        info!(
            "Starting standard session '{}' ({} steps)",
            header.title,
            plan.len()
        );
        let mut player = Self {
            store,
            header,
            plan,
            settings,
            phase: Phase::Active(0),
            countdown: Countdown::new(),
            input: SetInput::default(),
            last_performance: None,
            unsynced: Vec::new(),
            report: None,
        };
        player.enter_step(0);
        Ok(player)
    }

    pub fn state(&self) -> StandardState {
        match self.phase {
            Phase::Active(step_index) => StandardState::Active { step_index },
            Phase::Resting(step_index) => StandardState::Resting {
                step_index,
                seconds_remaining: self.countdown.remaining().unwrap_or(0),
            },
            Phase::Finished => StandardState::Finished,
        }
    }

    pub const fn header(&self) -> &SessionHeader {
        &self.header
    }

    pub const fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn current_step(&self) -> Option<&Step> {
        match self.phase {
            Phase::Active(i) | Phase::Resting(i) => self.plan.get(i),
            Phase::Finished => None,
        }
    }

    /// Current contents of the weight/reps fields.
    pub const fn input(&self) -> SetInput {
        self.input
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.input.weight = Some(weight);
    }

    pub fn set_reps(&mut self, reps: i64) {
        self.input.reps = Some(reps);
    }

    /// Previous performance for the current exercise, if it was ever logged.
    pub const fn last_performance(&self) -> Option<LastPerformance> {
        self.last_performance
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    pub fn finish_report(&self) -> Option<&FinishReport> {
        self.report.as_ref()
    }

    pub fn unsynced(&self) -> &[UnsyncedWrite] {
        &self.unsynced
    }

    /// Fills both fields and validates the current set.
    /// # Errors
    /// See [`Self::validate`].
    pub fn validate_set(&mut self, weight: f64, reps: i64) -> Result<SetResult, SessionError> {
        self.input = SetInput {
            weight: Some(weight),
            reps: Some(reps),
        };
        self.validate()
    }

    /// Logs the current set from the input fields, then moves on.
    /// If history can't be read the set is still logged, without a PR flag.
    /// # Errors
    /// - `AlreadyFinished` / `NotAwaitingInput` outside of an active WORK step.
    /// - `WeightRequired`, `RepsRequired`, `InvalidWeight`, `InvalidReps` on bad input.
    /// - `WriteFailed` if the log can't be stored and the policy is `Block`.
    ///   The player stays on the same step.
    pub fn validate(&mut self) -> Result<SetResult, SessionError> {
        let step_index = match self.phase {
            Phase::Active(i) => i,
            Phase::Resting(_) => return Err(SessionError::NotAwaitingInput),
            Phase::Finished => return Err(SessionError::AlreadyFinished),
        };
        let Some(Step::Work { exercise, target }) = self.plan.get(step_index) else {
            return Err(SessionError::NotAwaitingInput);
        };
        let exercise_id = exercise.id;
        let set_number = match target {
            WorkTarget::Set { set_number, .. } => *set_number,
            WorkTarget::Timed { round_number, .. } => *round_number,
        };

        let weight = self
            .input
            .weight
            .ok_or_else(|| SessionError::WeightRequired(exercise.name.clone()))?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(SessionError::InvalidWeight(weight));
        }
        let reps = self.input.reps.ok_or(SessionError::RepsRequired)?;
        if reps <= 0 {
            return Err(SessionError::InvalidReps(reps));
        }

        let store = self.store;
        // Without history no PR can be claimed, but the set is still logged.
        let max_ever = match store.get_all_logs(&[exercise_id]) {
            Ok(history) => max_weight(&history),
            Err(e) => {
                warn!(
                    "Could not read history of exercise {} for the PR check: {}",
                    exercise_id, e
                );
                0.0
            }
        };
        let personal_record = is_personal_record(max_ever, weight);

        let entry = NewLogEntry {
            exercise_id,
            weight_used: weight,
            reps_done: reps,
            notes: Some(if personal_record {
                PR_NOTE.to_string()
            } else {
                format!("Set {set_number}")
            }),
        };
        let log_id = match write_with_retry("set log", self.settings.write_retries, || {
            store.insert_log(&entry)
        }) {
            Ok(id) => Some(id),
            Err((attempts, source)) => match self.settings.on_write_failure {
                WriteFailurePolicy::Block => {
                    return Err(SessionError::WriteFailed { attempts, source });
                }
                WriteFailurePolicy::MarkUnsynced => {
                    warn!("Set {} of step {} marked as unsynced", set_number, step_index);
                    self.unsynced.push(UnsyncedWrite::Set { step_index });
                    None
                }
            },
        };

        info!(
            "Logged {}kg x {} for exercise {} (set {}){}",
            weight,
            reps,
            exercise_id,
            set_number,
            if personal_record { " - NEW PR" } else { "" }
        );

        self.enter_step(step_index + 1);
        Ok(SetResult {
            log_id,
            personal_record,
            state: self.state(),
        })
    }

    /// Ends the current rest immediately, discarding the remaining time.
    /// # Errors
    /// `NotResting` unless a rest is running, `AlreadyFinished` after the end.
    pub fn skip_rest(&mut self) -> Result<StandardState, SessionError> {
        match self.phase {
            Phase::Resting(i) => {
                debug!("Rest skipped with {:?}s left", self.countdown.remaining());
                self.countdown.cancel();
                self.enter_step(i + 1);
                Ok(self.state())
            }
            Phase::Active(_) => Err(SessionError::NotResting),
            Phase::Finished => Err(SessionError::AlreadyFinished),
        }
    }

    /// One second elapsed. Only does something while resting; reaching zero
    /// advances exactly like [`Self::skip_rest`].
    pub fn tick(&mut self) -> StandardState {
        if let Phase::Resting(i) = self.phase {
            if self.countdown.tick() == TickResult::Expired {
                debug!("Rest over, moving to step {}", i + 1);
                self.enter_step(i + 1);
            }
        }
        self.state()
    }

    /// Tears the player down without persisting anything else.
    pub fn abandon(mut self) {
        self.countdown.cancel();
        if !self.is_finished() {
            info!("Session '{}' abandoned", self.header.title);
        }
    }

    fn enter_step(&mut self, index: usize) {
        match self.plan.get(index).cloned() {
            None => self.finish(),
            Some(Step::Rest {
                duration_seconds, ..
            }) => {
                self.phase = Phase::Resting(index);
                self.countdown.arm(duration_seconds);
            }
            Some(Step::Work { exercise, target }) => {
                self.countdown.cancel();
                self.phase = Phase::Active(index);
                let target_reps = match &target {
                    WorkTarget::Set { target_reps, .. } => target_reps.as_str(),
                    WorkTarget::Timed { .. } => "",
                };
                self.load_prefill(exercise.id, target_reps);
            }
        }
    }

    fn load_prefill(&mut self, exercise_id: i64, target_reps: &str) {
        let last = match self.store.get_latest_log(exercise_id) {
            Ok(last) => last,
            Err(e) => {
                warn!(
                    "Could not read last performance for exercise {}: {}. Using targets.",
                    exercise_id, e
                );
                None
            }
        };
        self.input = SetInput::prefill(last.as_ref(), target_reps);
        self.last_performance = last.as_ref().map(LastPerformance::from);
    }

    fn finish(&mut self) {
        if self.report.is_some() {
            return;
        }
        self.countdown.cancel();
        self.phase = Phase::Finished;

        let (calories, summary) = write_summary(self.store, &self.header, &self.settings);
        let mut unsynced = self.unsynced.clone();
        if summary.is_none() {
            unsynced.push(UnsyncedWrite::Summary);
        }
        info!(
            "Session '{}' finished, {} kcal",
            self.header.title, calories
        );
        self.report = Some(FinishReport {
            summary,
            calories,
            unsynced,
        });
    }
}
