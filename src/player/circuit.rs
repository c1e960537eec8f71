// src/player/circuit.rs
use tracing::{debug, info, warn};

use super::{
    write_summary, write_with_retry, FinishReport, SessionError, SessionHeader, SessionSettings,
    UnsyncedWrite,
};
use crate::countdown::{Countdown, TickResult};
use crate::model::{NewLogEntry, CIRCUIT_COMPLETE_NOTE};
use crate::plan::{SessionPlan, Step, DEFAULT_CIRCUIT_SECONDS};
use crate::store::HistoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Running {
        step_index: usize,
        seconds_remaining: u32,
        paused: bool,
    },
    Finished,
}

/// Timed round-robin player. WORK and REST steps are both plain countdowns.
pub struct CircuitPlayer<'s, S: HistoryStore + ?Sized> {
    store: &'s S,
    header: SessionHeader,
    plan: SessionPlan,
    settings: SessionSettings,
    current: Option<usize>,
    countdown: Countdown,
    report: Option<FinishReport>,
}

impl<'s, S: HistoryStore + ?Sized> CircuitPlayer<'s, S> {
    /// Starts the countdown of the first station.
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
            "Starting circuit '{}' ({} steps)",
            header.title,
            plan.len()
        );
        let mut player = Self {
            store,
            header,
            plan,
            settings,
            current: None,
            countdown: Countdown::new(),
            report: None,
        };
        player.enter_step(0, false);
        Ok(player)
    }

    pub fn state(&self) -> CircuitState {
        match self.current {
            Some(step_index) => CircuitState::Running {
                step_index,
                seconds_remaining: self.countdown.remaining().unwrap_or(0),
                paused: self.countdown.is_paused(),
            },
            None => CircuitState::Finished,
        }
    }

    pub const fn header(&self) -> &SessionHeader {
        &self.header
    }

    pub const fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current.and_then(|i| self.plan.get(i))
    }

    pub const fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    pub fn finish_report(&self) -> Option<&FinishReport> {
        self.report.as_ref()
    }

    /// One second elapsed. Ignored while paused or finished.
    pub fn tick(&mut self) -> CircuitState {
        if let Some(i) = self.current {
            if self.countdown.tick() == TickResult::Expired {
                debug!("Step {} over", i);
                self.enter_step(i + 1, false);
            }
        }
        self.state()
    }

    /// Moves to the next step right away. A paused circuit stays paused.
    /// # Errors
    /// `AlreadyFinished` after the last step.
    pub fn skip(&mut self) -> Result<CircuitState, SessionError> {
        let i = self.current.ok_or(SessionError::AlreadyFinished)?;
        let paused = self.countdown.is_paused();
        self.enter_step(i + 1, paused);
        Ok(self.state())
    }

    /// Pauses or resumes without touching the remaining time.
    /// # Errors
    /// `AlreadyFinished` after the last step.
    pub fn toggle_pause(&mut self) -> Result<CircuitState, SessionError> {
        if self.current.is_none() {
            return Err(SessionError::AlreadyFinished);
        }
        let paused = !self.countdown.is_paused();
        self.countdown.set_paused(paused);
        debug!("Circuit {}", if paused { "paused" } else { "resumed" });
        Ok(self.state())
    }

    /// Tears the player down without persisting anything.
    pub fn abandon(mut self) {
        self.countdown.cancel();
        if !self.is_finished() {
            info!("Circuit '{}' abandoned", self.header.title);
        }
    }

    fn enter_step(&mut self, index: usize, paused: bool) {
        match self.plan.get(index) {
            Some(step) => {
                let seconds = step.duration_seconds().unwrap_or(DEFAULT_CIRCUIT_SECONDS);
                self.current = Some(index);
                self.countdown.arm(seconds);
                self.countdown.set_paused(paused);
            }
            None => self.finish(),
        }
    }

    fn finish(&mut self) {
        if self.report.is_some() {
            return;
        }
        self.countdown.cancel();
        self.current = None;

        let (calories, summary) = write_summary(self.store, &self.header, &self.settings);
        let mut unsynced = Vec::new();
        if summary.is_none() {
            unsynced.push(UnsyncedWrite::Summary);
        }

        // Statistics only need to know a circuit happened, so a single
        // zero-weight marker on the first station is enough.
        if let Some(first) = self.plan.steps().iter().find_map(Step::exercise) {
            let marker = NewLogEntry {
                exercise_id: first.id,
                weight_used: 0.0,
                reps_done: 0,
                notes: Some(CIRCUIT_COMPLETE_NOTE.to_string()),
            };
            let store = self.store;
            if write_with_retry("circuit marker", self.settings.write_retries, || {
                store.insert_log(&marker)
            })
            .is_err()
            {
                warn!("Circuit completion marker not stored");
                unsynced.push(UnsyncedWrite::CircuitMarker);
            }
        }

        info!(
            "Circuit '{}' finished, {} kcal",
            self.header.title, calories
        );
        self.report = Some(FinishReport {
            summary,
            calories,
            unsynced,
        });
    }
}
