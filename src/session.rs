// src/session.rs
use tracing::{debug, info};

use crate::model::{CompletedSessionSummary, SessionMode};
use crate::plan::build_plan;
use crate::player::{
    CircuitPlayer, FinishReport, SessionError, SessionHeader, SessionSettings, StandardPlayer,
};
use crate::store::HistoryStore;

/// Whoever routes the user into a session and takes control back afterwards.
pub trait NavigationShell {
    /// Called once when the session reached its end. `summary` is `None` if it
    /// could not be stored.
    fn on_session_finished(
        &mut self,
        header: &SessionHeader,
        summary: Option<&CompletedSessionSummary>,
        report: &FinishReport,
    );

    /// Called when the user leaves before the end. Only sets validated so far
    /// have been stored.
    fn on_session_abandoned(&mut self, header: &SessionHeader);
}

/// A running session in whichever mode the workout's title selected.
pub enum Session<'s, S: HistoryStore + ?Sized> {
    Standard(StandardPlayer<'s, S>),
    Circuit(CircuitPlayer<'s, S>),
}

impl<S: HistoryStore + ?Sized> Session<'_, S> {
    pub fn header(&self) -> &SessionHeader {
        match self {
            Self::Standard(p) => p.header(),
            Self::Circuit(p) => p.header(),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.header().mode
    }

    pub fn is_finished(&self) -> bool {
        match self {
            Self::Standard(p) => p.is_finished(),
            Self::Circuit(p) => p.is_finished(),
        }
    }

    pub fn finish_report(&self) -> Option<&FinishReport> {
        match self {
            Self::Standard(p) => p.finish_report(),
            Self::Circuit(p) => p.finish_report(),
        }
    }

    /// Forwards a one-second tick to the active player.
    pub fn tick(&mut self) {
        match self {
            Self::Standard(p) => {
                p.tick();
            }
            Self::Circuit(p) => {
                p.tick();
            }
        }
    }

    /// Hands control back to the shell: finished sessions report their
    /// summary, anything else counts as abandoned.
    pub fn close(self, shell: &mut dyn NavigationShell) {
        let header = self.header().clone();
        match self.finish_report().cloned() {
            Some(report) => {
                shell.on_session_finished(&header, report.summary.as_ref(), &report);
            }
            None => {
                match self {
                    Self::Standard(p) => p.abandon(),
                    Self::Circuit(p) => p.abandon(),
                }
                shell.on_session_abandoned(&header);
            }
        }
    }
}

/// Loads a workout, builds its plan and starts the matching player.
/// # Errors
/// - `WorkoutNotFound` / `LoadFailed` when the workout can't be loaded.
/// - `EmptyPlan` when it has no exercises; no player is created.
/// - `InvalidPlan` when an exercise has no sets or an empty rep target.
pub fn enter_session<'s, S: HistoryStore + ?Sized>(
    store: &'s S,
    workout_id: i64,
    settings: SessionSettings,
) -> Result<Session<'s, S>, SessionError> {
    let workout = store
        .get_workout_by_id(workout_id)
        .map_err(|source| SessionError::LoadFailed {
            id: workout_id,
            source,
        })?
        .ok_or(SessionError::WorkoutNotFound(workout_id))?;

    if workout.exercises.is_empty() {
        return Err(SessionError::EmptyPlan(workout_id));
    }

    let header = SessionHeader::from(&workout);
    let plan = build_plan(header.mode, &workout.exercises)?;
    debug!(
        "Plan for '{}': {} work / {} rest steps",
        header.title,
        plan.work_count(),
        plan.rest_count()
    );
    info!("Entering {} session for workout {}", header.mode, workout_id);

    match header.mode {
        SessionMode::Standard => {
            StandardPlayer::start(store, header, plan, settings).map(Session::Standard)
        }
        SessionMode::Circuit => {
            CircuitPlayer::start(store, header, plan, settings).map(Session::Circuit)
        }
    }
}
