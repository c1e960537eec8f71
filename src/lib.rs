use anyhow::{bail, Context, Result};
use chrono::{Datelike, Weekday};
use comfy_table::Color;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// --- Declare modules ---
pub mod config;
pub mod console;
pub mod countdown;
pub mod db;
pub mod history;
pub mod model;
pub mod plan;
pub mod player;
pub mod runtime;
pub mod session;
pub mod store;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load_config as load_config_util, parse_color,
    save_config as save_config_util, Config, ConfigError, StandardColor, ThemeConfig,
    WriteFailurePolicy,
};
pub use db::{get_db_path as get_db_path_util, DbError};
pub use model::{
    CompletedSessionSummary, Difficulty, Exercise, PerformanceLogEntry, SessionMode, Theme,
    Workout, WorkoutExercise,
};
pub use player::{FinishReport, SessionError, SessionHeader, SessionSettings, UnsyncedWrite};
pub use session::{enter_session, NavigationShell, Session};
pub use store::HistoryStore;

/// How many completed sessions the progress summary lists.
const RECENT_SESSIONS_LIMIT: u32 = 10;
const FREQUENCY_WINDOW_DAYS: i64 = 7;

/// Best weight ever lifted on one exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRecord {
    pub exercise: Exercise,
    pub max_weight: f64,
}

/// Numbers behind the progress page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    /// Only exercises with a non-zero best are listed.
    pub personal_records: Vec<ExerciseRecord>,
    pub recent_sessions: Vec<CompletedSessionSummary>,
    pub pr_log_count: i64,
    pub sessions_last_7_days: i64,
}

impl ProgressSummary {
    pub fn recent_calories(&self) -> u32 {
        self.recent_sessions.iter().map(|s| s.calories).sum()
    }
}

pub struct AppService {
    pub config: Config,
    pub conn: Connection,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

/// Day index used by the weekly plan (0 = Sunday).
pub fn day_index(day: Weekday) -> u32 {
    day.num_days_from_sunday()
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let conn = db::open_db(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        db::init_db(&conn).context("Failed to initialize database schema")?;

        Ok(Self {
            config,
            conn,
            db_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save_config(&self.config_path, &self.config)
    }

    /// Sets the calorie factor used for session summaries.
    /// # Errors
    /// - `ConfigError::InvalidCalorieFactor` if `per_minute` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_calories_per_minute(&mut self, per_minute: u32) -> Result<(), ConfigError> {
        if per_minute == 0 {
            return Err(ConfigError::InvalidCalorieFactor);
        }
        self.config.calories_per_minute = per_minute;
        self.save_config()
    }

    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_write_failure_policy(&mut self, policy: WriteFailurePolicy) -> Result<(), ConfigError> {
        self.config.on_write_failure = policy;
        self.save_config()
    }

    /// Sets the accent colour of a theme.
    /// # Errors
    /// - `ConfigError::InvalidColor` for unknown colour names.
    /// - `ConfigError` variants if saving fails.
    pub fn set_theme_accent(&mut self, theme: Theme, color: &str) -> Result<(), ConfigError> {
        let parsed = parse_color(color)?;
        let name = format!("{parsed:?}");
        match theme {
            Theme::Default => self.config.theme.default_accent = name,
            Theme::Bbl => self.config.theme.bbl_accent = name,
        }
        self.save_config()
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::from(&self.config)
    }

    /// Accent colour for a workout theme, falling back to white on a bad config value.
    pub fn accent_color(&self, theme: Theme) -> Color {
        self.config.theme.accent_for(theme).unwrap_or_else(|e| {
            warn!("{e}, using white accent");
            Color::White
        })
    }

    // --- Catalog ---

    /// # Errors
    /// - `DbError::ExerciseNameNotUnique` if the name is taken.
    /// - Other `DbError` variants on store failure.
    pub fn create_exercise(
        &self,
        name: &str,
        muscle_target: Option<&str>,
        tips: Option<&str>,
    ) -> Result<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        let id = db::create_exercise(&self.conn, trimmed, muscle_target, tips)
            .with_context(|| format!("Failed to create exercise '{trimmed}'"))?;
        info!("Created exercise '{}' ({})", trimmed, id);
        Ok(id)
    }

    pub fn list_exercises(&self) -> Result<Vec<Exercise>> {
        db::list_exercises(&self.conn).context("Failed to list exercises")
    }

    /// Resolves an exercise by ID or case-insensitive name.
    /// # Errors
    /// `DbError::ExerciseNotFound` when nothing matches.
    pub fn resolve_exercise(&self, identifier: &str) -> Result<Exercise> {
        db::get_exercise_by_identifier(&self.conn, identifier.trim())
            .context("Failed to look up exercise")?
            .ok_or_else(|| DbError::ExerciseNotFound(identifier.to_string()).into())
    }

    pub fn create_workout(
        &self,
        title: &str,
        difficulty: Difficulty,
        duration_min: u32,
    ) -> Result<i64> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            bail!("Workout title cannot be empty.");
        }
        let id = db::create_workout(&self.conn, trimmed, difficulty, duration_min)
            .with_context(|| format!("Failed to create workout '{trimmed}'"))?;
        info!(
            "Created workout '{}' ({}, {} mode)",
            trimmed,
            id,
            SessionMode::from_title(trimmed)
        );
        Ok(id)
    }

    /// Attaches an exercise to a workout. Without `order_index` it goes last.
    /// # Errors
    /// - `bail!` when `sets` is 0 or `reps` is blank.
    /// - `DbError::WorkoutNotFound` / `DbError::ExerciseNotFound`.
    pub fn add_exercise_to_workout(
        &self,
        workout_id: i64,
        exercise_identifier: &str,
        sets: u32,
        reps: &str,
        rest_seconds: u32,
        order_index: Option<i64>,
    ) -> Result<i64> {
        if sets == 0 {
            bail!("An exercise needs at least one set.");
        }
        if reps.trim().is_empty() {
            bail!("Reps (or duration for circuits) cannot be empty.");
        }
        self.get_workout(workout_id)?;
        let exercise = self.resolve_exercise(exercise_identifier)?;
        db::add_workout_exercise(
            &self.conn,
            workout_id,
            exercise.id,
            order_index,
            sets,
            reps.trim(),
            rest_seconds,
        )
        .with_context(|| {
            format!("Failed to add '{}' to workout {workout_id}", exercise.name)
        })
    }

    pub fn list_workouts(&self) -> Result<Vec<Workout>> {
        db::list_workouts(&self.conn).context("Failed to list workouts")
    }

    /// # Errors
    /// `DbError::WorkoutNotFound` when the ID doesn't exist.
    pub fn get_workout(&self, workout_id: i64) -> Result<Workout> {
        db::get_workout_by_id(&self.conn, workout_id)
            .with_context(|| format!("Failed to load workout {workout_id}"))?
            .ok_or_else(|| DbError::WorkoutNotFound(workout_id).into())
    }

    /// Deletes a workout with its exercise bindings and schedule entries.
    /// Performance history is kept.
    pub fn delete_workout(&self, workout_id: i64) -> Result<u64> {
        let rows = db::delete_workout(&self.conn, workout_id)
            .with_context(|| format!("Failed to delete workout {workout_id}"))?;
        info!("Deleted workout {}", workout_id);
        Ok(rows)
    }

    // --- Weekly plan ---

    pub fn schedule_workout(&self, day: Weekday, workout_id: i64) -> Result<()> {
        db::schedule_workout(&self.conn, day_index(day), workout_id)
            .with_context(|| format!("Failed to schedule workout {workout_id} on {day}"))?;
        info!("Scheduled workout {} on {}", workout_id, day);
        Ok(())
    }

    /// Workout planned for `day`, if any.
    pub fn scheduled_workout(&self, day: Weekday) -> Result<Option<Workout>> {
        let Some(id) = db::get_scheduled_workout_id(&self.conn, day_index(day))
            .context("Failed to read the weekly plan")?
        else {
            return Ok(None);
        };
        db::get_workout_by_id(&self.conn, id)
            .with_context(|| format!("Failed to load scheduled workout {id}"))
    }

    pub fn todays_workout(&self) -> Result<Option<Workout>> {
        self.scheduled_workout(chrono::Local::now().weekday())
    }

    // --- Sessions ---

    /// Loads the workout and starts the player its title calls for.
    /// # Errors
    /// See [`session::enter_session`].
    pub fn enter_session(&self, workout_id: i64) -> Result<Session<'_, Connection>, SessionError> {
        session::enter_session(&self.conn, workout_id, self.session_settings())
    }

    // --- History & progress ---

    /// Every log of one exercise, oldest first.
    pub fn exercise_history(&self, identifier: &str) -> Result<(Exercise, Vec<PerformanceLogEntry>)> {
        let exercise = self.resolve_exercise(identifier)?;
        let logs = db::get_all_logs(&self.conn, &[exercise.id])
            .with_context(|| format!("Failed to read history of '{}'", exercise.name))?;
        Ok((exercise, logs))
    }

    pub fn progress_summary(&self) -> Result<ProgressSummary> {
        let mut personal_records = Vec::new();
        for exercise in self.list_exercises()? {
            let best = db::get_max_weight_for_exercise(&self.conn, exercise.id)
                .with_context(|| format!("Failed to read records of '{}'", exercise.name))?;
            if let Some(max_weight) = best.filter(|w| *w > 0.0) {
                personal_records.push(ExerciseRecord {
                    exercise,
                    max_weight,
                });
            }
        }

        Ok(ProgressSummary {
            personal_records,
            recent_sessions: db::list_completed_sessions(&self.conn, RECENT_SESSIONS_LIMIT)
                .context("Failed to list completed sessions")?,
            pr_log_count: db::count_pr_logs(&self.conn).context("Failed to count records")?,
            sessions_last_7_days: db::count_sessions_since(&self.conn, FREQUENCY_WINDOW_DAYS)
                .context("Failed to count recent sessions")?,
        })
    }
}
