// src/db.rs
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{
    CompletedSessionSummary, Difficulty, Exercise, NewCompletedSession, NewLogEntry,
    PerformanceLogEntry, Workout, WorkoutExercise,
};

// Custom Error type for DB operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),
    #[error("Workout not found: ID {0}")]
    WorkoutNotFound(i64),
    #[error("Exercise '{0}' already exists (case-insensitive).")]
    ExerciseNameNotUnique(String),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

const DB_FILE_NAME: &str = "sessions.sqlite";
const APP_DATA_DIR: &str = "session-athlete";

/// Gets the path to the SQLite database file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let data_dir = dirs::data_dir().ok_or(DbError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::Connection)
}

/// Initializes the database tables if they don't exist.
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            muscle_target TEXT,
            tips TEXT
        );

        CREATE TABLE IF NOT EXISTS workouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            duration_min INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workout_exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            order_index INTEGER NOT NULL,
            sets INTEGER NOT NULL CHECK(sets >= 1),
            reps TEXT NOT NULL,
            rest_seconds INTEGER NOT NULL DEFAULT 0
        );

        -- Append-only: the session player never updates or deletes rows here
        CREATE TABLE IF NOT EXISTS performance_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id),
            weight_used REAL NOT NULL,
            reps_done INTEGER NOT NULL,
            created_at TEXT NOT NULL,          -- RFC3339
            notes TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_logs_exercise_created
            ON performance_logs (exercise_id, created_at);

        CREATE TABLE IF NOT EXISTS completed_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL,
            duration_min INTEGER NOT NULL,
            calories INTEGER NOT NULL,
            completed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workout_plan (
            day_of_week INTEGER PRIMARY KEY CHECK(day_of_week BETWEEN 0 AND 6), -- 0 = Sunday
            workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE
        );",
    )
    .map_err(DbError::Connection)
}

// Fixed precision keeps lexical ORDER BY on the TEXT column chronological.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, column: &'static str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::<dyn std::error::Error + Send + Sync>::from(format!("{column}: {e}")),
            )
        })
}

// ---- Exercise Functions ----

/// Creates a new exercise. Returns the ID.
pub fn create_exercise(
    conn: &Connection,
    name: &str,
    muscle_target: Option<&str>,
    tips: Option<&str>,
) -> Result<i64, DbError> {
    let result = conn.execute(
        "INSERT INTO exercises (name, muscle_target, tips) VALUES (?1, ?2, ?3)",
        params![name, muscle_target, tips],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(ref err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DbError::ExerciseNameNotUnique(name.to_string()))
        }
        Err(e) => Err(DbError::InsertFailed(e)),
    }
}

fn map_row_to_exercise(row: &Row) -> Result<Exercise, rusqlite::Error> {
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        muscle_target: row.get(2)?,
        tips: row.get(3)?,
    })
}

/// Retrieves an exercise by trying ID first, then name (case-insensitive).
pub fn get_exercise_by_identifier(
    conn: &Connection,
    identifier: &str,
) -> Result<Option<Exercise>, DbError> {
    let result = if let Ok(id) = identifier.parse::<i64>() {
        conn.query_row(
            "SELECT id, name, muscle_target, tips FROM exercises WHERE id = ?1",
            params![id],
            map_row_to_exercise,
        )
    } else {
        conn.query_row(
            "SELECT id, name, muscle_target, tips FROM exercises WHERE name = ?1 COLLATE NOCASE",
            params![identifier],
            map_row_to_exercise,
        )
    };
    result.optional().map_err(DbError::QueryFailed)
}

pub fn list_exercises(conn: &Connection) -> Result<Vec<Exercise>, DbError> {
    let mut stmt = conn
        .prepare("SELECT id, name, muscle_target, tips FROM exercises ORDER BY name ASC")
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map([], map_row_to_exercise)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

// ---- Workout Catalog Functions ----

pub fn create_workout(
    conn: &Connection,
    title: &str,
    difficulty: Difficulty,
    duration_min: u32,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO workouts (title, difficulty, duration_min) VALUES (?1, ?2, ?3)",
        params![title, difficulty.to_string(), duration_min],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Attaches an exercise to a workout. When `order_index` is `None` the
/// exercise is appended after the current last one.
pub fn add_workout_exercise(
    conn: &Connection,
    workout_id: i64,
    exercise_id: i64,
    order_index: Option<i64>,
    sets: u32,
    reps: &str,
    rest_seconds: u32,
) -> Result<i64, DbError> {
    let order_index = match order_index {
        Some(idx) => idx,
        None => conn
            .query_row(
                "SELECT COALESCE(MAX(order_index) + 1, 0) FROM workout_exercises WHERE workout_id = ?1",
                params![workout_id],
                |row| row.get(0),
            )
            .map_err(DbError::QueryFailed)?,
    };
    conn.execute(
        "INSERT INTO workout_exercises (workout_id, exercise_id, order_index, sets, reps, rest_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![workout_id, exercise_id, order_index, sets, reps, rest_seconds],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

// Helper function to map a database row to a Workout header (no exercises yet)
fn map_row_to_workout(row: &Row) -> Result<Workout, rusqlite::Error> {
    let difficulty_str: String = row.get(2)?;
    let difficulty = Difficulty::try_from(difficulty_str.as_str()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e.to_string()),
        )
    })?;
    Ok(Workout {
        id: row.get(0)?,
        title: row.get(1)?,
        difficulty,
        duration_min: row.get(3)?,
        exercises: Vec::new(),
    })
}

fn map_row_to_workout_exercise(row: &Row) -> Result<WorkoutExercise, rusqlite::Error> {
    Ok(WorkoutExercise {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        order_index: row.get(2)?,
        sets: row.get(3)?,
        reps: row.get(4)?,
        rest_seconds: row.get(5)?,
        exercise: Exercise {
            id: row.get(6)?,
            name: row.get(7)?,
            muscle_target: row.get(8)?,
            tips: row.get(9)?,
        },
    })
}

fn list_workout_exercises(
    conn: &Connection,
    workout_id: i64,
) -> Result<Vec<WorkoutExercise>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT we.id, we.workout_id, we.order_index, we.sets, we.reps, we.rest_seconds,
                    e.id, e.name, e.muscle_target, e.tips
             FROM workout_exercises we
             JOIN exercises e ON e.id = we.exercise_id
             WHERE we.workout_id = ?1
             ORDER BY we.order_index ASC, we.id ASC",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![workout_id], map_row_to_workout_exercise)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

/// Loads a workout with its exercises ordered by `order_index`.
pub fn get_workout_by_id(conn: &Connection, id: i64) -> Result<Option<Workout>, DbError> {
    let header = conn
        .query_row(
            "SELECT id, title, difficulty, duration_min FROM workouts WHERE id = ?1",
            params![id],
            map_row_to_workout,
        )
        .optional()
        .map_err(DbError::QueryFailed)?;

    match header {
        Some(mut workout) => {
            workout.exercises = list_workout_exercises(conn, id)?;
            Ok(Some(workout))
        }
        None => Ok(None),
    }
}

/// Lists workouts (with exercises) ordered by title.
pub fn list_workouts(conn: &Connection) -> Result<Vec<Workout>, DbError> {
    let mut stmt = conn
        .prepare("SELECT id, title, difficulty, duration_min FROM workouts ORDER BY title ASC")
        .map_err(DbError::QueryFailed)?;
    let headers = stmt
        .query_map([], map_row_to_workout)
        .map_err(DbError::QueryFailed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)?;

    let mut workouts = Vec::with_capacity(headers.len());
    for mut workout in headers {
        workout.exercises = list_workout_exercises(conn, workout.id)?;
        workouts.push(workout);
    }
    Ok(workouts)
}

/// Deletes a workout. Its exercise bindings and schedule entries go with it.
pub fn delete_workout(conn: &Connection, id: i64) -> Result<u64, DbError> {
    let rows_affected = conn
        .execute("DELETE FROM workouts WHERE id = ?1", params![id])
        .map_err(DbError::DeleteFailed)?;
    if rows_affected == 0 {
        Err(DbError::WorkoutNotFound(id))
    } else {
        Ok(rows_affected as u64)
    }
}

// ---- Performance History Functions ----

fn map_row_to_log(row: &Row) -> Result<PerformanceLogEntry, rusqlite::Error> {
    let created_at: String = row.get(4)?;
    Ok(PerformanceLogEntry {
        id: row.get(0)?,
        exercise_id: row.get(1)?,
        weight_used: row.get(2)?,
        reps_done: row.get(3)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        notes: row.get(5)?,
    })
}

/// Most recent log entry for an exercise. Ties on timestamp go to the later insert.
pub fn get_latest_log(
    conn: &Connection,
    exercise_id: i64,
) -> Result<Option<PerformanceLogEntry>, DbError> {
    conn.query_row(
        "SELECT id, exercise_id, weight_used, reps_done, created_at, notes
         FROM performance_logs
         WHERE exercise_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
        params![exercise_id],
        map_row_to_log,
    )
    .optional()
    .map_err(DbError::QueryFailed)
}

/// All log entries for the given exercises, oldest first.
pub fn get_all_logs(
    conn: &Connection,
    exercise_ids: &[i64],
) -> Result<Vec<PerformanceLogEntry>, DbError> {
    if exercise_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; exercise_ids.len()].join(", ");
    let sql = format!(
        "SELECT id, exercise_id, weight_used, reps_done, created_at, notes
         FROM performance_logs
         WHERE exercise_id IN ({placeholders})
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params_from_iter(exercise_ids.iter()), map_row_to_log)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

/// Appends a log entry stamped with the current time. Returns the ID.
pub fn insert_log(conn: &Connection, entry: &NewLogEntry) -> Result<i64, DbError> {
    let timestamp = now_timestamp();
    conn.execute(
        "INSERT INTO performance_logs (exercise_id, weight_used, reps_done, created_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.exercise_id,
            entry.weight_used,
            entry.reps_done,
            timestamp,
            entry.notes
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Max weight ever logged for an exercise, `None` without history.
pub fn get_max_weight_for_exercise(
    conn: &Connection,
    exercise_id: i64,
) -> Result<Option<f64>, DbError> {
    conn.query_row(
        "SELECT MAX(weight_used) FROM performance_logs WHERE exercise_id = ?1",
        params![exercise_id],
        |row| row.get(0),
    )
    .map_err(DbError::QueryFailed)
}

/// Counts log entries tagged as personal records.
pub fn count_pr_logs(conn: &Connection) -> Result<i64, DbError> {
    conn.query_row(
        "SELECT COUNT(*) FROM performance_logs WHERE notes LIKE '%PR%'",
        [],
        |row| row.get(0),
    )
    .map_err(DbError::QueryFailed)
}

// ---- Completed Session Functions ----

fn map_row_to_summary(row: &Row) -> Result<CompletedSessionSummary, rusqlite::Error> {
    let completed_at: String = row.get(4)?;
    Ok(CompletedSessionSummary {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        duration_min: row.get(2)?,
        calories: row.get(3)?,
        completed_at: parse_timestamp(&completed_at, "completed_at")?,
    })
}

pub fn insert_completed_session(
    conn: &Connection,
    summary: &NewCompletedSession,
) -> Result<i64, DbError> {
    let timestamp = summary
        .completed_at
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    conn.execute(
        "INSERT INTO completed_sessions (workout_id, duration_min, calories, completed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            summary.workout_id,
            summary.duration_min,
            summary.calories,
            timestamp
        ],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Most recent completed sessions first.
pub fn list_completed_sessions(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<CompletedSessionSummary>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, workout_id, duration_min, calories, completed_at
             FROM completed_sessions
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )
        .map_err(DbError::QueryFailed)?;
    let rows = stmt
        .query_map(params![limit], map_row_to_summary)
        .map_err(DbError::QueryFailed)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

/// Number of sessions completed within the last `days` days.
pub fn count_sessions_since(conn: &Connection, days: i64) -> Result<i64, DbError> {
    let since = (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Micros, true);
    conn.query_row(
        "SELECT COUNT(*) FROM completed_sessions WHERE completed_at >= ?1",
        params![since],
        |row| row.get(0),
    )
    .map_err(DbError::QueryFailed)
}

// ---- Weekly Plan Functions ----

/// Assigns a workout to a day (0 = Sunday), replacing the previous assignment.
pub fn schedule_workout(conn: &Connection, day_of_week: u32, workout_id: i64) -> Result<(), DbError> {
    if get_workout_by_id(conn, workout_id)?.is_none() {
        return Err(DbError::WorkoutNotFound(workout_id));
    }
    conn.execute(
        "INSERT INTO workout_plan (day_of_week, workout_id) VALUES (?1, ?2)
         ON CONFLICT(day_of_week) DO UPDATE SET workout_id = excluded.workout_id",
        params![day_of_week, workout_id],
    )
    .map_err(DbError::InsertFailed)?;
    Ok(())
}

pub fn get_scheduled_workout_id(conn: &Connection, day_of_week: u32) -> Result<Option<i64>, DbError> {
    conn.query_row(
        "SELECT workout_id FROM workout_plan WHERE day_of_week = ?1",
        params![day_of_week],
        |row| row.get(0),
    )
    .optional()
    .map_err(DbError::QueryFailed)
}
