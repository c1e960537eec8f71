// src/store.rs
use rusqlite::Connection;

use crate::db::{self, DbError};
use crate::model::{NewCompletedSession, NewLogEntry, PerformanceLogEntry, Workout};

/// Read/write contract the session player needs from the performance history
/// and workout catalog. Calls are made one at a time, never concurrently.
pub trait HistoryStore {
    /// Workout with its exercises ordered by `order_index`, `None` if unknown.
    fn get_workout_by_id(&self, id: i64) -> Result<Option<Workout>, DbError>;

    /// Most recent entry by creation time.
    fn get_latest_log(&self, exercise_id: i64) -> Result<Option<PerformanceLogEntry>, DbError>;

    fn get_all_logs(&self, exercise_ids: &[i64]) -> Result<Vec<PerformanceLogEntry>, DbError>;

    fn insert_log(&self, entry: &NewLogEntry) -> Result<i64, DbError>;

    fn insert_completed_session(&self, summary: &NewCompletedSession) -> Result<i64, DbError>;
}

impl HistoryStore for Connection {
    fn get_workout_by_id(&self, id: i64) -> Result<Option<Workout>, DbError> {
        db::get_workout_by_id(self, id)
    }

    fn get_latest_log(&self, exercise_id: i64) -> Result<Option<PerformanceLogEntry>, DbError> {
        db::get_latest_log(self, exercise_id)
    }

    fn get_all_logs(&self, exercise_ids: &[i64]) -> Result<Vec<PerformanceLogEntry>, DbError> {
        db::get_all_logs(self, exercise_ids)
    }

    fn insert_log(&self, entry: &NewLogEntry) -> Result<i64, DbError> {
        db::insert_log(self, entry)
    }

    fn insert_completed_session(&self, summary: &NewCompletedSession) -> Result<i64, DbError> {
        db::insert_completed_session(self, summary)
    }
}
