// src/model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Note stored on a log entry that beat every previous weight for its exercise.
pub const PR_NOTE: &str = "NEW PR";
/// Note stored on the placeholder entry written when a circuit is completed.
pub const CIRCUIT_COMPLETE_NOTE: &str = "CIRCUIT COMPLETE";

const CIRCUIT_KEYWORDS: [&str; 2] = ["circuit", "abs"];
const BBL_KEYWORD: &str = "bbl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub muscle_target: Option<String>,
    pub tips: Option<String>, // Technique tip shown during the set
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

// Convert string from DB to Difficulty
impl TryFrom<&str> for Difficulty {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => anyhow::bail!("Invalid difficulty string from DB: {}", value),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "Beginner"),
            Self::Intermediate => write!(f, "Intermediate"),
            Self::Advanced => write!(f, "Advanced"),
        }
    }
}

/// One exercise's configuration inside a specific workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub exercise: Exercise,
    pub order_index: i64,
    pub sets: u32,
    /// Either a rep range ("8-12") or a hold duration ("45s").
    pub reps: String,
    pub rest_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub title: String,
    pub difficulty: Difficulty,
    pub duration_min: u32,
    /// Ordered by `order_index`.
    pub exercises: Vec<WorkoutExercise>,
}

impl Workout {
    pub fn mode(&self) -> SessionMode {
        SessionMode::from_title(&self.title)
    }

    pub fn theme(&self) -> Theme {
        Theme::from_title(&self.title)
    }
}

/// How a workout is played, decided once from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    Standard,
    Circuit,
}

impl SessionMode {
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let lowered = title.to_lowercase();
        if CIRCUIT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            Self::Circuit
        } else {
            Self::Standard
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Circuit => write!(f, "circuit"),
        }
    }
}

/// Cosmetic accent selection. Has no effect on session behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Default,
    Bbl,
}

impl Theme {
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        if title.to_lowercase().contains(BBL_KEYWORD) {
            Self::Bbl
        } else {
            Self::Default
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceLogEntry {
    pub id: i64,
    pub exercise_id: i64,
    pub weight_used: f64, // kg
    pub reps_done: i64,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl PerformanceLogEntry {
    pub fn is_pr(&self) -> bool {
        self.notes.as_deref().is_some_and(|n| n.contains("PR"))
    }

    pub fn is_circuit_marker(&self) -> bool {
        self.notes.as_deref() == Some(CIRCUIT_COMPLETE_NOTE)
    }
}

/// A log entry about to be appended. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub exercise_id: i64,
    pub weight_used: f64,
    pub reps_done: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSessionSummary {
    pub id: i64,
    pub workout_id: i64,
    pub duration_min: u32,
    pub calories: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCompletedSession {
    pub workout_id: i64,
    pub duration_min: u32,
    pub calories: u32,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_mode_is_picked_from_title_keywords() {
        assert_eq!(SessionMode::from_title("Abs Circuit"), SessionMode::Circuit);
        assert_eq!(SessionMode::from_title("Morning ABS"), SessionMode::Circuit);
        assert_eq!(SessionMode::from_title("Full body circuit"), SessionMode::Circuit);
        assert_eq!(SessionMode::from_title("Push Day"), SessionMode::Standard);
    }

    #[test]
    fn bbl_theme_is_cosmetic_and_independent_of_mode() {
        assert_eq!(Theme::from_title("BBL Glutes"), Theme::Bbl);
        assert_eq!(SessionMode::from_title("BBL Glutes"), SessionMode::Standard);
        assert_eq!(Theme::from_title("bbl abs burner"), Theme::Bbl);
        assert_eq!(SessionMode::from_title("bbl abs burner"), SessionMode::Circuit);
        assert_eq!(Theme::from_title("Leg Day"), Theme::Default);
    }

    #[test]
    fn difficulty_round_trips_through_display() {
        for d in [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced] {
            assert_eq!(Difficulty::try_from(d.to_string().as_str()).unwrap(), d);
        }
        assert!(Difficulty::try_from("insane").is_err());
    }
}
