// src/history.rs
//! Pre-fill and personal-record rules over an exercise's performance history.

use std::fmt;

use crate::model::PerformanceLogEntry;
use crate::plan::parse_rep_floor;

/// Values shown in the weight/reps fields of the current WORK step.
///
/// `weight` stays `None` for an exercise that was never logged: the user has
/// to type a weight before the first set can be validated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetInput {
    pub weight: Option<f64>,
    pub reps: Option<i64>,
}

impl SetInput {
    /// Pre-fill for a WORK step: the last performance when there is one,
    /// otherwise the floor of the rep target and an empty weight.
    pub fn prefill(last: Option<&PerformanceLogEntry>, target_reps: &str) -> Self {
        match last {
            Some(entry) => Self {
                weight: Some(entry.weight_used),
                reps: Some(entry.reps_done),
            },
            None => Self {
                weight: None,
                reps: parse_rep_floor(target_reps),
            },
        }
    }
}

/// Read-only reminder of the previous performance ("Last: 40kg x 10").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastPerformance {
    pub weight: f64,
    pub reps: i64,
}

impl From<&PerformanceLogEntry> for LastPerformance {
    fn from(entry: &PerformanceLogEntry) -> Self {
        Self {
            weight: entry.weight_used,
            reps: entry.reps_done,
        }
    }
}

impl fmt::Display for LastPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Last: {}kg x {}", self.weight, self.reps)
    }
}

/// Heaviest weight in the history, 0 when there is none.
pub fn max_weight<'a, I>(history: I) -> f64
where
    I: IntoIterator<Item = &'a PerformanceLogEntry>,
{
    history
        .into_iter()
        .map(|e| e.weight_used)
        .fold(0.0, f64::max)
}

/// A weight is a PR when it strictly beats a previous, non-zero maximum.
/// The first ever log of an exercise has nothing to beat.
pub fn is_personal_record(max_ever: f64, weight: f64) -> bool {
    max_ever > 0.0 && weight > max_ever
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log(weight: f64, reps: i64) -> PerformanceLogEntry {
        PerformanceLogEntry {
            id: 0,
            exercise_id: 1,
            weight_used: weight,
            reps_done: reps,
            created_at: Utc::now(),
            notes: None,
        }
    }

    #[test]
    fn pr_requires_beating_previous_max() {
        let history = vec![log(10.0, 8), log(12.0, 8), log(15.0, 6)];
        let max = max_weight(&history);
        assert_eq!(max, 15.0);
        assert!(!is_personal_record(max, 14.0));
        assert!(!is_personal_record(max, 15.0));
        assert!(is_personal_record(max, 20.0));
    }

    #[test]
    fn first_log_is_never_a_pr() {
        let max = max_weight(&Vec::<PerformanceLogEntry>::new());
        assert_eq!(max, 0.0);
        assert!(!is_personal_record(max, 5.0));
    }

    #[test]
    fn prefill_uses_last_performance() {
        let last = log(40.0, 10);
        let input = SetInput::prefill(Some(&last), "8-12");
        assert_eq!(input.weight, Some(40.0));
        assert_eq!(input.reps, Some(10));
        assert_eq!(LastPerformance::from(&last).to_string(), "Last: 40kg x 10");
    }

    #[test]
    fn prefill_without_history_leaves_weight_empty() {
        let input = SetInput::prefill(None, "8-12");
        assert_eq!(input.weight, None);
        assert_eq!(input.reps, Some(8));
    }
}
