// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Guided workout sessions in your terminal", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print list output as CSV instead of a table
    #[arg(long, global = true)]
    pub export_csv: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DifficultyCli {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeekdayCli {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeCli {
    Default,
    Bbl,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteFailureCli {
    /// Keep the set on screen until it is saved
    Block,
    /// Move on and report the set as unsaved at the end
    MarkUnsynced,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a workout. Without an ID, plays today's scheduled workout.
    Start {
        workout_id: Option<i64>,
    },
    /// Define a new exercise
    CreateExercise {
        /// Name of the exercise (e.g., "Bench Press")
        #[arg(short, long)]
        name: String,
        /// Main muscle worked
        #[arg(short, long)]
        muscle: Option<String>,
        /// Technique tip shown during the set
        #[arg(short, long)]
        tips: Option<String>,
    },
    /// List defined exercises
    ListExercises,
    /// Create an empty workout. Titles containing "circuit" or "abs" play as timed circuits.
    CreateWorkout {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, value_enum, default_value_t = DifficultyCli::Beginner)]
        difficulty: DifficultyCli,
        /// Estimated duration in minutes, used for calories
        #[arg(long, default_value_t = 45)]
        duration: u32,
    },
    /// Attach an exercise to a workout
    AddExercise {
        /// Workout ID
        workout_id: i64,
        /// Exercise name or ID
        exercise: String,
        #[arg(short, long, default_value_t = 3)]
        sets: u32,
        /// Rep target ("8-12") or, for circuits, a duration ("45s")
        #[arg(short, long)]
        reps: String,
        /// Rest after each set, in seconds
        #[arg(long, default_value_t = 60)]
        rest: u32,
        /// Position in the workout (appended when omitted)
        #[arg(long)]
        order: Option<i64>,
    },
    /// List workouts
    ListWorkouts,
    /// Show a workout and the steps it will play
    ShowWorkout {
        workout_id: i64,
    },
    DeleteWorkout {
        /// ID of the workout to delete
        workout_id: i64,
    },
    /// Plan a workout on a day of the week
    Schedule {
        #[arg(value_enum)]
        day: WeekdayCli,
        workout_id: i64,
    },
    /// Show today's scheduled workout
    Today,
    /// Show every logged set of an exercise
    History {
        /// Exercise name or ID
        exercise: String,
    },
    /// Personal records, recent sessions and weekly frequency
    Stats,
    /// Set calories burned per minute of workout
    SetCalories {
        per_minute: u32,
    },
    /// Choose what happens when a set can't be saved
    SetWriteFailure {
        #[arg(value_enum)]
        policy: WriteFailureCli,
    },
    /// Set the accent colour of a theme
    SetAccent {
        #[arg(value_enum)]
        theme: ThemeCli,
        /// Colour name (e.g., "Green", "Magenta")
        color: String,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    /// Print a shell completion script to stdout
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn start_without_id_means_today() {
        let cli = Cli::try_parse_from(["session-athlete", "start"]).unwrap();
        assert!(matches!(cli.command, Commands::Start { workout_id: None }));
    }

    #[test]
    fn add_exercise_defaults() {
        let cli = Cli::try_parse_from([
            "session-athlete",
            "add-exercise",
            "1",
            "Bench Press",
            "--reps",
            "8-12",
        ])
        .unwrap();
        match cli.command {
            Commands::AddExercise {
                workout_id,
                exercise,
                sets,
                reps,
                rest,
                order,
            } => {
                assert_eq!(workout_id, 1);
                assert_eq!(exercise, "Bench Press");
                assert_eq!(sets, 3);
                assert_eq!(reps, "8-12");
                assert_eq!(rest, 60);
                assert_eq!(order, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
