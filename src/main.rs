//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::Weekday;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};
use tracing_subscriber::EnvFilter;

use session_athlete_lib::console::ConsoleShell;
use session_athlete_lib::plan::{build_plan, Step, WorkTarget};
use session_athlete_lib::runtime::{FixedTicker, Runner, StdinEventSource};
use session_athlete_lib::{
    AppService, Difficulty, Exercise, PerformanceLogEntry, ProgressSummary, Theme, Workout,
    WriteFailurePolicy,
};

fn main() -> Result<()> {
    // Logs go to stderr so they never mix with the session prompt.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Start { workout_id } => {
            let workout_id = match workout_id {
                Some(id) => id,
                None => match service.todays_workout()? {
                    Some(workout) => workout.id,
                    None => bail!("Nothing scheduled today. Pass a workout ID or use 'schedule'."),
                },
            };
            let session = service
                .enter_session(workout_id)
                .with_context(|| format!("Could not start workout {workout_id}"))?;
            let accent = service.accent_color(session.header().theme);
            let runner = Runner::new(StdinEventSource::new(), FixedTicker::seconds());
            let mut shell = ConsoleShell::new(stdout(), accent);
            shell
                .drive(session, &runner)
                .context("Console output failed during the session")?;
        }
        cli::Commands::CreateExercise { name, muscle, tips } => {
            let id = service.create_exercise(&name, muscle.as_deref(), tips.as_deref())?;
            println!("Created exercise '{}' with ID {}", name.trim(), id);
        }
        cli::Commands::ListExercises => {
            let exercises = service.list_exercises()?;
            if exercises.is_empty() {
                println!("No exercises defined yet.");
            } else if export_csv {
                print_exercises_csv(exercises)?;
            } else {
                print_exercise_table(exercises);
            }
        }
        cli::Commands::CreateWorkout {
            title,
            difficulty,
            duration,
        } => {
            let id = service.create_workout(&title, cli_difficulty(difficulty), duration)?;
            println!("Created workout '{}' with ID {}", title.trim(), id);
        }
        cli::Commands::AddExercise {
            workout_id,
            exercise,
            sets,
            reps,
            rest,
            order,
        } => {
            service.add_exercise_to_workout(workout_id, &exercise, sets, &reps, rest, order)?;
            println!("Added '{exercise}' to workout {workout_id}: {sets} x {reps}, rest {rest}s");
        }
        cli::Commands::ListWorkouts => {
            let workouts = service.list_workouts()?;
            if workouts.is_empty() {
                println!("No workouts yet. Create one with 'create-workout'.");
            } else if export_csv {
                print_workouts_csv(workouts)?;
            } else {
                print_workout_table(workouts, service.accent_color(Theme::Default));
            }
        }
        cli::Commands::ShowWorkout { workout_id } => {
            let workout = service.get_workout(workout_id)?;
            print_workout_plan(&workout, service.accent_color(workout.theme()))?;
        }
        cli::Commands::DeleteWorkout { workout_id } => {
            service.delete_workout(workout_id)?;
            println!("Deleted workout {workout_id}");
        }
        cli::Commands::Schedule { day, workout_id } => {
            let weekday = cli_weekday(day);
            service.schedule_workout(weekday, workout_id)?;
            println!("Workout {workout_id} planned on {weekday}");
        }
        cli::Commands::Today => match service.todays_workout()? {
            Some(workout) => {
                println!(
                    "Today: {} (ID {}, {}, {} min). Run 'session-athlete start' to begin.",
                    workout.title, workout.id, workout.difficulty, workout.duration_min
                );
            }
            None => println!("Rest day, nothing scheduled."),
        },
        cli::Commands::History { exercise } => {
            let (exercise, logs) = service.exercise_history(&exercise)?;
            if logs.is_empty() {
                println!("No history for '{}' yet.", exercise.name);
            } else if export_csv {
                print_history_csv(logs)?;
            } else {
                print_history_table(&exercise, logs, service.accent_color(Theme::Default));
            }
        }
        cli::Commands::Stats => {
            let summary = service.progress_summary()?;
            print_progress(&summary, service.accent_color(Theme::Default));
        }
        cli::Commands::SetCalories { per_minute } => {
            service.set_calories_per_minute(per_minute)?;
            println!("Calories per minute set to {per_minute}");
        }
        cli::Commands::SetWriteFailure { policy } => {
            let policy = match policy {
                cli::WriteFailureCli::Block => WriteFailurePolicy::Block,
                cli::WriteFailureCli::MarkUnsynced => WriteFailurePolicy::MarkUnsynced,
            };
            service.set_write_failure_policy(policy)?;
            println!("Write failure policy set to {policy:?}");
        }
        cli::Commands::SetAccent { theme, color } => {
            let theme = match theme {
                cli::ThemeCli::Default => Theme::Default,
                cli::ThemeCli::Bbl => Theme::Bbl,
            };
            service.set_theme_accent(theme, &color)?;
            println!("Accent for {theme:?} theme set to {color}");
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.get_db_path());
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }

    Ok(())
}

const fn cli_difficulty(difficulty: cli::DifficultyCli) -> Difficulty {
    match difficulty {
        cli::DifficultyCli::Beginner => Difficulty::Beginner,
        cli::DifficultyCli::Intermediate => Difficulty::Intermediate,
        cli::DifficultyCli::Advanced => Difficulty::Advanced,
    }
}

const fn cli_weekday(day: cli::WeekdayCli) -> Weekday {
    match day {
        cli::WeekdayCli::Sunday => Weekday::Sun,
        cli::WeekdayCli::Monday => Weekday::Mon,
        cli::WeekdayCli::Tuesday => Weekday::Tue,
        cli::WeekdayCli::Wednesday => Weekday::Wed,
        cli::WeekdayCli::Thursday => Weekday::Thu,
        cli::WeekdayCli::Friday => Weekday::Fri,
        cli::WeekdayCli::Saturday => Weekday::Sat,
    }
}

fn print_exercise_table(exercises: Vec<Exercise>) {
    let header_color = Color::Cyan;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Muscle").fg(header_color),
            Cell::new("Tip").fg(header_color),
        ]);
    for exercise in exercises {
        table.add_row(vec![
            Cell::new(exercise.id.to_string()),
            Cell::new(exercise.name),
            Cell::new(exercise.muscle_target.as_deref().unwrap_or("-")),
            Cell::new(exercise.tips.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_workout_table(workouts: Vec<Workout>, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("Title").fg(header_color),
            Cell::new("Difficulty").fg(header_color),
            Cell::new("Duration (min)").fg(header_color),
            Cell::new("Mode").fg(header_color),
            Cell::new("Exercises").fg(header_color),
        ]);
    for workout in workouts {
        table.add_row(vec![
            Cell::new(workout.id.to_string()),
            Cell::new(&workout.title),
            Cell::new(workout.difficulty.to_string()),
            Cell::new(workout.duration_min.to_string()),
            Cell::new(workout.mode().to_string()),
            Cell::new(workout.exercises.len().to_string()),
        ]);
    }
    println!("{table}");
}

fn print_workout_plan(workout: &Workout, header_color: Color) -> Result<()> {
    println!(
        "{} ({}, {} min, {} mode)",
        workout.title,
        workout.difficulty,
        workout.duration_min,
        workout.mode()
    );
    if workout.exercises.is_empty() {
        println!("No exercises yet. Add some with 'add-exercise'.");
        return Ok(());
    }
    let plan = build_plan(workout.mode(), &workout.exercises)
        .with_context(|| format!("Workout {} can't be played as configured", workout.id))?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new("Step").fg(header_color),
            Cell::new("Target").fg(header_color),
        ]);
    for (i, step) in plan.steps().iter().enumerate() {
        let (name, target) = match step {
            Step::Work {
                exercise,
                target:
                    WorkTarget::Set {
                        set_number,
                        total_sets,
                        target_reps,
                    },
            } => (
                exercise.name.clone(),
                format!("set {set_number}/{total_sets}, {target_reps} reps"),
            ),
            Step::Work {
                exercise,
                target:
                    WorkTarget::Timed {
                        round_number,
                        total_rounds,
                        duration_seconds,
                    },
            } => (
                exercise.name.clone(),
                format!("round {round_number}/{total_rounds}, {duration_seconds}s"),
            ),
            Step::Rest {
                duration_seconds,
                next_label,
            } => (
                format!("Rest, then {next_label}"),
                format!("{duration_seconds}s"),
            ),
        };
        table.add_row(vec![Cell::new((i + 1).to_string()), Cell::new(name), Cell::new(target)]);
    }
    println!("{table}");
    Ok(())
}

fn print_history_table(exercise: &Exercise, logs: Vec<PerformanceLogEntry>, header_color: Color) {
    println!("History of '{}'", exercise.name);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Timestamp (UTC)").fg(header_color),
            Cell::new("Weight (kg)").fg(header_color),
            Cell::new("Reps").fg(header_color),
            Cell::new("Notes").fg(header_color),
        ]);
    for log in logs {
        let notes = log.notes.as_deref().unwrap_or("-");
        let notes_cell = if log.is_pr() {
            Cell::new(notes).fg(Color::Yellow)
        } else {
            Cell::new(notes)
        };
        table.add_row(vec![
            Cell::new(log.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(format!("{:.2}", log.weight_used)),
            Cell::new(log.reps_done.to_string()),
            notes_cell,
        ]);
    }
    println!("{table}");
}

fn print_progress(summary: &ProgressSummary, header_color: Color) {
    println!(
        "Sessions in the last 7 days: {} | Records set: {} | Calories (recent): {}",
        summary.sessions_last_7_days,
        summary.pr_log_count,
        summary.recent_calories()
    );

    if summary.personal_records.is_empty() {
        println!("No personal records yet.");
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Exercise").fg(header_color),
                Cell::new("Best (kg)").fg(header_color),
            ]);
        for record in &summary.personal_records {
            table.add_row(vec![
                Cell::new(&record.exercise.name),
                Cell::new(format!("{:.2}", record.max_weight)),
            ]);
        }
        println!("{table}");
    }

    if !summary.recent_sessions.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Completed (UTC)").fg(header_color),
                Cell::new("Workout").fg(header_color),
                Cell::new("Duration (min)").fg(header_color),
                Cell::new("Calories").fg(header_color),
            ]);
        for session in &summary.recent_sessions {
            table.add_row(vec![
                Cell::new(session.completed_at.format("%Y-%m-%d %H:%M").to_string()),
                Cell::new(session.workout_id.to_string()),
                Cell::new(session.duration_min.to_string()),
                Cell::new(session.calories.to_string()),
            ]);
        }
        println!("{table}");
    }
}

fn print_exercises_csv(exercises: Vec<Exercise>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Name", "Muscle", "Tip"])?;
    for exercise in exercises {
        writer.write_record([
            exercise.id.to_string(),
            exercise.name,
            exercise.muscle_target.unwrap_or_default(),
            exercise.tips.unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_workouts_csv(workouts: Vec<Workout>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Title", "Difficulty", "Duration_min", "Mode", "Exercises"])?;
    for workout in workouts {
        writer.write_record([
            workout.id.to_string(),
            workout.title.clone(),
            workout.difficulty.to_string(),
            workout.duration_min.to_string(),
            workout.mode().to_string(),
            workout.exercises.len().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_history_csv(logs: Vec<PerformanceLogEntry>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Timestamp", "Weight_kg", "Reps", "Notes"])?;
    for log in logs {
        writer.write_record([
            log.created_at.to_rfc3339(),
            log.weight_used.to_string(),
            log.reps_done.to_string(),
            log.notes.unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
