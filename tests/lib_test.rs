use anyhow::Result;
use chrono::Weekday;
use session_athlete_lib::{
    db, AppService, Config, ConfigError, DbError, Difficulty, SessionError, SessionMode, Theme,
    WriteFailurePolicy,
};

// Helper function to create a test service with in-memory database
fn create_test_service() -> Result<AppService> {
    let conn = rusqlite::Connection::open_in_memory()?;
    db::init_db(&conn)?;

    Ok(AppService {
        config: Config::default(),
        conn,
        db_path: ":memory:".into(),
        config_path: "test_config.toml".into(),
    })
}

fn push_day(service: &AppService) -> Result<i64> {
    service.create_exercise("Bench Press", Some("Chest"), Some("Shoulder blades back"))?;
    service.create_exercise("Dips", Some("Triceps"), None)?;
    let id = service.create_workout("Push Day", Difficulty::Intermediate, 45)?;
    service.add_exercise_to_workout(id, "Bench Press", 2, "8-12", 60, None)?;
    service.add_exercise_to_workout(id, "dips", 3, "10", 45, None)?;
    Ok(id)
}

#[test]
fn test_create_and_list_exercises() -> Result<()> {
    let service = create_test_service()?;

    service.create_exercise("Squat", Some("Legs"), None)?;
    service.create_exercise("Bench Press", Some("Chest"), Some("Feet planted"))?;

    let exercises = service.list_exercises()?;
    assert_eq!(exercises.len(), 2);
    // Sorted by name
    assert_eq!(exercises[0].name, "Bench Press");
    assert_eq!(exercises[0].tips.as_deref(), Some("Feet planted"));

    let by_name = service.resolve_exercise("squat")?;
    assert_eq!(by_name.muscle_target.as_deref(), Some("Legs"));
    let by_id = service.resolve_exercise(&by_name.id.to_string())?;
    assert_eq!(by_id, by_name);

    Ok(())
}

#[test]
fn test_exercise_names_are_unique_case_insensitive() -> Result<()> {
    let service = create_test_service()?;
    service.create_exercise("Plank", None, None)?;

    let err = service.create_exercise("PLANK", None, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DbError>(),
        Some(DbError::ExerciseNameNotUnique(_))
    ));
    assert!(service.create_exercise("   ", None, None).is_err());
    Ok(())
}

#[test]
fn test_workout_exercises_keep_insertion_order() -> Result<()> {
    let service = create_test_service()?;
    let id = push_day(&service)?;

    let workout = service.get_workout(id)?;
    assert_eq!(workout.title, "Push Day");
    assert_eq!(workout.difficulty, Difficulty::Intermediate);
    assert_eq!(workout.mode(), SessionMode::Standard);
    let names: Vec<_> = workout
        .exercises
        .iter()
        .map(|we| we.exercise.name.as_str())
        .collect();
    assert_eq!(names, ["Bench Press", "Dips"]);
    assert_eq!(workout.exercises[1].sets, 3);
    assert_eq!(workout.exercises[1].rest_seconds, 45);

    // Explicit order puts an exercise first
    service.create_exercise("Push-up", None, None)?;
    service.add_exercise_to_workout(id, "Push-up", 1, "15", 0, Some(-1))?;
    let workout = service.get_workout(id)?;
    assert_eq!(workout.exercises[0].exercise.name, "Push-up");

    Ok(())
}

#[test]
fn test_add_exercise_validation() -> Result<()> {
    let service = create_test_service()?;
    let id = push_day(&service)?;

    assert!(service
        .add_exercise_to_workout(id, "Bench Press", 0, "10", 60, None)
        .is_err());
    assert!(service
        .add_exercise_to_workout(id, "Bench Press", 3, "  ", 60, None)
        .is_err());

    let err = service
        .add_exercise_to_workout(id, "Deadlift", 3, "5", 120, None)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DbError>(),
        Some(DbError::ExerciseNotFound(_))
    ));

    let err = service
        .add_exercise_to_workout(999, "Bench Press", 3, "5", 120, None)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DbError>(),
        Some(DbError::WorkoutNotFound(999))
    ));
    Ok(())
}

#[test]
fn test_delete_workout_cascades_but_keeps_history() -> Result<()> {
    let service = create_test_service()?;
    let id = push_day(&service)?;
    service.schedule_workout(Weekday::Mon, id)?;

    // Log one set through a real session
    let bench = service.resolve_exercise("Bench Press")?;
    {
        let session = service.enter_session(id)?;
        let session_athlete_lib::Session::Standard(mut player) = session else {
            panic!("Push Day should play in standard mode");
        };
        player.validate_set(50.0, 8)?;
    }

    service.delete_workout(id)?;
    assert!(service.list_workouts()?.is_empty());
    assert!(service.scheduled_workout(Weekday::Mon)?.is_none());
    let bindings: i64 = service.conn.query_row(
        "SELECT COUNT(*) FROM workout_exercises WHERE workout_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    assert_eq!(bindings, 0);
    assert_eq!(db::get_all_logs(&service.conn, &[bench.id])?.len(), 1);

    let err = service.delete_workout(id).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DbError>(),
        Some(DbError::WorkoutNotFound(_))
    ));
    Ok(())
}

#[test]
fn test_weekly_schedule_replaces_previous_assignment() -> Result<()> {
    let service = create_test_service()?;
    let push = push_day(&service)?;
    let legs = service.create_workout("Leg Day", Difficulty::Advanced, 60)?;

    assert!(service.scheduled_workout(Weekday::Wed)?.is_none());
    service.schedule_workout(Weekday::Wed, push)?;
    assert_eq!(service.scheduled_workout(Weekday::Wed)?.map(|w| w.id), Some(push));

    service.schedule_workout(Weekday::Wed, legs)?;
    assert_eq!(service.scheduled_workout(Weekday::Wed)?.map(|w| w.id), Some(legs));
    assert!(service.scheduled_workout(Weekday::Sun)?.is_none());

    assert!(service.schedule_workout(Weekday::Fri, 4242).is_err());
    Ok(())
}

#[test]
fn test_day_index_starts_on_sunday() {
    assert_eq!(session_athlete_lib::day_index(Weekday::Sun), 0);
    assert_eq!(session_athlete_lib::day_index(Weekday::Mon), 1);
    assert_eq!(session_athlete_lib::day_index(Weekday::Sat), 6);
}

#[test]
fn test_enter_session_errors() -> Result<()> {
    let service = create_test_service()?;

    assert!(matches!(
        service.enter_session(77),
        Err(SessionError::WorkoutNotFound(77))
    ));

    let empty = service.create_workout("Empty", Difficulty::Beginner, 10)?;
    assert!(matches!(
        service.enter_session(empty),
        Err(SessionError::EmptyPlan(id)) if id == empty
    ));
    Ok(())
}

#[test]
fn test_title_selects_mode() -> Result<()> {
    let service = create_test_service()?;
    service.create_exercise("Crunch", None, None)?;
    let abs = service.create_workout("BBL Abs Burner", Difficulty::Beginner, 20)?;
    service.add_exercise_to_workout(abs, "Crunch", 2, "30s", 10, None)?;

    let session = service.enter_session(abs)?;
    assert_eq!(session.mode(), SessionMode::Circuit);
    assert_eq!(session.header().theme, Theme::Bbl);
    assert!(!session.is_finished());
    Ok(())
}

#[test]
fn test_progress_summary() -> Result<()> {
    let service = create_test_service()?;
    let id = push_day(&service)?;

    let summary = service.progress_summary()?;
    assert!(summary.personal_records.is_empty());
    assert_eq!(summary.sessions_last_7_days, 0);

    let session = service.enter_session(id)?;
    let session_athlete_lib::Session::Standard(mut player) = session else {
        panic!("expected standard session");
    };
    player.validate_set(40.0, 10)?;
    player.skip_rest()?;
    player.validate_set(45.0, 8)?; // PR
    player.skip_rest()?;
    for _ in 0..3 {
        player.validate_set(0.0, 10)?;
        if !player.is_finished() {
            player.skip_rest()?;
        }
    }
    assert!(player.is_finished());

    let summary = service.progress_summary()?;
    assert_eq!(summary.personal_records.len(), 1);
    assert_eq!(summary.personal_records[0].exercise.name, "Bench Press");
    assert!((summary.personal_records[0].max_weight - 45.0).abs() < f64::EPSILON);
    assert_eq!(summary.pr_log_count, 1);
    assert_eq!(summary.sessions_last_7_days, 1);
    assert_eq!(summary.recent_sessions.len(), 1);
    assert_eq!(summary.recent_calories(), 45 * 7);
    Ok(())
}

#[test]
fn test_exercise_history_is_oldest_first() -> Result<()> {
    let service = create_test_service()?;
    let id = push_day(&service)?;
    let session = service.enter_session(id)?;
    let session_athlete_lib::Session::Standard(mut player) = session else {
        panic!("expected standard session");
    };
    player.validate_set(40.0, 10)?;
    player.skip_rest()?;
    player.validate_set(42.5, 9)?;

    let (exercise, logs) = service.exercise_history("bench press")?;
    assert_eq!(exercise.name, "Bench Press");
    let weights: Vec<f64> = logs.iter().map(|l| l.weight_used).collect();
    assert_eq!(weights, [40.0, 42.5]);
    assert!(logs[1].is_pr());
    Ok(())
}

#[test]
fn test_config_setters_validate_before_saving() -> Result<()> {
    let mut service = create_test_service()?;
    assert!(matches!(
        service.set_calories_per_minute(0),
        Err(ConfigError::InvalidCalorieFactor)
    ));
    assert!(matches!(
        service.set_theme_accent(Theme::Bbl, "ultraviolet"),
        Err(ConfigError::InvalidColor(_))
    ));
    assert_eq!(service.config, Config::default());
    assert_eq!(
        service.session_settings().on_write_failure,
        WriteFailurePolicy::Block
    );
    Ok(())
}

#[test]
fn test_accent_color_falls_back_on_bad_config() -> Result<()> {
    let mut service = create_test_service()?;
    assert_eq!(service.accent_color(Theme::Bbl), comfy_table::Color::Magenta);
    service.config.theme.default_accent = "no-such-colour".into();
    assert_eq!(service.accent_color(Theme::Default), comfy_table::Color::White);
    Ok(())
}
