// src/console.rs
//! Terminal navigation shell. Prints the current step, feeds typed lines and
//! one-second ticks into the running player, and shows the end-of-session
//! summary once the player hands control back.

use std::io::{self, Write};

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use tracing::{debug, warn};

use crate::model::CompletedSessionSummary;
use crate::player::{
    CircuitPlayer, CircuitState, FinishReport, SessionError, SessionHeader, SetResult,
    StandardPlayer, StandardState, UnsyncedWrite,
};
use crate::plan::{Step, WorkTarget};
use crate::runtime::{Runner, SessionEvent, SessionEventSource, Ticker};
use crate::session::{NavigationShell, Session};
use crate::store::HistoryStore;

const REST_QUOTES: [&str; 6] = [
    "Breathe. The next set is yours.",
    "Strength is built in the pauses.",
    "Shake it out, drink some water.",
    "Slow is smooth, smooth is fast.",
    "One set closer than you were.",
    "You showed up. That's the hard part.",
];

/// What the user typed, independent of the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Empty line: validate the pre-filled values, or skip a countdown.
    Accept,
    /// "40 10", "40x10", "42.5kg x 8" or a lone weight.
    Values { weight: f64, reps: Option<i64> },
    Skip,
    Pause,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim().to_lowercase();
    match trimmed.as_str() {
        "" => return Command::Accept,
        "s" | "skip" => return Command::Skip,
        "p" | "pause" => return Command::Pause,
        "q" | "quit" | "exit" => return Command::Quit,
        _ => {}
    }

    let normalized = trimmed.replace("kg", " ").replace(['x', '*'], " ").replace(',', ".");
    let mut parts = normalized.split_whitespace();
    let weight = parts.next().and_then(|w| w.parse::<f64>().ok());
    let reps = parts.next().map(str::parse::<i64>);
    match (weight, reps, parts.next()) {
        (Some(weight), None, None) => Command::Values { weight, reps: None },
        (Some(weight), Some(Ok(reps)), None) => Command::Values {
            weight,
            reps: Some(reps),
        },
        _ => Command::Unknown(line.trim().to_string()),
    }
}

/// Rest quotes rotate with the position in the plan.
pub fn rest_quote(step_index: usize) -> &'static str {
    REST_QUOTES[step_index % REST_QUOTES.len()]
}

pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Active(usize),
    Resting(usize),
    Station { index: usize, paused: bool },
    Done,
}

impl View {
    fn of<S: HistoryStore + ?Sized>(session: &Session<'_, S>) -> Self {
        match session {
            Session::Standard(p) => match p.state() {
                StandardState::Active { step_index } => Self::Active(step_index),
                StandardState::Resting { step_index, .. } => Self::Resting(step_index),
                StandardState::Finished => Self::Done,
            },
            Session::Circuit(p) => match p.state() {
                CircuitState::Running {
                    step_index, paused, ..
                } => Self::Station {
                    index: step_index,
                    paused,
                },
                CircuitState::Finished => Self::Done,
            },
        }
    }
}

enum Flow {
    Continue,
    Redraw,
    Quit,
}

/// Console implementation of the navigation shell.
pub struct ConsoleShell<W: Write> {
    out: W,
    accent: Color,
}

impl<W: Write> ConsoleShell<W> {
    pub const fn new(out: W, accent: Color) -> Self {
        Self { out, accent }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!("Failed to write to console: {}", e);
        }
    }

    fn print_header(&mut self, header: &SessionHeader) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![Cell::new(&header.title)
                .fg(self.accent)
                .add_attribute(Attribute::Bold)])
            .add_row(vec![Cell::new(format!(
                "{} min | {} mode",
                header.duration_min, header.mode
            ))]);
        writeln!(self.out, "{table}")
    }

    fn show_standard<S: HistoryStore + ?Sized>(
        &mut self,
        player: &StandardPlayer<'_, S>,
    ) -> io::Result<()> {
        match (player.state(), player.current_step()) {
            (
                StandardState::Active { .. },
                Some(Step::Work {
                    exercise,
                    target:
                        WorkTarget::Set {
                            set_number,
                            total_sets,
                            target_reps,
                        },
                }),
            ) => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec![
                        Cell::new(&exercise.name).fg(self.accent).add_attribute(Attribute::Bold),
                        Cell::new(format!("Set {set_number}/{total_sets}")),
                        Cell::new(format!("Target {target_reps}")),
                    ]);
                if let Some(muscle) = &exercise.muscle_target {
                    table.add_row(vec![Cell::new("Muscle"), Cell::new(muscle), Cell::new("")]);
                }
                if let Some(tips) = &exercise.tips {
                    table.add_row(vec![Cell::new("Tip"), Cell::new(tips), Cell::new("")]);
                }
                writeln!(self.out, "\n{table}")?;
                if let Some(last) = player.last_performance() {
                    writeln!(self.out, "{last}")?;
                }
                let input = player.input();
                let weight = input.weight.map_or("?".to_string(), |w| format!("{w}kg"));
                let reps = input.reps.map_or("?".to_string(), |r| r.to_string());
                write!(
                    self.out,
                    "weight reps [{weight} x {reps}] (Enter = validate, q = quit) > "
                )?;
            }
            (
                StandardState::Resting {
                    step_index,
                    seconds_remaining,
                },
                Some(Step::Rest { next_label, .. }),
            ) => {
                writeln!(
                    self.out,
                    "\nRest {} - next: {}",
                    format_clock(seconds_remaining),
                    next_label
                )?;
                writeln!(self.out, "\"{}\"", rest_quote(step_index))?;
                writeln!(self.out, "(Enter = skip rest, q = quit)")?;
            }
            _ => {}
        }
        self.out.flush()
    }

    fn show_circuit<S: HistoryStore + ?Sized>(
        &mut self,
        player: &CircuitPlayer<'_, S>,
    ) -> io::Result<()> {
        let CircuitState::Running {
            step_index,
            seconds_remaining,
            paused,
        } = player.state()
        else {
            return Ok(());
        };
        match player.current_step() {
            Some(Step::Work {
                exercise,
                target:
                    WorkTarget::Timed {
                        round_number,
                        total_rounds,
                        ..
                    },
            }) => {
                writeln!(
                    self.out,
                    "\nRound {round_number}/{total_rounds}  {}  {}",
                    exercise.name,
                    format_clock(seconds_remaining)
                )?;
                if let Some(tips) = &exercise.tips {
                    writeln!(self.out, "Tip: {tips}")?;
                }
            }
            Some(Step::Rest { next_label, .. }) => {
                writeln!(
                    self.out,
                    "\n{next_label} {}",
                    format_clock(seconds_remaining)
                )?;
                writeln!(self.out, "\"{}\"", rest_quote(step_index))?;
            }
            _ => {}
        }
        if paused {
            writeln!(self.out, "[paused]")?;
        }
        writeln!(self.out, "(Enter = skip, p = pause, q = quit)")?;
        self.out.flush()
    }

    fn show_step<S: HistoryStore + ?Sized>(&mut self, session: &Session<'_, S>) -> io::Result<()> {
        match session {
            Session::Standard(p) => self.show_standard(p),
            Session::Circuit(p) => self.show_circuit(p),
        }
    }

    /// Redraws the running countdown in place.
    fn show_countdown<S: HistoryStore + ?Sized>(
        &mut self,
        session: &Session<'_, S>,
    ) -> io::Result<()> {
        let remaining = match session {
            Session::Standard(p) => match p.state() {
                StandardState::Resting {
                    seconds_remaining, ..
                } => Some(seconds_remaining),
                _ => None,
            },
            Session::Circuit(p) => match p.state() {
                CircuitState::Running {
                    seconds_remaining,
                    paused: false,
                    ..
                } => Some(seconds_remaining),
                _ => None,
            },
        };
        if let Some(seconds) = remaining {
            write!(self.out, "\r  {} ", format_clock(seconds))?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn report_set(&mut self, result: Result<SetResult, SessionError>) -> io::Result<Flow> {
        match result {
            Ok(set) => {
                if set.personal_record {
                    writeln!(self.out, "NEW PR!")?;
                }
                if set.log_id.is_none() {
                    writeln!(self.out, "Set kept locally, it could not be saved.")?;
                }
                Ok(Flow::Continue)
            }
            Err(e) => {
                writeln!(self.out, "! {e}")?;
                Ok(Flow::Redraw)
            }
        }
    }

    fn handle_standard<S: HistoryStore + ?Sized>(
        &mut self,
        player: &mut StandardPlayer<'_, S>,
        command: Command,
    ) -> io::Result<Flow> {
        let resting = matches!(player.state(), StandardState::Resting { .. });
        match command {
            Command::Quit => Ok(Flow::Quit),
            Command::Accept | Command::Skip if resting => {
                if let Err(e) = player.skip_rest() {
                    writeln!(self.out, "! {e}")?;
                }
                Ok(Flow::Continue)
            }
            Command::Accept => {
                let result = player.validate();
                self.report_set(result)
            }
            Command::Values { weight, reps } if !resting => {
                player.set_weight(weight);
                if let Some(reps) = reps {
                    player.set_reps(reps);
                }
                let result = player.validate();
                self.report_set(result)
            }
            Command::Pause => {
                writeln!(self.out, "Only circuits can be paused.")?;
                Ok(Flow::Redraw)
            }
            Command::Skip => {
                writeln!(self.out, "Sets can't be skipped, log them or quit.")?;
                Ok(Flow::Redraw)
            }
            Command::Values { .. } | Command::Unknown(_) => {
                writeln!(
                    self.out,
                    "Type \"<weight> <reps>\", Enter to accept, or q to quit."
                )?;
                Ok(Flow::Redraw)
            }
        }
    }

    fn handle_circuit<S: HistoryStore + ?Sized>(
        &mut self,
        player: &mut CircuitPlayer<'_, S>,
        command: Command,
    ) -> io::Result<Flow> {
        let outcome = match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Accept | Command::Skip => player.skip(),
            Command::Pause => player.toggle_pause(),
            Command::Values { .. } | Command::Unknown(_) => {
                writeln!(self.out, "Enter = skip, p = pause, q = quit.")?;
                return Ok(Flow::Redraw);
            }
        };
        if let Err(e) = outcome {
            writeln!(self.out, "! {e}")?;
        }
        Ok(Flow::Continue)
    }

    fn handle_line<S: HistoryStore + ?Sized>(
        &mut self,
        session: &mut Session<'_, S>,
        line: &str,
    ) -> io::Result<Flow> {
        let command = parse_command(line);
        debug!("Console command: {:?}", command);
        match session {
            Session::Standard(p) => self.handle_standard(p, command),
            Session::Circuit(p) => self.handle_circuit(p, command),
        }
    }

    /// Runs `session` until it finishes, the user quits, or input closes,
    /// then hands it back through [`Session::close`].
    /// # Errors
    /// Console write failures. The session is still closed.
    pub fn drive<S, E, T>(
        &mut self,
        mut session: Session<'_, S>,
        runner: &Runner<E, T>,
    ) -> io::Result<()>
    where
        S: HistoryStore + ?Sized,
        E: SessionEventSource,
        T: Ticker,
    {
        let outcome = self.run_loop(&mut session, runner);
        session.close(self);
        outcome
    }

    fn run_loop<S, E, T>(
        &mut self,
        session: &mut Session<'_, S>,
        runner: &Runner<E, T>,
    ) -> io::Result<()>
    where
        S: HistoryStore + ?Sized,
        E: SessionEventSource,
        T: Ticker,
    {
        self.print_header(session.header())?;
        let mut shown = None;
        while !session.is_finished() {
            let view = View::of(session);
            if shown != Some(view) {
                self.show_step(session)?;
                shown = Some(view);
            }
            match runner.step() {
                SessionEvent::Tick => {
                    session.tick();
                    if shown == Some(View::of(session)) {
                        self.show_countdown(session)?;
                    }
                }
                SessionEvent::Closed => {
                    debug!("Input closed, leaving the session");
                    break;
                }
                SessionEvent::Line(line) => match self.handle_line(session, &line)? {
                    Flow::Continue => {}
                    Flow::Redraw => shown = None,
                    Flow::Quit => break,
                },
            }
        }
        Ok(())
    }
}

impl<W: Write> NavigationShell for ConsoleShell<W> {
    fn on_session_finished(
        &mut self,
        header: &SessionHeader,
        summary: Option<&CompletedSessionSummary>,
        report: &FinishReport,
    ) {
        let header_color = self.accent;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Workout").fg(header_color),
                Cell::new("Duration (min)").fg(header_color),
                Cell::new("Calories").fg(header_color),
                Cell::new("Saved").fg(header_color),
            ])
            .add_row(vec![
                Cell::new(&header.title),
                Cell::new(header.duration_min.to_string()),
                Cell::new(report.calories.to_string()),
                Cell::new(summary.map_or("no".to_string(), |s| {
                    s.completed_at.format("%Y-%m-%d %H:%M").to_string()
                })),
            ]);
        self.emit(&format!("\nSession complete!\n{table}"));

        for write in &report.unsynced {
            let line = match write {
                UnsyncedWrite::Set { step_index } => {
                    format!("Warning: set at step {} was not saved.", step_index + 1)
                }
                UnsyncedWrite::Summary => "Warning: the session summary was not saved.".to_string(),
                UnsyncedWrite::CircuitMarker => {
                    "Warning: the circuit completion was not recorded.".to_string()
                }
            };
            self.emit(&line);
        }
    }

    fn on_session_abandoned(&mut self, header: &SessionHeader) {
        self.emit(&format!(
            "\nLeft '{}' early. Sets validated so far are saved.",
            header.title
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weight_and_reps_in_common_shapes() {
        let expected = Command::Values {
            weight: 40.0,
            reps: Some(10),
        };
        assert_eq!(parse_command("40 10"), expected);
        assert_eq!(parse_command("40x10"), expected);
        assert_eq!(parse_command(" 40kg x 10 "), expected);
        assert_eq!(
            parse_command("42,5 8"),
            Command::Values {
                weight: 42.5,
                reps: Some(8)
            }
        );
        assert_eq!(
            parse_command("45"),
            Command::Values {
                weight: 45.0,
                reps: None
            }
        );
    }

    #[test]
    fn parses_keywords_and_rejects_noise() {
        assert_eq!(parse_command(""), Command::Accept);
        assert_eq!(parse_command("S"), Command::Skip);
        assert_eq!(parse_command("p"), Command::Pause);
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("abc"), Command::Unknown("abc".into()));
        assert_eq!(parse_command("40 ten"), Command::Unknown("40 ten".into()));
        assert_eq!(parse_command("40 10 3"), Command::Unknown("40 10 3".into()));
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(60), "1:00");
        assert_eq!(format_clock(5), "0:05");
        assert_eq!(format_clock(125), "2:05");
    }

    #[test]
    fn rest_quotes_rotate() {
        assert_ne!(rest_quote(0), rest_quote(1));
        assert_eq!(rest_quote(0), rest_quote(REST_QUOTES.len()));
    }
}
