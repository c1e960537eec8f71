// src/runtime.rs
use std::cell::Cell;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Unified event type consumed by the session driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Line(String),
    Tick,
    /// The input source is gone (EOF); the session can't continue.
    Closed,
}

/// Source of user input lines
pub trait SessionEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;
}

/// Production event source reading lines from stdin on a background thread
pub struct StdinEventSource {
    rx: Receiver<SessionEvent>,
}

impl StdinEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(SessionEvent::Line(line)).is_err() {
                    break;
                }
            }
            // Dropping tx reports EOF as a disconnect.
        });

        Self { rx }
    }
}

impl Default for StdinEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventSource for StdinEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The one-second clock sessions run on.
    pub const fn seconds() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-backed event source for tests
pub struct TestEventSource {
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    pub const fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }
}

impl SessionEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the session one event/tick at a time
pub struct Runner<E: SessionEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Cell<Instant>,
}

impl<E: SessionEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Cell::new(Instant::now() + ticker.interval());
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    /// Returns the next input event, or Tick once the tick deadline passes.
    /// Input doesn't move the deadline, so ticks keep a fixed cadence while
    /// the user types. Queued input is still delivered before an overdue tick.
    pub fn step(&self) -> SessionEvent {
        let wait = self
            .next_tick
            .get()
            .saturating_duration_since(Instant::now());
        match self.event_source.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => {
                // Missed ticks come back to back until the clock catches up.
                self.next_tick
                    .set(self.next_tick.get() + self.ticker.interval());
                SessionEvent::Tick
            }
            Err(RecvTimeoutError::Disconnected) => SessionEvent::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert_eq!(runner.step(), SessionEvent::Tick);
    }

    #[test]
    fn step_passes_through_lines_then_reports_closed() {
        let (tx, rx) = mpsc::channel();
        tx.send(SessionEvent::Line("40 10".into())).unwrap();
        drop(tx);
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(10)),
        );
        assert_eq!(runner.step(), SessionEvent::Line("40 10".into()));
        assert_eq!(runner.step(), SessionEvent::Closed);
    }

    #[test]
    fn input_does_not_push_back_the_next_tick() {
        let interval = Duration::from_millis(200);
        let (tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(interval));

        std::thread::sleep(interval + Duration::from_millis(50));
        tx.send(SessionEvent::Line("p".into())).unwrap();
        assert_eq!(runner.step(), SessionEvent::Line("p".into()));

        // The deadline already passed while the line was pending.
        let started = Instant::now();
        assert_eq!(runner.step(), SessionEvent::Tick);
        assert!(started.elapsed() < interval / 2);
    }
}
