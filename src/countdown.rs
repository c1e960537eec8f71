// src/countdown.rs
//! The single per-session timer.
//!
//! The player owns exactly one `Countdown`. It is driven from outside by
//! one-second ticks; arming it again replaces the previous countdown, so a
//! stale timer can never decrement state twice.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// No countdown armed, or paused. Nothing changed.
    Idle,
    Running(u32),
    /// The countdown reached zero on this tick and disarmed itself.
    Expired,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: Option<u32>,
    paused: bool,
}

impl Countdown {
    pub const fn new() -> Self {
        Self {
            remaining: None,
            paused: false,
        }
    }

    /// Starts (or restarts) the countdown. Clears any pause.
    pub fn arm(&mut self, seconds: u32) {
        self.remaining = Some(seconds);
        self.paused = false;
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
        self.paused = false;
    }

    pub const fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    pub const fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pausing keeps the remaining time untouched.
    pub fn set_paused(&mut self, paused: bool) {
        if self.is_armed() {
            self.paused = paused;
        }
    }

    pub fn tick(&mut self) -> TickResult {
        if self.paused {
            return TickResult::Idle;
        }
        match self.remaining {
            None => TickResult::Idle,
            Some(secs) if secs <= 1 => {
                self.remaining = None;
                TickResult::Expired
            }
            Some(secs) => {
                self.remaining = Some(secs - 1);
                TickResult::Running(secs - 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_on_the_last_second() {
        let mut cd = Countdown::new();
        cd.arm(3);
        assert_eq!(cd.tick(), TickResult::Running(2));
        assert_eq!(cd.tick(), TickResult::Running(1));
        assert_eq!(cd.tick(), TickResult::Expired);
        assert!(!cd.is_armed());
        assert_eq!(cd.tick(), TickResult::Idle);
    }

    #[test]
    fn pause_freezes_remaining_time() {
        let mut cd = Countdown::new();
        cd.arm(10);
        cd.tick();
        cd.set_paused(true);
        assert_eq!(cd.tick(), TickResult::Idle);
        assert_eq!(cd.remaining(), Some(9));
        cd.set_paused(false);
        assert_eq!(cd.tick(), TickResult::Running(8));
    }

    #[test]
    fn rearming_replaces_previous_countdown() {
        let mut cd = Countdown::new();
        cd.arm(10);
        cd.set_paused(true);
        cd.arm(4);
        assert!(!cd.is_paused());
        assert_eq!(cd.tick(), TickResult::Running(3));
    }

    #[test]
    fn cancelled_countdown_ignores_ticks() {
        let mut cd = Countdown::new();
        cd.arm(5);
        cd.cancel();
        assert_eq!(cd.tick(), TickResult::Idle);
        cd.set_paused(true);
        assert!(!cd.is_paused());
    }
}
