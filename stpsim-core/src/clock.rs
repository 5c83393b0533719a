//! Simulated clock
//!
//! The clock is a plain state struct: it never schedules anything. It turns
//! readings of a [`TimeSource`] into simulated time, scaled by a speed
//! multiplier, and freezes while stopped. Devices compare timer deadlines
//! against [`Clock::time`] once per network tick.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{Error, Result};

/// Monotonic source of raw time, in seconds
pub trait TimeSource: Send + fmt::Debug {
    fn now(&self) -> f64;
}

/// Wall-clock source backed by [`Instant`]
#[derive(Debug)]
pub struct SystemTimeSource {
    epoch: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Driver-advanced source for deterministic runs
///
/// Clones share the same reading, so a driver keeps one handle and gives
/// another to the network.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Arc<Mutex<f64>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the reading forward by `dt` seconds (negative values are ignored)
    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            *self.now.lock() += dt;
        }
    }

    pub fn reading(&self) -> f64 {
        *self.now.lock()
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// Pausable, speed-scaled simulated clock
#[derive(Debug)]
pub struct Clock {
    source: Box<dyn TimeSource>,
    /// Source reading at the last start or re-base; `None` while stopped
    origin: Option<f64>,
    /// Simulated time accumulated before `origin`
    elapsed: f64,
    /// Value reported while stopped
    paused_at: f64,
    speed: f64,
}

impl Clock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            origin: None,
            elapsed: 0.0,
            paused_at: 0.0,
            speed: 1.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.origin.is_some()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Current simulated time
    pub fn time(&self) -> f64 {
        match self.origin {
            Some(origin) => self.elapsed + (self.source.now() - origin) * self.speed,
            None => self.paused_at,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::ClockState("clock is already running".to_string()));
        }
        self.elapsed = self.paused_at;
        self.origin = Some(self.source.now());
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::ClockState("clock is already stopped".to_string()));
        }
        self.paused_at = self.time();
        self.origin = None;
        Ok(())
    }

    /// Change the multiplier; the new rate applies from the current instant on
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidSpeed(speed));
        }
        if self.is_running() {
            self.elapsed = self.time();
            self.origin = Some(self.source.now());
        }
        self.speed = speed;
        Ok(())
    }

    /// Stop and zero every time value; the speed multiplier is kept
    pub fn reset(&mut self) {
        self.origin = None;
        self.elapsed = 0.0;
        self.paused_at = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> (ManualTime, Clock) {
        let time = ManualTime::new();
        let clock = Clock::new(Box::new(time.clone()));
        (time, clock)
    }

    #[test]
    fn test_frozen_until_started() {
        let (time, clock) = manual();
        time.advance(5.0);
        assert_eq!(clock.time(), 0.0);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_runs_and_pauses() {
        let (time, mut clock) = manual();
        clock.start().unwrap();
        time.advance(3.0);
        assert_eq!(clock.time(), 3.0);

        clock.stop().unwrap();
        time.advance(10.0);
        assert_eq!(clock.time(), 3.0);

        clock.start().unwrap();
        time.advance(1.5);
        assert_eq!(clock.time(), 4.5);
    }

    #[test]
    fn test_double_start_and_stop() {
        let (_time, mut clock) = manual();
        assert!(matches!(clock.stop(), Err(Error::ClockState(_))));
        clock.start().unwrap();
        assert!(matches!(clock.start(), Err(Error::ClockState(_))));
    }

    #[test]
    fn test_speed_rebases_without_jump() {
        let (time, mut clock) = manual();
        clock.start().unwrap();
        time.advance(2.0);
        clock.set_speed(4.0).unwrap();
        assert_eq!(clock.time(), 2.0);
        time.advance(1.0);
        assert_eq!(clock.time(), 6.0);
    }

    #[test]
    fn test_rejects_bad_speed() {
        let (_time, mut clock) = manual();
        assert!(matches!(clock.set_speed(0.0), Err(Error::InvalidSpeed(_))));
        assert!(clock.set_speed(-1.0).is_err());
        assert!(clock.set_speed(f64::NAN).is_err());
        assert!(clock.set_speed(f64::INFINITY).is_err());
        assert_eq!(clock.speed(), 1.0);
    }

    #[test]
    fn test_reset() {
        let (time, mut clock) = manual();
        clock.set_speed(2.0).unwrap();
        clock.start().unwrap();
        time.advance(7.0);
        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.speed(), 2.0);
    }
}
