//! Deadline timers checked against simulated time

/// A one-shot deadline in network time; unarmed until [`Timer::arm`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    deadline: Option<f64>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire `duration` time units after `now`
    pub fn arm(&mut self, now: f64, duration: f64) {
        self.deadline = Some(now + duration);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Armed and due
    pub fn expired(&self, now: f64) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Unarmed or due
    pub fn ready(&self, now: f64) -> bool {
        self.deadline.map_or(true, |deadline| now >= deadline)
    }
}
