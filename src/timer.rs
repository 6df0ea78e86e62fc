use core::fmt;
use core::time::Duration;

use crate::prelude::*;

/// A restartable countdown. Expiry is reported by the [`Countdown::advance`] call that drains it.
#[derive(Clone, Copy, Reflect, Debug, PartialEq)]
pub struct Countdown {
    initial: Duration,
    duration: Duration,
    remaining: Duration,
    running: bool,
    paused: bool,
}

impl Countdown {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            duration: initial,
            remaining: initial,
            running: false,
            paused: false,
        }
    }

    pub fn start(&mut self) {
        self.start_with(self.initial);
    }

    pub fn start_with(&mut self, duration: Duration) {
        self.duration = duration;
        self.remaining = duration;
        self.running = true;
        self.paused = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn pause(&mut self) {
        if self.running {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.running {
            self.paused = false;
        }
    }

    /// Stops the countdown and refills it to its initial duration.
    pub fn reset(&mut self) {
        self.remaining = self.initial;
        self.running = false;
        self.paused = false;
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
        if self.running && !self.paused {
            self.remaining = duration;
        }
    }

    /// Returns `true` only on the call that takes `remaining` to zero.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.running || self.paused {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            self.running = false;
            return true;
        }
        false
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.remaining.as_secs();
        write!(
            f,
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )
    }
}

/// Grace period a character may spend airborne before the fall is fatal.
#[derive(Component, Clone, Copy, Reflect, Debug, Deref)]
#[reflect(Component)]
pub struct FallTracker(Countdown);

impl Default for FallTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl FallTracker {
    pub fn new(grace: Duration) -> Self {
        Self(Countdown::new(grace))
    }

    pub fn start(&mut self) {
        self.0.start();
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }

    pub fn advance(&mut self, dt: Duration) -> bool {
        self.0.advance(dt)
    }

    /// Feeds one frame of ground contact. Returns `true` when the fall just became fatal.
    pub fn observe(&mut self, grounded: bool, dt: Duration) -> bool {
        if grounded {
            self.reset();
            false
        } else if !self.is_running() {
            self.start();
            false
        } else {
            self.advance(dt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(100);

    #[test]
    fn expires_exactly_once() {
        let mut tracker = FallTracker::new(Duration::from_secs(1));
        tracker.start();
        let fired = (0..25).filter(|_| tracker.advance(FRAME)).count();
        assert_eq!(fired, 1);
        assert!(!tracker.is_running());
        assert_eq!(tracker.remaining(), Duration::ZERO);
    }

    #[test]
    fn reset_before_expiry_prevents_it() {
        let mut tracker = FallTracker::new(Duration::from_secs(1));
        tracker.start();
        for _ in 0..9 {
            assert!(!tracker.advance(FRAME));
        }
        tracker.reset();
        assert!(!tracker.is_running());
        assert_eq!(tracker.remaining(), Duration::from_secs(1));
        assert!((0..20).all(|_| !tracker.advance(FRAME)));
    }

    #[test]
    fn ground_contact_restarts_grace_period() {
        let mut tracker = FallTracker::new(Duration::from_millis(300));
        // Airborne: first frame starts, the next ones drain.
        assert!(!tracker.observe(false, FRAME));
        assert!(!tracker.observe(false, FRAME));
        assert!(!tracker.observe(false, FRAME));
        // Touching ground once refills the grace period.
        assert!(!tracker.observe(true, FRAME));
        assert!(!tracker.observe(false, FRAME));
        assert!(!tracker.observe(false, FRAME));
        assert!(!tracker.observe(false, FRAME));
        assert!(tracker.observe(false, FRAME));
    }

    #[test]
    fn paused_countdown_holds_still() {
        let mut countdown = Countdown::new(Duration::from_secs(2));
        countdown.start();
        countdown.pause();
        assert!(!countdown.advance(Duration::from_secs(5)));
        assert_eq!(countdown.remaining(), Duration::from_secs(2));
        countdown.resume();
        assert!(countdown.advance(Duration::from_secs(2)));
    }

    #[test]
    fn set_duration_refills_running_countdown() {
        let mut countdown = Countdown::new(Duration::from_secs(10));
        countdown.start();
        countdown.advance(Duration::from_secs(4));
        countdown.set_duration(Duration::from_secs(30));
        assert_eq!(countdown.remaining(), Duration::from_secs(30));
    }

    #[test]
    fn displays_as_clock() {
        let mut countdown = Countdown::new(Duration::from_secs(3725));
        assert_eq!(countdown.to_string(), "01:02:05");
        countdown.start();
        countdown.advance(Duration::from_millis(5500));
        assert_eq!(countdown.to_string(), "01:01:59");
    }
}
