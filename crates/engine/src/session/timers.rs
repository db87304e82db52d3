// Save timers: a resettable idle debounce plus a periodic fallback deadline.
//
// Pure deadline bookkeeping; the scheduler loop sleeps until `next_deadline`
// and asks which timer fired. Every method has an explicit `now` so tests can
// drive it without a clock.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::AutosaveConfig;

#[derive(Debug, Clone)]
pub struct SaveTimers {
    debounce: Duration,
    fallback: Duration,
    debounce_deadline: Option<Instant>,
    fallback_deadline: Instant,
}

impl SaveTimers {
    pub fn new(config: AutosaveConfig, now: Instant) -> Self {
        let fallback = config.fallback_interval();
        Self {
            debounce: config.debounce(),
            fallback,
            debounce_deadline: None,
            fallback_deadline: now + fallback,
        }
    }

    /// (Re)start the idle window. Each edit pushes the deadline out.
    pub fn arm_debounce_at(&mut self, now: Instant) {
        self.debounce_deadline = Some(now + self.debounce);
    }

    pub fn cancel_debounce(&mut self) {
        self.debounce_deadline = None;
    }

    /// True once if the debounce deadline has passed; disarms it.
    pub fn take_due_debounce(&mut self, now: Instant) -> bool {
        match self.debounce_deadline {
            Some(deadline) if deadline <= now => {
                self.debounce_deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn restart_fallback_at(&mut self, now: Instant) {
        self.fallback_deadline = now + self.fallback;
    }

    /// True if the fallback deadline passed. Caller restarts it.
    pub fn fallback_due_at(&self, now: Instant) -> bool {
        self.fallback_deadline <= now
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    pub fn fallback_deadline(&self) -> Instant {
        self.fallback_deadline
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AutosaveConfig {
        AutosaveConfig { debounce_ms: 2000, fallback_interval_ms: 10_000 }
    }

    #[test]
    fn starts_with_only_fallback_armed() {
        let now = Instant::now();
        let timers = SaveTimers::new(config(), now);
        assert_eq!(timers.debounce_deadline(), None);
        assert_eq!(timers.fallback_deadline(), now + Duration::from_secs(10));
    }

    #[test]
    fn rearming_pushes_debounce_out() {
        let t0 = Instant::now();
        let mut timers = SaveTimers::new(config(), t0);

        timers.arm_debounce_at(t0);
        timers.arm_debounce_at(t0 + Duration::from_millis(1000));

        assert!(!timers.take_due_debounce(t0 + Duration::from_millis(2000)));
        assert!(timers.take_due_debounce(t0 + Duration::from_millis(3000)));
        // Fires once.
        assert!(!timers.take_due_debounce(t0 + Duration::from_millis(4000)));
    }

    #[test]
    fn cancel_disarms_debounce() {
        let t0 = Instant::now();
        let mut timers = SaveTimers::new(config(), t0);
        timers.arm_debounce_at(t0);
        timers.cancel_debounce();
        assert!(!timers.take_due_debounce(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn fallback_due_until_restarted() {
        let t0 = Instant::now();
        let mut timers = SaveTimers::new(config(), t0);
        let later = t0 + Duration::from_secs(10);

        assert!(!timers.fallback_due_at(t0 + Duration::from_secs(9)));
        assert!(timers.fallback_due_at(later));

        timers.restart_fallback_at(later);
        assert!(!timers.fallback_due_at(later));
        assert_eq!(timers.fallback_deadline(), later + Duration::from_secs(10));
    }

    #[test]
    fn intervals_are_clamped() {
        let timers = SaveTimers::new(
            AutosaveConfig { debounce_ms: 1, fallback_interval_ms: 1 },
            Instant::now(),
        );
        assert_eq!(timers.debounce_window(), Duration::from_millis(100));
    }
}
