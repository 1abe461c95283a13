//! Single/double click disambiguation.
//!
//! A click is held for `delay`; a second click on the same target inside that
//! window turns it into a double click, otherwise it resolves as a single
//! click once the delay elapses. Time is passed in, so callers drive it from
//! whatever clock they render with.

use std::time::{Duration, Instant};

pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome<K> {
    Single(K),
    Double(K),
}

#[derive(Debug, Clone)]
pub struct ClickDebouncer<K> {
    delay: Duration,
    pending: Option<(K, Instant)>,
}

impl<K: Copy + PartialEq> ClickDebouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// When the pending click, if any, resolves as a single click.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, at)| at + self.delay)
    }

    /// Registers a click. Returns the outcome it settles: a double click, or
    /// an earlier single click that this one supersedes.
    pub fn click(&mut self, target: K, at: Instant) -> Option<ClickOutcome<K>> {
        match self.pending.take() {
            Some((prev, prev_at)) if prev == target && at.saturating_duration_since(prev_at) < self.delay => {
                Some(ClickOutcome::Double(target))
            }
            Some((prev, _)) => {
                self.pending = Some((target, at));
                Some(ClickOutcome::Single(prev))
            }
            None => {
                self.pending = Some((target, at));
                None
            }
        }
    }

    /// Resolves a pending click whose delay has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<ClickOutcome<K>> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.pending.take().map(|(k, _)| ClickOutcome::Single(k)),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}

impl<K: Copy + PartialEq> Default for ClickDebouncer<K> {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_single_click_resolves_after_delay() {
        let t0 = Instant::now();
        let mut d = ClickDebouncer::default();
        assert_eq!(d.click(7, t0), None);
        assert_eq!(d.poll(t0 + ms(100)), None);
        assert_eq!(d.poll(t0 + ms(250)), Some(ClickOutcome::Single(7)));
        assert_eq!(d.poll(t0 + ms(500)), None);
    }

    #[test]
    fn test_double_click_cancels_single() {
        let t0 = Instant::now();
        let mut d = ClickDebouncer::default();
        d.click(7, t0);
        assert_eq!(d.click(7, t0 + ms(120)), Some(ClickOutcome::Double(7)));
        assert_eq!(d.poll(t0 + ms(1000)), None);
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn test_slow_second_click_is_two_singles() {
        let t0 = Instant::now();
        let mut d = ClickDebouncer::default();
        d.click(7, t0);
        // not polled in time: the stale click is flushed by the next one
        assert_eq!(d.click(7, t0 + ms(400)), Some(ClickOutcome::Single(7)));
        assert_eq!(d.poll(t0 + ms(650)), Some(ClickOutcome::Single(7)));
    }

    #[test]
    fn test_click_on_other_target_flushes_pending() {
        let t0 = Instant::now();
        let mut d = ClickDebouncer::default();
        d.click(1, t0);
        assert_eq!(d.click(2, t0 + ms(50)), Some(ClickOutcome::Single(1)));
        assert_eq!(d.poll(t0 + ms(300)), Some(ClickOutcome::Single(2)));
    }
}
