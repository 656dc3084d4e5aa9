//! Trailing-edge debounce driven by the app's tick.

use std::time::{Duration, Instant};

/// Delay before a search edit is applied.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds the latest value until `delay` passes without another push.
#[derive(Debug)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace the pending value and restart the timer.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Take the pending value once it has been quiet for `delay`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.delay);
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Take the pending value immediately (Enter in a search box).
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for Debounce<T> {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn holds_value_until_quiet() {
        let start = Instant::now();
        let mut d = Debounce::new(Duration::from_millis(300));
        d.push("ki", start);
        assert_eq!(d.poll(start + Duration::from_millis(100)), None);

        // A newer keystroke restarts the timer.
        d.push("kit", start + Duration::from_millis(200));
        assert_eq!(d.poll(start + Duration::from_millis(400)), None);
        assert_eq!(d.poll(start + Duration::from_millis(500)), Some("kit"));
        assert!(!d.is_pending());
        assert_eq!(d.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn flush_and_cancel() {
        let now = Instant::now();
        let mut d = Debounce::default();
        d.push(1, now);
        assert_eq!(d.flush(), Some(1));
        d.push(2, now);
        d.cancel();
        assert_eq!(d.poll(now + Duration::from_secs(1)), None);
    }
}
