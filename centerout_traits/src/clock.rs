use std::time::{Duration, Instant};

/// Monotonic clock abstraction for deadlines and trial timing.
///
/// - now(): returns a monotonic Instant
/// - deadline_after(): instant at which a state timeout should fire
pub trait Clock {
    fn now(&self) -> Instant;

    /// Instant `d` from now. `None` when it is past the representable range,
    /// i.e. the deadline never arrives.
    fn deadline_after(&self, d: Duration) -> Option<Instant> {
        self.now().checked_add(d)
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct FixedClock(Instant);

    impl Clock for FixedClock {
        fn now(&self) -> Instant {
            self.0
        }
    }

    #[test]
    fn deadline_after_adds_duration() {
        let origin = Instant::now();
        let clock = FixedClock(origin);
        assert_eq!(
            clock.deadline_after(Duration::from_millis(250)),
            Some(origin + Duration::from_millis(250))
        );
    }

    #[test]
    fn unrepresentable_deadline_is_none() {
        let clock = FixedClock(Instant::now());
        assert_eq!(clock.deadline_after(Duration::MAX), None);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
