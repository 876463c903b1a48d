use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// A source of the current time.
///
/// Every expiration decision in the cache goes through a `Clock`, so tests
/// can substitute a [`ManualClock`] and drive time explicitly.
pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
}

/// The default clock, backed by the operating system's monotonic clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl SystemClock {
  pub fn new() -> Self {
    SystemClock
  }
}

impl Clock for SystemClock {
  #[inline]
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A clock that only moves when told to.
///
/// `now()` returns a fixed origin plus the accumulated offset. Both reads
/// and [`advance`](ManualClock::advance) are safe from any thread.
#[derive(Debug)]
pub struct ManualClock {
  origin: Instant,
  offset: RwLock<Duration>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      origin: Instant::now(),
      offset: RwLock::new(Duration::ZERO),
    }
  }

  /// Moves the clock forward by `d`.
  pub fn advance(&self, d: Duration) {
    let mut offset = self.offset.write();
    *offset += d;
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    self.origin + *self.offset.read()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn manual_clock_starts_at_origin() {
    let clock = ManualClock::new();
    assert_eq!(clock.now(), clock.origin);
  }

  #[test]
  fn manual_clock_advances() {
    let clock = ManualClock::new();
    let before = clock.now();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.now() - before, Duration::from_millis(250));

    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.now() - before, Duration::from_millis(500));
  }

  #[test]
  fn manual_clock_concurrent_advance() {
    let clock = Arc::new(ManualClock::new());
    let start = clock.now();

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let clock = clock.clone();
        thread::spawn(move || {
          for _ in 0..100 {
            clock.advance(Duration::from_millis(1));
          }
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }

    assert_eq!(clock.now() - start, Duration::from_millis(800));
  }

  #[test]
  fn system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
  }
}
