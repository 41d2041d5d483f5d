//! Blocking delays used between pin transitions.
use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// A blocking delay primitive.
///
/// Implementations must not return before `duration` has elapsed. Longer is fine, shorter
/// corrupts the bus.
pub trait Delay: Debug {
    fn delay(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            sleep(duration);
        }
    }
}

impl<T: Delay + ?Sized> Delay for &T {
    fn delay(&self, duration: Duration) {
        (**self).delay(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn thread_delay_blocks_at_least_the_requested_time() {
        let start = Instant::now();
        ThreadDelay.delay(Duration::from_micros(1640));
        assert!(start.elapsed() >= Duration::from_micros(1640));
    }
}
