use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(TWITTER_EPOCH_MILLIS);

/// [`TWITTER_EPOCH`] as Unix milliseconds.
pub const TWITTER_EPOCH_MILLIS: u64 = 1_288_834_974_657;

/// A trait for time sources that return a wall-clock timestamp.
///
/// This abstraction allows you to plug in the real system clock or a mocked
/// time source in tests.
///
/// The unit is **milliseconds since the Unix epoch**. The allocator subtracts
/// its custom epoch itself, so a time source must not pre-offset its readings.
/// Unlike a monotonic timer, a wall clock may jump backward; the allocator
/// detects and rejects that.
///
/// # Example
///
/// ```
/// use mintflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource<u64> for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource<T> {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> T;
}

impl<T, S> TimeSource<T> for &S
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}

impl<T, S> TimeSource<T> for std::sync::Arc<S>
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}

/// The system wall clock.
///
/// Every call samples `SystemTime::now()`, so readings follow NTP steps and
/// manual adjustments in both directions.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource<u64> for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as 0 and is rejected as pre-epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.current_millis() > TWITTER_EPOCH_MILLIS);
    }

    #[test]
    fn epoch_constants_agree() {
        assert_eq!(TWITTER_EPOCH.as_millis() as u64, TWITTER_EPOCH_MILLIS);
    }
}
