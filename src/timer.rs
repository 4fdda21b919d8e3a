/*!
Process CPU time measurement.

Every trial is bracketed by two reads of a [`Clock`]. The default clock is
[`CpuClock`], which reads the CPU time consumed by the whole process. Wall
clock time is deliberately not used since it includes time spent waiting on
other processes.
*/

use std::time::Duration;

use crate::error::Error;

/// A point in time as reported by a [`Clock`].
///
/// Time points are only comparable when they come from the same clock.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TimePoint(Duration);

impl TimePoint {
    pub fn new(since_origin: Duration) -> TimePoint {
        TimePoint(since_origin)
    }

    /// Returns the time elapsed since `earlier`.
    ///
    /// If `earlier` is actually later than `self`, then this returns zero.
    pub fn since(self, earlier: TimePoint) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// A source of time points.
pub trait Clock {
    fn now(&self) -> Result<TimePoint, Error>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Result<TimePoint, Error> {
        (**self).now()
    }
}

/// A clock that reports the CPU time consumed by the current process.
///
/// On platforms without a process CPU clock, every read fails. There is no
/// fallback to wall clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuClock(());

impl CpuClock {
    pub fn new() -> CpuClock {
        CpuClock(())
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
))]
impl Clock for CpuClock {
    fn now(&self) -> Result<TimePoint, Error> {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        // SAFETY: 'ts' is a valid, writable timespec for the duration of the
        // call and CLOCK_PROCESS_CPUTIME_ID is a clock this platform defines.
        let rc = unsafe {
            libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts)
        };
        if rc == -1 {
            return Err(Error::clock(std::io::Error::last_os_error()));
        }
        let secs = u64::try_from(ts.tv_sec).unwrap_or(0);
        let nanos = u32::try_from(ts.tv_nsec).unwrap_or(0);
        Ok(TimePoint(Duration::new(secs, nanos)))
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
)))]
impl Clock for CpuClock {
    fn now(&self) -> Result<TimePoint, Error> {
        Err(Error::clock(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no process CPU time clock on this platform",
        )))
    }
}

/// Brackets a region of work with two reads of the same clock.
#[derive(Clone, Debug)]
pub struct Timer<C> {
    clock: C,
}

impl<C: Clock> Timer<C> {
    pub fn new(clock: C) -> Timer<C> {
        Timer { clock }
    }

    pub fn start(&self) -> Result<TimePoint, Error> {
        self.clock.now()
    }

    pub fn stop(&self, start: TimePoint) -> Result<Duration, Error> {
        Ok(self.clock.now()?.since(start))
    }
}

/// The smallest duration seen so far in a sequence of trials.
///
/// Ties keep the earliest minimum. Nothing but the minimum is retained, so
/// tracking any number of trials takes constant space.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Best(Option<Duration>);

impl Best {
    pub fn new() -> Best {
        Best(None)
    }

    pub fn add(&mut self, d: Duration) {
        match self.0 {
            Some(best) if best <= d => {}
            _ => self.0 = Some(d),
        }
    }

    /// Returns the minimum, or `None` if no duration was added.
    pub fn get(&self) -> Option<Duration> {
        self.0
    }
}

/// Converts a duration to fractional milliseconds.
pub fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn best_of(durations: &[u64]) -> Option<Duration> {
        let mut best = Best::new();
        for &d in durations {
            best.add(ms(d));
        }
        best.get()
    }

    #[test]
    fn best_of_synthetic_durations() {
        assert_eq!(Some(ms(2)), best_of(&[5, 2, 8, 2, 9]));
    }

    #[test]
    fn best_of_nothing() {
        assert_eq!(None, best_of(&[]));
    }

    #[test]
    fn best_of_one() {
        assert_eq!(Some(ms(7)), best_of(&[7]));
    }

    #[test]
    fn time_point_since_saturates() {
        let (a, b) = (TimePoint::new(ms(3)), TimePoint::new(ms(10)));
        assert_eq!(ms(7), b.since(a));
        assert_eq!(Duration::ZERO, a.since(b));
    }

    #[test]
    fn millis_keeps_fractions() {
        assert_eq!(250.0, millis(Duration::from_millis(250)));
        assert!((millis(Duration::from_micros(1500)) - 1.5).abs() < 1e-9);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn cpu_clock_does_not_go_backwards() {
        let timer = Timer::new(CpuClock::new());
        let start = timer.start().unwrap();
        let mut x = 0u64;
        for i in 0..100_000u64 {
            x = x.wrapping_mul(31).wrapping_add(i);
        }
        std::hint::black_box(x);
        let first = timer.stop(start).unwrap();
        let second = timer.stop(start).unwrap();
        assert!(second >= first);
    }
}
