use std::time::{Duration, Instant};

/// Counts how many times some piece of code ran and how long it took.
#[derive(Debug, Clone)]
pub struct CPUProfiler {
    runs: u64,
    total_time: u64,
    last_time: u64,
    name: &'static str,
}

impl CPUProfiler {
    /// Creates a new profiler with specified name.
    pub fn new(name: &'static str) -> Self {
        CPUProfiler {
            runs: 0,
            total_time: 0,
            last_time: 0,
            name,
        }
    }

    /// Starts a measurement that is recorded when the returned guard
    /// is dropped.
    pub fn measure(&mut self) -> Measure<'_> {
        Measure {
            profiler: self,
            start: Instant::now(),
        }
    }

    /// Records one run that took the specified duration.
    pub fn record(&mut self, elapsed: Duration) {
        self.last_time = elapsed.as_micros() as u64;
        self.total_time += self.last_time;
        self.runs += 1;
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    #[inline]
    pub fn total_time(&self) -> Duration {
        Duration::from_micros(self.total_time)
    }

    #[inline]
    pub fn last_time(&self) -> Duration {
        Duration::from_micros(self.last_time)
    }

    #[inline]
    pub fn avg_time(&self) -> Duration {
        if self.runs == 0 {
            return Duration::new(0, 0);
        }
        Duration::from_micros((self.total_time as f64 / self.runs as f64) as u64)
    }
}

/// Scope guard returned by `CPUProfiler::measure()`.
pub struct Measure<'a> {
    profiler: &'a mut CPUProfiler,
    start: Instant,
}

impl<'a> Drop for Measure<'a> {
    fn drop(&mut self) {
        self.profiler.record(self.start.elapsed());
    }
}

/// This macro generates a struct containing `CPUProfiler` objects with
/// specified names. It also implements a `Default` trait for it so it
/// can be easily initialized.
///
/// # Example
///
/// ```rust
/// use common::impl_stats_struct;
///
/// impl_stats_struct!(pub Statistics; item1, item2);
///
/// let stats = Statistics::default();
/// assert_eq!(stats.item1.name(), "item1");
/// ```
#[macro_export]
macro_rules! impl_stats_struct {
    (pub $name: ident; $($it: ident),+) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            $(pub $it: $crate::perf::CPUProfiler,)+
        }

        impl Default for $name {
            fn default() -> Self {
                $name {
                    $($it: $crate::perf::CPUProfiler::new(stringify!($it)),)+
                }
            }
        }
    };
    ($name: ident; $($it: ident),+) => {
        #[derive(Debug, Clone)]
        struct $name {
            $($it: $crate::perf::CPUProfiler,)+
        }

        impl Default for $name {
            fn default() -> Self {
                $name {
                    $($it: $crate::perf::CPUProfiler::new(stringify!($it)),)+
                }
            }
        }
    };
}
