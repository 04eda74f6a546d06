use std::collections::HashMap;

/// Metric keys recorded by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Time kernels spent sitting in the queue before submission.
    KernelQueuedTime,
    /// Queue-to-start latency of kernel launches.
    KernelDispatchLatency,
    /// Device-side kernel execution time.
    KernelElapsedTime,
    /// Host-to-device transfer time.
    CopyInTime,
    /// Host-to-device bytes transferred.
    CopyInBytes,
    /// Device-to-host transfer time spent in sync.
    CopyOutTimeSync,
    /// Device-to-host bytes transferred in sync.
    CopyOutBytesSync,
}

/// Accumulating timers and byte counters, all gated on one enabled flag.
///
/// A disabled profiler never mutates, so profiling-off runs are observably
/// metric-free.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    enabled: bool,
    timers: HashMap<Metric, i64>,
    counters: HashMap<Metric, u64>,
}

impl Profiler {
    pub fn enabled() -> Self {
        Self { enabled: true, ..Self::default() }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add nanoseconds to a timer. No-op when disabled.
    pub fn add_timer(&mut self, metric: Metric, nanos: i64) {
        if self.enabled {
            *self.timers.entry(metric).or_insert(0) += nanos;
        }
    }

    pub fn timer(&self, metric: Metric) -> i64 {
        self.timers.get(&metric).copied().unwrap_or(0)
    }

    /// Add bytes to a counter. No-op when disabled.
    pub fn add_bytes(&mut self, metric: Metric, bytes: u64) {
        if self.enabled {
            *self.counters.entry(metric).or_insert(0) += bytes;
        }
    }

    pub fn bytes(&self, metric: Metric) -> u64 {
        self.counters.get(&metric).copied().unwrap_or(0)
    }

    /// Number of distinct metrics that have been touched.
    pub fn recorded(&self) -> usize {
        self.timers.len() + self.counters.len()
    }
}
