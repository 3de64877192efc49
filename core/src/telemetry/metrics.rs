use serde::Serialize;
use std::sync::Mutex;

/// Counters shared across batch jobs.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub written: usize,
    pub overflowed_samples: usize,
    pub failures: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_written(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.written += 1;
        }
    }

    pub fn record_overflow(&self, samples: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.overflowed_samples += samples;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failures += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
