use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Aggregated pipeline counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineMetrics {
    pub frames_captured: u64,
    pub capture_failures: u64,
    pub encode_failures: u64,
    pub side_file_failures: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
    pub frames_delivered: u64,
    pub flushes_without_session: u64,
    pub frames_discarded_by_merge: u64,
    pub buffer_cycles: u64,
}

/// Shared handle the pipeline components record into.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    inner: Arc<Mutex<PipelineMetrics>>,
}

impl MetricsRecorder {
    pub fn record(&self, update: impl FnOnce(&mut PipelineMetrics)) {
        update(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn snapshot(&self) -> PipelineMetrics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
