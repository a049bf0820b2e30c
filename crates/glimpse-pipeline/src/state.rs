use std::sync::atomic::{AtomicI64, Ordering};

use glimpse_types::frame::now_millis;

/// Per-run timestamps. Reset on every start and stop.
#[derive(Debug, Default)]
pub struct PipelineState {
    started_at_ms: AtomicI64,
    first_capture_ms: AtomicI64,
    last_capture_ms: AtomicI64,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self, started_at_ms: i64) {
        self.started_at_ms.store(started_at_ms, Ordering::SeqCst);
        self.first_capture_ms.store(0, Ordering::SeqCst);
        self.last_capture_ms.store(0, Ordering::SeqCst);
    }

    /// Capture timestamp that never goes backwards, even if the wall clock does.
    pub fn next_capture_timestamp(&self) -> i64 {
        let now = now_millis();
        let previous = self.last_capture_ms.fetch_max(now, Ordering::SeqCst);
        let stamp = previous.max(now);
        let _ = self.first_capture_ms.compare_exchange(
            0,
            stamp,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        stamp
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms.load(Ordering::SeqCst)
    }

    pub fn first_capture_ms(&self) -> Option<i64> {
        Some(self.first_capture_ms.load(Ordering::SeqCst)).filter(|ts| *ts != 0)
    }

    pub fn last_capture_ms(&self) -> Option<i64> {
        Some(self.last_capture_ms.load(Ordering::SeqCst)).filter(|ts| *ts != 0)
    }
}
