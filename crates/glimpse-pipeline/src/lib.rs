//! Capture-and-delivery pipeline: periodic capture, redaction, bounded
//! buffering and batched upload.

mod capture;
mod delivery;
mod metrics;
mod state;
mod task;

pub use capture::CaptureScheduler;
pub use delivery::{DeliveryCoordinator, DeliveryRequester, DeliveryWorker, FlushOutcome};
pub use metrics::{MetricsRecorder, PipelineMetrics};
pub use state::PipelineState;
pub use task::RepeatingTask;

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use glimpse_buffer::{BufferCycler, DualBuffer, Slot};
use glimpse_capture::SurfaceRenderer;
use glimpse_codec::FrameCompressor;
use glimpse_mask::MaskRegistry;
use glimpse_ops::DiagnosticStore;
use glimpse_transport::Transport;
use glimpse_types::{config::GlimpseConfig, mask::MaskTarget, GlimpseError, Result};
use serde::Serialize;
use tracing::info;

/// Point-in-time view of the pipeline, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub running: bool,
    pub capturing: bool,
    pub cycling: bool,
    pub buffering_mode: bool,
    pub cycle_ticks: u64,
    pub primary_frames: usize,
    pub secondary_frames: usize,
    pub mask_regions: usize,
    pub started_at_ms: i64,
    pub first_capture_ms: Option<i64>,
    pub last_capture_ms: Option<i64>,
}

/// One independent replay pipeline. All state lives on the instance.
pub struct ReplayPipeline<T> {
    config: GlimpseConfig,
    store: Arc<dyn DiagnosticStore>,
    compressor: FrameCompressor,
    registry: Arc<MaskRegistry>,
    buffers: Arc<DualBuffer>,
    cycler: Arc<BufferCycler>,
    state: Arc<PipelineState>,
    metrics: MetricsRecorder,
    coordinator: Arc<DeliveryCoordinator<T>>,
    capture_timer: RepeatingTask,
    cycle_timer: RepeatingTask,
    worker: Mutex<Option<DeliveryWorker>>,
}

impl<T> ReplayPipeline<T>
where
    T: Transport + 'static,
{
    pub fn new(
        config: GlimpseConfig,
        transport: Arc<T>,
        store: Arc<dyn DiagnosticStore>,
    ) -> Result<Self> {
        config.validate()?;
        let compressor = FrameCompressor::new(config.capture.quality);
        let buffers = Arc::new(DualBuffer::new());
        let cycler = Arc::new(BufferCycler::new(
            buffers.clone(),
            config.buffer.buffering_mode,
        ));
        let state = Arc::new(PipelineState::new());
        let metrics = MetricsRecorder::default();
        let coordinator = Arc::new(DeliveryCoordinator::new(
            transport,
            compressor,
            buffers.clone(),
            cycler.clone(),
            state.clone(),
            metrics.clone(),
        ));

        Ok(Self {
            registry: Arc::new(MaskRegistry::new(config.ops.verbose_diagnostics)),
            config,
            store,
            compressor,
            buffers,
            cycler,
            state,
            metrics,
            coordinator,
            capture_timer: RepeatingTask::new("capture"),
            cycle_timer: RepeatingTask::new("buffer-cycle"),
            worker: Mutex::new(None),
        })
    }

    /// Begins capturing `surface`. Returns `false` if already running.
    ///
    /// Must be called from within a Tokio runtime. Buffers and per-run state
    /// start out empty.
    pub fn start<R>(&self, surface: Arc<R>, started_at_ms: i64) -> bool
    where
        R: SurfaceRenderer + 'static,
    {
        let mut worker_slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker_slot.is_some() {
            info!("Pipeline already running; start ignored");
            return false;
        }

        self.state.reset(started_at_ms);
        self.cycler.reset_ticks();
        self.cycler
            .set_buffering_mode(self.config.buffer.buffering_mode);
        self.buffers.clear_all();

        let worker = DeliveryWorker::spawn(self.coordinator.clone());
        let requester = worker.requester();
        *worker_slot = Some(worker);

        let scheduler = Arc::new(CaptureScheduler::new(
            surface,
            self.registry.clone(),
            self.compressor,
            self.store.clone(),
            self.buffers.clone(),
            self.state.clone(),
            self.metrics.clone(),
        ));
        self.capture_timer.start(
            Duration::from_millis(self.config.capture.interval_ms),
            move || {
                let scheduler = scheduler.clone();
                let requester = requester.clone();
                async move {
                    if scheduler.tick().await.is_ok() {
                        requester.request();
                    }
                }
            },
        );

        if self.config.buffer.buffering_mode {
            self.enable_cycle_buffer();
        }
        info!(
            "Pipeline started at {started_at_ms} (capture every {} ms)",
            self.config.capture.interval_ms
        );
        true
    }

    /// Cancels both timers and the delivery worker, letting any in-flight
    /// capture or upload finish. Buffered frames are kept so a final
    /// [`force_sync`](Self::force_sync) can still ship them. Returns `false`
    /// if the pipeline was not running.
    pub async fn stop(&self) -> bool {
        if !self.is_running() {
            // The cycle timer can be enabled without a running pipeline.
            self.cycle_timer.stop().await;
            return false;
        }
        self.capture_timer.stop().await;
        self.cycle_timer.stop().await;
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return false;
        };
        worker.shutdown().await;

        self.state.reset(0);
        self.cycler.reset_ticks();
        self.cycler
            .set_buffering_mode(self.config.buffer.buffering_mode);
        info!("Pipeline stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns `false` if the element was already masked.
    pub fn add_mask_region(&self, target: Arc<dyn MaskTarget>) -> bool {
        self.registry.add(target)
    }

    /// Returns `false` if the element was not masked.
    pub fn remove_mask_region(&self, target: &Arc<dyn MaskTarget>) -> bool {
        self.registry.remove(target)
    }

    /// Starts the buffer-cycle timer. Its firings only clear buffers while
    /// buffering mode is on. Returns `false` if the timer was already running.
    pub fn enable_cycle_buffer(&self) -> bool {
        let cycler = self.cycler.clone();
        let metrics = self.metrics.clone();
        self.cycle_timer.start(
            Duration::from_millis(self.config.buffer.cycle_interval_ms),
            move || {
                if cycler.cycle().is_some() {
                    metrics.record(|m| m.buffer_cycles += 1);
                }
                std::future::ready(())
            },
        )
    }

    pub async fn disable_cycle_buffer(&self) -> bool {
        self.cycle_timer.stop().await
    }

    pub fn set_buffering_mode(&self, enabled: bool) {
        self.cycler.set_buffering_mode(enabled);
    }

    /// Merges both buffers and delivers the survivor immediately.
    pub async fn force_sync(&self) -> FlushOutcome {
        self.coordinator.force_sync().await
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.coordinator.flush().await
    }

    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.snapshot()
    }

    pub fn buffers(&self) -> &Arc<DualBuffer> {
        &self.buffers
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            running: self.is_running(),
            capturing: self.capture_timer.is_running(),
            cycling: self.cycle_timer.is_running(),
            buffering_mode: self.cycler.buffering_mode(),
            cycle_ticks: self.cycler.ticks(),
            primary_frames: self.buffers.len(Slot::Primary),
            secondary_frames: self.buffers.len(Slot::Secondary),
            mask_regions: self.registry.len(),
            started_at_ms: self.state.started_at_ms(),
            first_capture_ms: self.state.first_capture_ms(),
            last_capture_ms: self.state.last_capture_ms(),
        }
    }
}

pub fn pipeline_error(message: impl Into<String>) -> GlimpseError {
    GlimpseError::Pipeline(message.into())
}
