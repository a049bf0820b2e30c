use std::sync::Arc;

use glimpse_buffer::{BufferCycler, DualBuffer, WorkingSet};
use glimpse_codec::FrameCompressor;
use glimpse_transport::{archive_name, Transport};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{metrics::MetricsRecorder, state::PipelineState};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Delivered { archive_name: String, frames: usize },
    /// The working set had no frames; the transport was not called.
    Empty,
    /// No session yet; buffers were left exactly as they were.
    NoSession,
    /// Frames stay buffered for the next attempt.
    Failed { archive_name: String, reason: String },
}

/// Turns buffered frames into archives and hands them to the transport.
///
/// Attempts are serialized; a successful upload removes exactly the frames
/// it carried, a failed one removes nothing.
pub struct DeliveryCoordinator<T> {
    transport: Arc<T>,
    compressor: FrameCompressor,
    buffers: Arc<DualBuffer>,
    cycler: Arc<BufferCycler>,
    state: Arc<PipelineState>,
    metrics: MetricsRecorder,
    gate: Mutex<()>,
}

impl<T> DeliveryCoordinator<T>
where
    T: Transport + 'static,
{
    pub fn new(
        transport: Arc<T>,
        compressor: FrameCompressor,
        buffers: Arc<DualBuffer>,
        cycler: Arc<BufferCycler>,
        state: Arc<PipelineState>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            transport,
            compressor,
            buffers,
            cycler,
            state,
            metrics,
            gate: Mutex::new(()),
        }
    }

    /// Scheduled delivery of the primary buffer, without merging.
    pub async fn deliver(&self) -> FlushOutcome {
        let _gate = self.gate.lock().await;
        let Some(session_id) = self.session_id() else {
            return FlushOutcome::NoSession;
        };
        self.upload_working_set(&session_id).await
    }

    /// Comparative merge of both buffers followed by delivery.
    pub async fn flush(&self) -> FlushOutcome {
        let _gate = self.gate.lock().await;
        let Some(session_id) = self.session_id() else {
            return FlushOutcome::NoSession;
        };
        let merge = self.buffers.merge();
        if merge.discarded > 0 {
            self.metrics
                .record(|m| m.frames_discarded_by_merge += merge.discarded as u64);
        }
        debug!(
            "Merged buffers: kept {} from {:?}, discarded {}",
            merge.kept, merge.winner, merge.discarded
        );
        self.upload_working_set(&session_id).await
    }

    /// Session-boundary sync: restarts the cycle count, then flushes.
    pub async fn force_sync(&self) -> FlushOutcome {
        self.cycler.reset_ticks();
        self.flush().await
    }

    fn session_id(&self) -> Option<String> {
        let session_id = self.transport.session_id();
        if session_id.is_none() {
            self.metrics.record(|m| m.flushes_without_session += 1);
            debug!("No session yet; delivery deferred");
        }
        session_id
    }

    async fn upload_working_set(&self, session_id: &str) -> FlushOutcome {
        let working = self.buffers.working_set();
        if working.is_empty() {
            return FlushOutcome::Empty;
        }
        let last_capture = working
            .frames
            .last()
            .map(|frame| frame.timestamp_ms)
            .into_iter()
            .chain(self.state.last_capture_ms())
            .max()
            .unwrap_or_default();
        let name = archive_name(session_id, last_capture);

        let (working, archive) = match self.build_archive(working).await {
            Ok(built) => built,
            Err(reason) => {
                self.metrics.record(|m| m.encode_failures += 1);
                warn!("Archive {name} not built: {reason}");
                return FlushOutcome::Failed {
                    archive_name: name,
                    reason,
                };
            }
        };

        match self.transport.upload_batch(archive, &name).await {
            Ok(()) => {
                let removed = self.buffers.acknowledge(&working);
                self.metrics.record(|m| {
                    m.uploads_succeeded += 1;
                    m.frames_delivered += working.len() as u64;
                });
                info!("Delivered {name} ({} frames, {removed} released)", working.len());
                FlushOutcome::Delivered {
                    archive_name: name,
                    frames: working.len(),
                }
            }
            Err(err) => {
                self.metrics.record(|m| m.uploads_failed += 1);
                warn!("Upload of {name} failed, keeping {} frames: {err}", working.len());
                FlushOutcome::Failed {
                    archive_name: name,
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn build_archive(&self, working: WorkingSet) -> Result<(WorkingSet, Vec<u8>), String> {
        let compressor = self.compressor;
        let (working, archive) = tokio::task::spawn_blocking(move || {
            let archive = compressor.encode_batch(&working.payloads());
            (working, archive)
        })
        .await
        .map_err(|err| format!("archive task aborted: {err}"))?;
        archive
            .map(|archive| (working, archive))
            .map_err(|err| err.to_string())
    }
}

/// Single background consumer of delivery requests.
///
/// The request queue holds one entry: asking again while a request is
/// already pending is a no-op, since the pending attempt will pick up
/// every frame buffered by then.
pub struct DeliveryWorker {
    requests: mpsc::Sender<()>,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DeliveryWorker {
    pub fn spawn<T>(coordinator: Arc<DeliveryCoordinator<T>>) -> Self
    where
        T: Transport + 'static,
    {
        let (requests, mut rx) = mpsc::channel::<()>(1);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    request = rx.recv() => match request {
                        Some(()) => {
                            coordinator.deliver().await;
                        }
                        None => break,
                    },
                }
            }
            debug!("Delivery worker stopped");
        });
        Self {
            requests,
            token,
            handle,
        }
    }

    pub fn requester(&self) -> DeliveryRequester {
        DeliveryRequester {
            requests: self.requests.clone(),
        }
    }

    /// Stops taking requests and waits for an in-flight delivery to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.handle.await {
            warn!("Delivery worker ended abnormally: {err}");
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryRequester {
    requests: mpsc::Sender<()>,
}

impl DeliveryRequester {
    /// Returns `false` when the request was folded into a pending one or the
    /// worker is gone.
    pub fn request(&self) -> bool {
        self.requests.try_send(()).is_ok()
    }
}
