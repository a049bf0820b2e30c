use std::sync::Arc;

use glimpse_buffer::DualBuffer;
use glimpse_capture::SurfaceRenderer;
use glimpse_codec::FrameCompressor;
use glimpse_mask::{MaskRegistry, MaskingRenderer};
use glimpse_ops::{side_file_name, DiagnosticStore};
use glimpse_types::{frame::CapturedFrame, Result};
use tracing::{debug, warn};

use crate::{metrics::MetricsRecorder, pipeline_error, state::PipelineState};

/// Everything one capture tick touches.
pub struct CaptureScheduler<R> {
    surface: Arc<R>,
    registry: Arc<MaskRegistry>,
    masking: MaskingRenderer,
    compressor: FrameCompressor,
    store: Arc<dyn DiagnosticStore>,
    buffers: Arc<DualBuffer>,
    state: Arc<PipelineState>,
    metrics: MetricsRecorder,
}

impl<R> CaptureScheduler<R>
where
    R: SurfaceRenderer + 'static,
{
    pub fn new(
        surface: Arc<R>,
        registry: Arc<MaskRegistry>,
        compressor: FrameCompressor,
        store: Arc<dyn DiagnosticStore>,
        buffers: Arc<DualBuffer>,
        state: Arc<PipelineState>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            surface,
            registry,
            masking: MaskingRenderer::new(),
            compressor,
            store,
            buffers,
            state,
            metrics,
        }
    }

    /// Render, redact, encode and buffer one frame. Returns the frame's
    /// timestamp. Any error means nothing was appended.
    pub async fn tick(&self) -> Result<i64> {
        let raw = match self.surface.capture().await {
            Ok(raw) => raw,
            Err(err) => {
                self.metrics.record(|m| m.capture_failures += 1);
                warn!("Capture skipped: {err}");
                return Err(err);
            }
        };

        let masks = self.registry.snapshot();
        let masking = self.masking;
        let compressor = self.compressor;
        let encoded = tokio::task::spawn_blocking(move || {
            let redacted = masking.render(raw, &masks);
            compressor.encode_frame(&redacted)
        })
        .await
        .map_err(|err| pipeline_error(format!("encode task aborted: {err}")))
        .and_then(|result| result);
        let encoded = match encoded {
            Ok(encoded) => encoded,
            Err(err) => {
                self.metrics.record(|m| m.encode_failures += 1);
                warn!("Frame dropped: {err}");
                return Err(err);
            }
        };

        let timestamp = self.state.next_capture_timestamp();
        if let Err(err) = self
            .store
            .write_side_file(&encoded.jpeg, &side_file_name(timestamp))
            .await
        {
            self.metrics.record(|m| m.side_file_failures += 1);
            warn!("Side file not written: {err}");
        }

        let bytes = encoded.payload.len();
        self.buffers
            .append(CapturedFrame::new(encoded.payload, timestamp));
        self.metrics.record(|m| m.frames_captured += 1);
        debug!("Buffered frame {timestamp} ({bytes} bytes)");
        Ok(timestamp)
    }
}
