use std::{env, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use glimpse_capture::{AdbScreencapRenderer, SurfaceRenderer, SyntheticRenderer};
use glimpse_mask::ElementHandle;
use glimpse_ops::{diagnostic_store, init_tracing};
use glimpse_pipeline::{FlushOutcome, ReplayPipeline};
use glimpse_transport::LocalCollector;
use glimpse_types::{
    config::GlimpseConfig,
    frame::{now_millis, Point},
    mask::{MaskTarget, Rect},
};
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

/// Run the capture pipeline against a surface and an in-process collector.
#[derive(Debug, Parser)]
#[command(name = "glimpse", version)]
struct Args {
    /// TOML config file. Falls back to $GLIMPSE_CONFIG, then configs/dev.toml.
    #[arg(long)]
    config: Option<String>,
    /// How long to capture before stopping.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
    /// Session id handed to the collector. Random when omitted.
    #[arg(long)]
    session: Option<String>,
    /// Seconds to wait before the session exists; frames buffer meanwhile.
    #[arg(long, default_value_t = 0)]
    session_delay_secs: u64,
    /// Capture a device through adb instead of the synthetic surface.
    #[arg(long)]
    adb: bool,
    /// Force buffering mode on regardless of the config file.
    #[arg(long)]
    buffering: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.clone());
    if args.buffering {
        config.buffer.buffering_mode = true;
    }
    init_tracing(&config.ops)?;

    let collector = LocalCollector::new(64);
    let mut uploads = collector.subscribe();
    tokio::spawn(async move {
        while let Some(event) = uploads.next().await {
            info!("Collector received {} ({} bytes)", event.archive_name, event.bytes);
        }
    });

    let store = diagnostic_store(config.capture.diagnostics_dir.as_deref());
    let pipeline = ReplayPipeline::new(config.clone(), Arc::new(collector.clone()), store)?;

    if args.adb {
        let surface = Arc::new(AdbScreencapRenderer::new(&config.capture));
        run(&pipeline, surface, &collector, &args).await;
    } else {
        let surface = Arc::new(SyntheticRenderer::new(360, 640).with_origin(Point::new(0, 48)));
        let card: Arc<dyn MaskTarget> =
            ElementHandle::new("demo-card-number", Rect::new(20, 148, 320, 60));
        pipeline.add_mask_region(card);
        run(&pipeline, surface, &collector, &args).await;
    }

    println!("{}", serde_json::to_string_pretty(&pipeline.metrics())?);
    Ok(())
}

async fn run<R>(
    pipeline: &ReplayPipeline<LocalCollector>,
    surface: Arc<R>,
    collector: &LocalCollector,
    args: &Args,
) where
    R: SurfaceRenderer + 'static,
{
    let session = args
        .session
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    if args.session_delay_secs == 0 {
        collector.set_session_id(Some(session.clone()));
    }

    pipeline.start(surface, now_millis());

    if args.session_delay_secs > 0 {
        let delay = args.session_delay_secs.min(args.duration_secs);
        sleep(Duration::from_secs(delay)).await;
        collector.set_session_id(Some(session.clone()));
        info!("Session {session} established");
        report(pipeline.force_sync().await);
        sleep(Duration::from_secs(args.duration_secs - delay)).await;
    } else {
        sleep(Duration::from_secs(args.duration_secs)).await;
    }

    pipeline.stop().await;
    report(pipeline.force_sync().await);
    info!(
        "Final status: {}",
        serde_json::to_string(&pipeline.status()).unwrap_or_default()
    );
}

fn report(outcome: FlushOutcome) {
    match outcome {
        FlushOutcome::Delivered {
            archive_name,
            frames,
        } => info!("Synced {frames} frames as {archive_name}"),
        FlushOutcome::Empty => info!("Nothing left to sync"),
        FlushOutcome::NoSession => warn!("Sync skipped: no session"),
        FlushOutcome::Failed {
            archive_name,
            reason,
        } => warn!("Sync of {archive_name} failed: {reason}"),
    }
}

fn load_config(from_args: Option<String>) -> GlimpseConfig {
    let from_env = env::var("GLIMPSE_CONFIG").ok();
    let path = from_args
        .or(from_env)
        .unwrap_or_else(|| "configs/dev.toml".into());
    match GlimpseConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path
                );
                GlimpseConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path
            );
            GlimpseConfig::default()
        }
    }
}
