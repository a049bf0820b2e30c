use std::path::PathBuf;

use async_trait::async_trait;
use glimpse_types::{config::CaptureConfig, frame::RasterImage, Result};
use image::ImageFormat;
use tokio::process::Command;
use tracing::debug;

use crate::{capture_error, SurfaceRenderer};

const DEFAULT_ADB: &str = "adb";
const DEFAULT_SERIAL: &str = "emulator-5554";

/// Captures an Android device's screen through `adb exec-out screencap -p`.
pub struct AdbScreencapRenderer {
    adb_path: PathBuf,
    serial: String,
}

impl AdbScreencapRenderer {
    pub fn new(config: &CaptureConfig) -> Self {
        let adb_path = config
            .adb_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ADB));
        let serial = config
            .adb_serial
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERIAL.to_string());
        Self { adb_path, serial }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    async fn run_adb(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new(&self.adb_path)
            .args(args)
            .output()
            .await
            .map_err(|err| {
                capture_error(format!("failed to run adb ({}): {err}", args.join(" ")))
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(capture_error(format!(
                "adb ({}) failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl SurfaceRenderer for AdbScreencapRenderer {
    async fn capture(&self) -> Result<RasterImage> {
        let args = ["-s", self.serial.as_str(), "exec-out", "screencap", "-p"];
        let raw = self.run_adb(&args).await?;
        if raw.is_empty() {
            return Err(capture_error(format!(
                "device {} returned an empty screencap",
                self.serial
            )));
        }
        let img = image::load_from_memory_with_format(&raw, ImageFormat::Png)
            .map_err(|err| capture_error(format!("failed to decode screencap: {err}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        debug!("Captured {width}x{height} from {}", self.serial);
        Ok(RasterImage::from_rgba(width, height, rgba.into_raw()))
    }
}
