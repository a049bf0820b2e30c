//! Operational helpers: logging setup and the diagnostic side-file store.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use glimpse_types::{config::OpsConfig, GlimpseError, Result};
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| GlimpseError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| GlimpseError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// `screenshot-{millis}.jpg`
pub fn side_file_name(captured_at_ms: i64) -> String {
    format!("screenshot-{captured_at_ms}.jpg")
}

/// Best-effort sink for redacted frames kept for local inspection. Nothing
/// written here is read back by the pipeline.
#[async_trait]
pub trait DiagnosticStore: Send + Sync {
    async fn write_side_file(&self, bytes: &[u8], filename: &str) -> Result<()>;
}

/// Writes side files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FsDiagnosticStore {
    dir: PathBuf,
}

impl FsDiagnosticStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl DiagnosticStore for FsDiagnosticStore {
    async fn write_side_file(&self, bytes: &[u8], filename: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            diagnostic_error(format!("failed to create {}: {err}", self.dir.display()))
        })?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| diagnostic_error(format!("failed to write {}: {err}", path.display())))?;
        debug!("Side file written to {:?}", path);
        Ok(())
    }
}

/// Discards everything; used when no diagnostics directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnosticStore;

#[async_trait]
impl DiagnosticStore for NullDiagnosticStore {
    async fn write_side_file(&self, _bytes: &[u8], _filename: &str) -> Result<()> {
        Ok(())
    }
}

/// In-memory store for tests and short demo runs.
#[derive(Clone, Default)]
pub struct MemoryDiagnosticStore {
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryDiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn filenames(&self) -> Vec<String> {
        self.files
            .lock()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }
}

#[async_trait]
impl DiagnosticStore for MemoryDiagnosticStore {
    async fn write_side_file(&self, bytes: &[u8], filename: &str) -> Result<()> {
        self.files
            .lock()
            .await
            .push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Picks the store matching the configured diagnostics directory.
pub fn diagnostic_store(dir: Option<&str>) -> Arc<dyn DiagnosticStore> {
    match dir {
        Some(dir) => {
            info!("Diagnostic side files go to {dir}");
            Arc::new(FsDiagnosticStore::new(dir))
        }
        None => Arc::new(NullDiagnosticStore),
    }
}

pub fn diagnostic_error(message: impl Into<String>) -> GlimpseError {
    GlimpseError::DiagnosticWrite(message.into())
}
