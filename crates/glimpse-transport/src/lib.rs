//! Delivery seam: the session-aware uploader archives are handed to.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream::BoxStream, StreamExt};
use glimpse_types::{GlimpseError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

/// Authenticated session layer. Owns the session identifier; archives are
/// only meaningful inside a session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `None` until a session has been established.
    fn session_id(&self) -> Option<String>;
    async fn upload_batch(&self, archive: Vec<u8>, archive_name: &str) -> Result<()>;
}

/// `{session}-{last capture millis}.tar.gz`
pub fn archive_name(session_id: &str, last_capture_ms: i64) -> String {
    format!("{session_id}-{last_capture_ms}.tar.gz")
}

/// Notification published for every archive the collector accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub archive_name: String,
    pub bytes: usize,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredArchive {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct CollectorState {
    session_id: Option<String>,
    online: bool,
    archives: Vec<StoredArchive>,
    rejected: u64,
}

/// In-process collector backed by a broadcast channel. Useful for demos and
/// tests; can be switched offline to exercise retry behaviour.
#[derive(Clone)]
pub struct LocalCollector {
    tx: broadcast::Sender<UploadEvent>,
    state: Arc<Mutex<CollectorState>>,
}

impl LocalCollector {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            state: Arc::new(Mutex::new(CollectorState {
                session_id: None,
                online: true,
                archives: Vec::new(),
                rejected: 0,
            })),
        }
    }

    pub fn with_session(self, session_id: impl Into<String>) -> Self {
        self.set_session_id(Some(session_id.into()));
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_session_id(&self, session_id: Option<String>) {
        self.state().session_id = session_id;
    }

    pub fn set_online(&self, online: bool) {
        self.state().online = online;
    }

    pub fn archives(&self) -> Vec<StoredArchive> {
        self.state().archives.clone()
    }

    pub fn rejected(&self) -> u64 {
        self.state().rejected
    }

    pub fn subscribe(&self) -> BoxStream<'static, UploadEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}

#[async_trait]
impl Transport for LocalCollector {
    fn session_id(&self) -> Option<String> {
        self.state().session_id.clone()
    }

    async fn upload_batch(&self, archive: Vec<u8>, archive_name: &str) -> Result<()> {
        let event = {
            let mut state = self.state();
            if !state.online {
                state.rejected += 1;
                warn!("Collector offline; rejecting {archive_name}");
                return Err(transport_error(format!(
                    "collector offline, {archive_name} not delivered"
                )));
            }
            let event = UploadEvent {
                archive_name: archive_name.to_string(),
                bytes: archive.len(),
                received_at: Utc::now(),
            };
            state.archives.push(StoredArchive {
                name: archive_name.to_string(),
                bytes: archive,
            });
            event
        };
        info!("Collector stored {} ({} bytes)", event.archive_name, event.bytes);
        let _ = self.tx.send(event);
        Ok(())
    }
}

pub fn transport_error(message: impl Into<String>) -> GlimpseError {
    GlimpseError::Transport(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_name_convention() {
        assert_eq!(
            archive_name("abc123", 1_700_000_000_000),
            "abc123-1700000000000.tar.gz"
        );
    }

    #[tokio::test]
    async fn collector_stores_and_publishes_uploads() {
        let collector = LocalCollector::new(8).with_session("s-1");
        let mut events = collector.subscribe();

        collector
            .upload_batch(vec![1, 2, 3], "s-1-42.tar.gz")
            .await
            .expect("upload");

        let event = events.next().await.expect("event");
        assert_eq!(event.archive_name, "s-1-42.tar.gz");
        assert_eq!(event.bytes, 3);
        let stored = collector.archives();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn offline_collector_rejects_uploads() {
        let collector = LocalCollector::new(8).with_session("s-1");
        collector.set_online(false);
        let err = collector
            .upload_batch(vec![9], "s-1-1.tar.gz")
            .await
            .unwrap_err();
        assert!(matches!(err, GlimpseError::Transport(_)));
        assert_eq!(collector.rejected(), 1);
        assert!(collector.archives().is_empty());
    }

    #[test]
    fn session_id_is_absent_until_set() {
        let collector = LocalCollector::new(1);
        assert_eq!(collector.session_id(), None);
        collector.set_session_id(Some("abc".into()));
        assert_eq!(collector.session_id().as_deref(), Some("abc"));
    }
}
