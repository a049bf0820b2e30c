use std::{
    future::Future,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// A fixed-period job that can be started and stopped any number of times
/// without ever running two loops at once.
///
/// The first run happens immediately. A run that outlasts the period swallows
/// the ticks it overlapped instead of queueing them, and cancellation is only
/// observed between runs, so an in-flight run always finishes.
pub struct RepeatingTask {
    name: &'static str,
    running: Mutex<Option<Running>>,
}

impl RepeatingTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Mutex::new(None),
        }
    }

    /// Returns `false` when the task is already running.
    pub fn start<F, Fut>(&self, period: Duration, mut job: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("{} timer already running", self.name);
            return false;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => job().await,
                }
            }
            debug!("{name} timer stopped");
        });
        debug!("{} timer started ({} ms)", self.name, period.as_millis());
        *running = Some(Running { token, handle });
        true
    }

    /// Cancels the loop and waits for an in-flight run to finish. Returns
    /// `false` when nothing was running.
    pub async fn stop(&self) -> bool {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Running { token, handle }) = running else {
            return false;
        };
        token.cancel();
        if let Err(err) = handle.await {
            warn!("{} timer ended abnormally: {err}", self.name);
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            running.token.cancel();
        }
    }
}
