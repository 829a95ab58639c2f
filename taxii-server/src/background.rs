//! Background expiry sweepers: paging-session idle timeout and status-record
//! retention, each a `tokio::time::interval`-driven task with an explicit
//! stop handle rather than a fire-and-forget spawn or a self-rescheduling
//! timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use taxii_core::ServerConfig;
use taxii_memory::MemoryBackend;

/// Handle to the two running sweepers. Dropping this without calling
/// [`BackgroundTasks::shutdown`] leaves the tasks running; `shutdown` should
/// always be awaited on graceful termination.
pub struct BackgroundTasks {
    token: CancellationToken,
    session_sweeper: JoinHandle<()>,
    status_sweeper: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Spawn both sweepers against `backend`, using the intervals and
    /// retention window from `config`. Returns `None` if
    /// `config.run_cleanup_threads` is `false`.
    #[must_use]
    pub fn spawn(backend: Arc<MemoryBackend>, config: Arc<ServerConfig>) -> Option<Self> {
        if !config.run_cleanup_threads {
            return None;
        }

        let token = CancellationToken::new();

        let session_sweeper = tokio::spawn(session_sweep_loop(
            backend.clone(),
            Duration::from_secs(config.session_sweep_interval_secs),
            chrono::Duration::seconds(config.session_timeout_secs as i64),
            token.clone(),
        ));

        let status_sweeper = tokio::spawn(status_sweep_loop(
            backend,
            Duration::from_secs(config.status_sweep_interval_secs),
            chrono::Duration::seconds(config.status_retention_secs as i64),
            token.clone(),
        ));

        Some(Self { token, session_sweeper, status_sweeper })
    }

    /// Signal both sweepers to stop and wait for them to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.session_sweeper.await;
        let _ = self.status_sweeper.await;
        info!("background sweepers stopped");
    }
}

async fn session_sweep_loop(backend: Arc<MemoryBackend>, interval: Duration, timeout: chrono::Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            () = token.cancelled() => return,
            _ = ticker.tick() => {
                backend.sweep_expired_sessions(Utc::now(), timeout);
                debug!("swept expired paging sessions");
            }
        }
    }
}

async fn status_sweep_loop(backend: Arc<MemoryBackend>, interval: Duration, retention: chrono::Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            () = token.cancelled() => return,
            _ = ticker.tick() => {
                backend.sweep_expired_statuses(Utc::now(), retention);
                debug!("swept expired status records");
            }
        }
    }
}
