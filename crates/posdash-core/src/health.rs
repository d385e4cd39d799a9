//! Periodic backend health polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::{ApiError, StatusSource};
use crate::models::BackendStatus;

/// Latest health report; `status` and `error` are never both set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    pub status: Option<BackendStatus>,
    pub error: Option<ApiError>,
    /// True until the first poll completes.
    pub loading: bool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            status: None,
            error: None,
            loading: true,
        }
    }
}

/// Polls a [`StatusSource`] on a fixed interval until deactivated.
#[derive(Debug)]
pub struct HealthMonitor {
    state: Arc<watch::Sender<HealthState>>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling; the first poll is issued immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate<S: StatusSource>(source: Arc<S>, interval: Duration) -> Self {
        let state = Arc::new(watch::Sender::new(HealthState::default()));
        let task = tokio::spawn(poll(source, interval, Arc::clone(&state)));
        Self { state, task }
    }

    pub fn current(&self) -> HealthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.state.subscribe()
    }

    /// Stop polling. The last published state stays readable.
    pub fn deactivate(&self) {
        self.task.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll<S: StatusSource>(
    source: Arc<S>,
    period: Duration,
    state: Arc<watch::Sender<HealthState>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let next = match source.fetch_status().await {
            Ok(status) => HealthState {
                status: Some(status),
                error: None,
                loading: false,
            },
            Err(error) => {
                tracing::warn!("Health check failed: {}", error);
                HealthState {
                    status: None,
                    error: Some(error),
                    loading: false,
                }
            }
        };
        state.send_replace(next);
    }
}
