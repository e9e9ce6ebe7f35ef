//! # Progress and Cancellation Module
//!
//! Each run gets a `RunToken`. Progress (0 to 100, never decreasing) and a
//! stop flag are kept in a `RunStateStore` under that token, so callers can
//! poll a long crawl and ask it to stop from elsewhere. The crawl sees the
//! store through a `RunHandle`.

mod error;
mod memory;
mod sql;

pub use error::StateError;
pub use memory::MemoryRunState;
pub use sql::SqlRunState;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::crawler::CrawlMonitor;

/// Key of one run's progress slot and stop flag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunToken(String);

impl RunToken {
    /// A fresh random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for per-run progress and stop flags.
///
/// Unknown tokens read as 0% and not stopped. Progress writes never lower the
/// stored value. Slots are short-lived: `evict_idle` drops every slot not
/// written for longer than `max_idle`.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    async fn set_progress(&self, token: &RunToken, percent: u8) -> Result<(), StateError>;
    async fn progress(&self, token: &RunToken) -> Result<u8, StateError>;
    async fn request_stop(&self, token: &RunToken) -> Result<(), StateError>;
    async fn stop_requested(&self, token: &RunToken) -> Result<bool, StateError>;

    /// Remove idle slots, returning how many were removed
    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StateError>;
}

/// Answer to a progress poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub percent: u8,
}

/// Answer to a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopAck {
    pub accepted: bool,
}

/// Read progress for a token; storage errors read as 0
pub async fn poll_progress(store: &dyn RunStateStore, token: &RunToken) -> ProgressReport {
    let percent = store.progress(token).await.unwrap_or_else(|e| {
        warn!(%token, error = %e, "Failed to read progress");
        0
    });
    ProgressReport { percent }
}

/// Raise the stop flag for a token
pub async fn request_stop(store: &dyn RunStateStore, token: &RunToken) -> StopAck {
    match store.request_stop(token).await {
        Ok(()) => {
            debug!(%token, "Stop requested");
            StopAck { accepted: true }
        }
        Err(e) => {
            warn!(%token, error = %e, "Failed to record stop request");
            StopAck { accepted: false }
        }
    }
}

/// Drop slots idle for longer than `max_idle`; failures are logged and read as 0
pub async fn evict_idle(store: &dyn RunStateStore, max_idle: Duration) -> usize {
    match store.evict_idle(max_idle).await {
        Ok(0) => 0,
        Ok(evicted) => {
            debug!(evicted, "Evicted idle run state");
            evicted
        }
        Err(e) => {
            warn!(error = %e, "Failed to evict idle run state");
            0
        }
    }
}

/// A run's view of its own progress slot and stop flag
#[derive(Clone)]
pub struct RunHandle {
    token: RunToken,
    store: Arc<dyn RunStateStore>,
}

impl RunHandle {
    pub fn new(token: RunToken, store: Arc<dyn RunStateStore>) -> Self {
        Self { token, store }
    }

    pub fn token(&self) -> &RunToken {
        &self.token
    }

    /// Record progress; failures are logged and otherwise ignored
    pub async fn set_progress(&self, percent: u8) {
        if let Err(e) = self.store.set_progress(&self.token, percent).await {
            warn!(token = %self.token, error = %e, "Failed to record progress");
        }
    }

    /// Whether a stop was requested; an unreadable flag counts as not set
    pub async fn check_stop(&self) -> bool {
        self.store
            .stop_requested(&self.token)
            .await
            .unwrap_or_else(|e| {
                warn!(token = %self.token, error = %e, "Failed to read stop flag");
                false
            })
    }
}

#[async_trait]
impl CrawlMonitor for RunHandle {
    async fn report(&self, percent: u8) {
        self.set_progress(percent).await;
    }

    async fn should_stop(&self) -> bool {
        self.check_stop().await
    }
}
