//! Process-local run state

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{RunStateStore, RunToken, StateError};

#[derive(Debug, Clone, Copy)]
struct Slot {
    percent: u8,
    stop: bool,
    updated_at: Instant,
}

impl Slot {
    fn new() -> Self {
        Self {
            percent: 0,
            stop: false,
            updated_at: Instant::now(),
        }
    }
}

/// Run state kept in a mutex-guarded map; lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryRunState {
    slots: Mutex<HashMap<RunToken, Slot>>,
}

impl MemoryRunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_slot<R>(&self, token: &RunToken, f: impl FnOnce(&mut Slot) -> R) -> Result<R, StateError> {
        let mut slots = self.slots.lock().map_err(|_| StateError::Poisoned)?;
        let slot = slots.entry(token.clone()).or_insert_with(Slot::new);
        slot.updated_at = Instant::now();
        Ok(f(slot))
    }

    fn read<R>(&self, token: &RunToken, f: impl FnOnce(&Slot) -> R) -> Result<Option<R>, StateError> {
        let slots = self.slots.lock().map_err(|_| StateError::Poisoned)?;
        Ok(slots.get(token).map(f))
    }
}

#[async_trait]
impl RunStateStore for MemoryRunState {
    async fn set_progress(&self, token: &RunToken, percent: u8) -> Result<(), StateError> {
        let percent = percent.min(100);
        self.with_slot(token, |slot| slot.percent = slot.percent.max(percent))
    }

    async fn progress(&self, token: &RunToken) -> Result<u8, StateError> {
        Ok(self.read(token, |slot| slot.percent)?.unwrap_or(0))
    }

    async fn request_stop(&self, token: &RunToken) -> Result<(), StateError> {
        self.with_slot(token, |slot| slot.stop = true)
    }

    async fn stop_requested(&self, token: &RunToken) -> Result<bool, StateError> {
        Ok(self.read(token, |slot| slot.stop)?.unwrap_or(false))
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize, StateError> {
        let mut slots = self.slots.lock().map_err(|_| StateError::Poisoned)?;
        let before = slots.len();
        slots.retain(|_, slot| slot.updated_at.elapsed() <= max_idle);
        Ok(before - slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_is_monotonic_and_clamped() {
        let state = MemoryRunState::new();
        let token = RunToken::generate();

        assert_eq!(state.progress(&token).await.unwrap(), 0);
        state.set_progress(&token, 40).await.unwrap();
        state.set_progress(&token, 30).await.unwrap();
        assert_eq!(state.progress(&token).await.unwrap(), 40);
        state.set_progress(&token, 250).await.unwrap();
        assert_eq!(state.progress(&token).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_isolated() {
        let state = MemoryRunState::new();
        let a = RunToken::generate();
        let b = RunToken::generate();

        state.request_stop(&a).await.unwrap();
        state.request_stop(&a).await.unwrap();
        assert!(state.stop_requested(&a).await.unwrap());
        assert!(!state.stop_requested(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_reads_do_not_create_slots() {
        let state = MemoryRunState::new();
        let token = RunToken::generate();
        state.progress(&token).await.unwrap();
        state.stop_requested(&token).await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_completed_runs_are_evicted_once_idle() {
        let state = MemoryRunState::new();
        for _ in 0..1000 {
            state.set_progress(&RunToken::generate(), 100).await.unwrap();
        }
        assert_eq!(state.len(), 1000);

        // Still inside the grace period
        assert_eq!(state.evict_idle(Duration::from_secs(60)).await.unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let live = RunToken::generate();
        state.set_progress(&live, 10).await.unwrap();

        assert_eq!(state.evict_idle(Duration::from_millis(10)).await.unwrap(), 1000);
        assert_eq!(state.len(), 1);
        assert_eq!(state.progress(&live).await.unwrap(), 10);
    }
}
