//! Shared state for the current snapshot and publish outcomes

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::publisher::PublishRecord;
use crate::snapshot::Snapshot;

/// Shared state accessible by the scheduler and dashboard
#[derive(Debug)]
pub struct SharedState {
    /// The current snapshot; seeded from disk at start
    pub snapshot: Option<Snapshot>,
    pub last_publish: Option<PublishRecord>,
    pub cycles_completed: u64,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(seed: Option<Snapshot>) -> Self {
        Self {
            snapshot: seed,
            last_publish: None,
            cycles_completed: 0,
            started_at: Instant::now(),
        }
    }

    /// Replace the current snapshot after a completed cycle
    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
        self.cycles_completed += 1;
    }

    pub fn record_publish(&mut self, record: PublishRecord) {
        self.last_publish = Some(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(seed: Option<Snapshot>) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(seed)))
}
