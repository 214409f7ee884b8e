//! Aggregated snapshot of one cycle and its on-disk record

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::ProbeResult;

/// File name of the snapshot record inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "status_data.json";

/// Every probe result of one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub bots: Vec<ProbeResult>,
    #[serde(default)]
    pub websites: Vec<ProbeResult>,
    #[serde(default)]
    pub discord_services: Vec<ProbeResult>,
    #[serde(default)]
    pub custom_services: Vec<ProbeResult>,
    pub last_updated_utc: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            bots: Vec::new(),
            websites: Vec::new(),
            discord_services: Vec::new(),
            custom_services: Vec::new(),
            last_updated_utc: at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
            && self.websites.is_empty()
            && self.discord_services.is_empty()
            && self.custom_services.is_empty()
    }

    /// Number of entries across all sections
    pub fn len(&self) -> usize {
        self.bots.len()
            + self.websites.len()
            + self.discord_services.len()
            + self.custom_services.len()
    }
}

/// Reads and overwrites the persisted snapshot
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last persisted snapshot; `None` when missing or unreadable
    pub fn load(&self) -> Option<Snapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No persisted snapshot at {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Replace the persisted snapshot
    pub fn save(&self, snapshot: &Snapshot) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!("Saved snapshot to {:?}", self.path);
        Ok(())
    }
}
