//! Aggregator: runs every probe of one cycle and merges the results

use std::sync::Arc;

use chrono::Utc;

use crate::config::{Config, ConfigStore, CustomService};
use crate::display::DisplaySurface;
use crate::probe::ProbeSet;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::status::{ProbeResult, StatusLabel, TargetRef};

/// Merges probe results into the current snapshot
pub struct Aggregator {
    probes: Arc<ProbeSet>,
    snapshots: SnapshotStore,
    display: Arc<dyn DisplaySurface>,
    config: Arc<ConfigStore>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("snapshots", &self.snapshots)
            .finish()
    }
}

impl Aggregator {
    pub fn new(
        probes: Arc<ProbeSet>,
        snapshots: SnapshotStore,
        display: Arc<dyn DisplaySurface>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            probes,
            snapshots,
            display,
            config,
        }
    }

    /// Probe everything in `config`, persist the snapshot and return it.
    ///
    /// Order is fixed: bots, websites, Discord components, custom services.
    /// A persist failure is logged; the snapshot is still returned.
    pub async fn run_cycle(&self, config: &Config) -> Snapshot {
        let bots = if config.bots.is_empty() {
            Vec::new()
        } else {
            match self.guild_context(config).await {
                Some(guild_id) => self.probes.probe_bots(guild_id, &config.bots).await,
                None => {
                    tracing::debug!("No guild context, skipping {} bot(s)", config.bots.len());
                    Vec::new()
                }
            }
        };

        let websites = self.probes.probe_websites(&config.websites).await;
        let discord_services = self
            .probes
            .probe_discord_components(&config.monitored_discord_services)
            .await;
        let custom_services = config.services.iter().map(custom_result).collect();

        let snapshot = Snapshot {
            bots,
            websites,
            discord_services,
            custom_services,
            last_updated_utc: Utc::now(),
        };

        if let Err(e) = self.snapshots.save(&snapshot) {
            tracing::warn!(
                "Failed to persist snapshot to {:?}: {}",
                self.snapshots.path(),
                e
            );
        }

        tracing::debug!("Aggregated {} entries", snapshot.len());
        snapshot
    }

    /// Guild used for presence lookups.
    ///
    /// Falls back to the guild owning the display channel and remembers it.
    async fn guild_context(&self, config: &Config) -> Option<u64> {
        if let Some(guild_id) = config.guild_id {
            return Some(guild_id);
        }
        let channel_id = config.channel_id?;

        match self.display.channel_guild(channel_id).await {
            Ok(guild_id) => {
                tracing::info!("Resolved guild {} from channel {}", guild_id, channel_id);
                if let Err(e) = self.config.update(|c| c.guild_id = Some(guild_id)).await {
                    tracing::warn!("Failed to save resolved guild id: {}", e);
                }
                Some(guild_id)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not resolve guild for channel {}: {}",
                    channel_id,
                    e
                );
                None
            }
        }
    }
}

/// Custom services are declared, not probed; the text is kept verbatim
fn custom_result(service: &CustomService) -> ProbeResult {
    let state = StatusLabel::from_text(&service.status).unwrap_or(StatusLabel::NotFound);
    ProbeResult::new(&service.name, TargetRef::Custom, state, &service.status)
}
