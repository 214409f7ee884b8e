//! Scheduler: drives refresh cycles on a timer and on demand

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::config::ConfigStore;
use crate::display::{DisplayRef, DisplaySurface};
use crate::publisher::SinkPublisher;
use crate::render::{render, DisplayDocument};
use crate::snapshot::Snapshot;
use crate::state::StateHandle;
use crate::StatusboardError;

/// Lifecycle of the refresh timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { interval_minutes: u32 },
}

/// Result of a manual trigger
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Completed(Snapshot),
    /// Another cycle held the slot; nothing was run
    AlreadyRunning,
}

/// Runs the probe, publish and render cycle
pub struct Scheduler {
    aggregator: Aggregator,
    publisher: SinkPublisher,
    display: Arc<dyn DisplaySurface>,
    config: Arc<ConfigStore>,
    state: StateHandle,
    cancel: CancellationToken,
    running: AtomicBool,
    cycle_slot: Mutex<()>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

fn is_stale(e: &StatusboardError) -> bool {
    e.is_not_found() || e.is_forbidden()
}

fn minutes(interval_minutes: u32) -> Duration {
    Duration::from_secs(u64::from(interval_minutes) * 60)
}

impl Scheduler {
    pub fn new(
        aggregator: Aggregator,
        publisher: SinkPublisher,
        display: Arc<dyn DisplaySurface>,
        config: Arc<ConfigStore>,
        state: StateHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            aggregator,
            publisher,
            display,
            config,
            state,
            cancel,
            running: AtomicBool::new(false),
            cycle_slot: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running {
                interval_minutes: self.config.current().await.refresh_interval,
            }
        } else {
            SchedulerState::Idle
        }
    }

    /// Enter `Running` and spawn the timer loop.
    ///
    /// Returns `None` when the loop is already running, so repeated ready
    /// events from the gateway start it only once.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Scheduler already running, ignoring start");
            return None;
        }
        tracing::info!("Scheduler started");
        let scheduler = Arc::clone(self);
        Some(tokio::spawn(async move {
            scheduler.timer_loop().await;
            scheduler.running.store(false, Ordering::SeqCst);
            tracing::info!("Scheduler stopped");
        }))
    }

    async fn timer_loop(&self) {
        loop {
            let fired_at = Instant::now();
            {
                let _slot = self.cycle_slot.lock().await;
                self.run_cycle().await;
            }

            // Read after the fire so a changed interval applies to the next one
            let interval = self.config.current().await.refresh_interval;
            tracing::debug!("Next refresh in {} minute(s)", interval);

            tokio::select! {
                _ = tokio::time::sleep_until(fired_at + minutes(interval)) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Refresh loop cancelled");
                    break;
                }
            }
        }
    }

    /// Run one cycle now, without moving the timer phase
    pub async fn trigger_update(&self) -> TriggerOutcome {
        let Ok(_slot) = self.cycle_slot.try_lock() else {
            tracing::info!("Refresh requested while a cycle is running, skipping");
            return TriggerOutcome::AlreadyRunning;
        };
        TriggerOutcome::Completed(self.run_cycle().await)
    }

    /// Persist a new refresh interval; it applies from the next scheduled fire
    pub async fn set_interval(&self, interval_minutes: u32) -> crate::Result<()> {
        self.config
            .update(|c| c.set_refresh_interval(interval_minutes))
            .await??;
        tracing::info!("Refresh interval set to {} minute(s)", interval_minutes);
        Ok(())
    }

    /// Move the display to `channel_id` and refresh it.
    ///
    /// A failed post is returned with the display refs left cleared.
    pub async fn place_display(&self, channel_id: u64) -> crate::Result<DisplayRef> {
        let placed = self.post_display(channel_id).await?;
        self.trigger_update().await;
        Ok(placed)
    }

    /// Move the display to `channel_id` without running a cycle.
    ///
    /// The previous message is deleted when reachable and an initializing
    /// document is posted in its place. Used when the timer is about to fire
    /// anyway.
    pub async fn post_display(&self, channel_id: u64) -> crate::Result<DisplayRef> {
        if let Some(old) = self.config.current().await.display_ref() {
            match self.display.delete_message(old).await {
                Ok(()) => tracing::debug!("Deleted previous display message {}", old.message_id),
                Err(e) if is_stale(&e) => {
                    tracing::debug!("Previous display message already gone: {}", e)
                }
                Err(e) => tracing::warn!("Failed to delete previous display message: {}", e),
            }
        }
        self.config.update(|c| c.clear_display()).await?;

        let placed = match self
            .display
            .post_message(channel_id, &DisplayDocument::initializing())
            .await
        {
            Ok(placed) => placed,
            Err(e) => {
                tracing::warn!("Failed to post display in channel {}: {}", channel_id, e);
                return Err(e);
            }
        };

        let guild_id = match self.display.channel_guild(channel_id).await {
            Ok(guild_id) => Some(guild_id),
            Err(e) => {
                tracing::debug!("Guild of channel {} unknown: {}", channel_id, e);
                None
            }
        };
        self.config
            .update(|c| {
                c.set_display(placed);
                if guild_id.is_some() {
                    c.guild_id = guild_id;
                }
            })
            .await?;

        let DisplayRef {
            channel_id,
            message_id,
        } = placed;
        tracing::info!(
            "Display placed in channel {} (message {})",
            channel_id,
            message_id
        );
        Ok(placed)
    }

    async fn forget_display(&self) {
        if let Err(e) = self.config.update(|c| c.clear_display()).await {
            tracing::warn!("Failed to clear display refs: {}", e);
        }
    }

    /// One full cycle. Callers hold the cycle slot.
    async fn run_cycle(&self) -> Snapshot {
        let mut config = self.config.reload().await;
        let mut display = config.display_ref();

        if let Some(target) = display {
            let reachable = match self.display.fetch_message(target).await {
                Ok(()) => self
                    .display
                    .edit_message(target, &DisplayDocument::loading())
                    .await,
                Err(e) => Err(e),
            };
            match reachable {
                Ok(()) => {}
                Err(e) if is_stale(&e) => {
                    tracing::warn!("Display message unavailable, clearing refs: {}", e);
                    self.forget_display().await;
                    config.clear_display();
                    display = None;
                }
                Err(e) => tracing::warn!("Failed to show loading state: {}", e),
            }
        }

        let snapshot = self.aggregator.run_cycle(&config).await;
        self.state.write().await.set_snapshot(snapshot.clone());

        if let Some(record) = self
            .publisher
            .publish(
                &snapshot,
                config.api_post_url.as_deref(),
                config.api_secret_token.as_deref(),
            )
            .await
        {
            self.state.write().await.record_publish(record);
        }

        if let Some(target) = display {
            let document = render(&snapshot, &config);
            match self.display.edit_message(target, &document).await {
                Ok(()) => tracing::debug!("Display message {} updated", target.message_id),
                Err(e) if is_stale(&e) => {
                    tracing::warn!("Display message unavailable, clearing refs: {}", e);
                    self.forget_display().await;
                }
                Err(e) => tracing::warn!("Failed to update display message: {}", e),
            }
        }

        tracing::info!("Refresh cycle complete ({} entries)", snapshot.len());
        snapshot
    }
}
