//! Statusboard - aggregated service status for Discord
//!
//! Probes bot presence, websites and Discord platform components, renders the
//! result into a single status message and relays each snapshot to an
//! optional HTTP sink.

pub mod admin;
pub mod aggregator;
pub mod config;
pub mod dashboard;
pub mod discord;
pub mod display;
pub mod error;
pub mod io;
pub mod probe;
pub mod publisher;
pub mod render;
pub mod scheduler;
pub mod snapshot;
pub mod state;
pub mod status;

pub use config::{load_config, Config, ConfigStore};
pub use error::{Result, StatusboardError};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;
use crate::config::CONFIG_FILE_NAME;
use crate::dashboard::DashboardState;
use crate::discord::{DiscordGateway, ReadyHandler};
use crate::display::DisplaySurface;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::probe::{PresenceSource, ProbeSet};
use crate::publisher::SinkPublisher;
use crate::scheduler::Scheduler;
use crate::snapshot::{SnapshotStore, SNAPSHOT_FILE_NAME};
use crate::state::StateHandle;

/// Everything one running service shares, built once at start
pub struct Statusboard {
    pub config: Arc<ConfigStore>,
    pub snapshots: SnapshotStore,
    pub probes: Arc<ProbeSet>,
    pub state: StateHandle,
    pub scheduler: Arc<Scheduler>,
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for Statusboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statusboard")
            .field("config", &self.config.path())
            .field("snapshots", &self.snapshots.path())
            .finish()
    }
}

impl Statusboard {
    /// Wire the components around the records in `data_dir`.
    ///
    /// Shared state is seeded with the last persisted snapshot.
    pub fn new(
        data_dir: &Path,
        http: Arc<dyn HttpClient>,
        presence: Arc<dyn PresenceSource>,
        display: Arc<dyn DisplaySurface>,
        cancel: CancellationToken,
    ) -> Self {
        let config = Arc::new(ConfigStore::open(data_dir.join(CONFIG_FILE_NAME)));
        let snapshots = SnapshotStore::new(data_dir.join(SNAPSHOT_FILE_NAME));
        let state = state::new_state_handle(snapshots.load());
        let probes = Arc::new(ProbeSet::new(Arc::clone(&http), presence));

        let aggregator = Aggregator::new(
            Arc::clone(&probes),
            snapshots.clone(),
            Arc::clone(&display),
            Arc::clone(&config),
        );
        let scheduler = Arc::new(Scheduler::new(
            aggregator,
            SinkPublisher::new(http),
            display,
            Arc::clone(&config),
            Arc::clone(&state),
            cancel.clone(),
        ));

        Self {
            config,
            snapshots,
            probes,
            state,
            scheduler,
            cancel,
        }
    }

    pub fn dashboard_state(&self) -> DashboardState {
        DashboardState {
            state: Arc::clone(&self.state),
            scheduler: Arc::clone(&self.scheduler),
            probes: Arc::clone(&self.probes),
        }
    }
}

/// Options for [`run`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    pub token: String,
    /// Place a fresh display message in this channel once connected
    pub channel: Option<u64>,
    pub dashboard_port: Option<u16>,
}

/// Bind the dashboard port and serve until cancelled
async fn spawn_dashboard(
    dashboard_state: DashboardState,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StatusboardError::Dashboard(format!("bind {}: {}", addr, e)))?;
    tracing::info!("Dashboard listening on http://{}", addr);

    let router = dashboard::build_router(dashboard_state);
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await
            .ok();

        tracing::debug!("Dashboard stopped");
    });
    Ok(())
}

/// Run the service until Ctrl-C
pub async fn run(options: RunOptions) -> Result<()> {
    if options.token.trim().is_empty() {
        return Err(StatusboardError::Config(
            "Discord token is empty".to_string(),
        ));
    }

    let cancel = CancellationToken::new();
    let gateway = Arc::new(DiscordGateway::new(&options.token));
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let board = Statusboard::new(
        &options.data_dir,
        http,
        Arc::clone(&gateway) as Arc<dyn PresenceSource>,
        Arc::clone(&gateway) as Arc<dyn DisplaySurface>,
        cancel.clone(),
    );
    tracing::debug!("{:?}", board);

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    if let Some(port) = options.dashboard_port {
        if let Err(e) = spawn_dashboard(board.dashboard_state(), port, cancel.clone()).await {
            tracing::error!("{}. Continuing without dashboard.", e);
        }
    }

    let handler = ReadyHandler::new(gateway, Arc::clone(&board.scheduler), options.channel);
    let mut client = serenity::Client::builder(&options.token, discord::gateway_intents())
        .event_handler(handler)
        .await
        .map_err(|e| StatusboardError::Discord(format!("client build failed: {}", e)))?;

    let shard_manager = Arc::clone(&client.shard_manager);
    let cancel_for_gateway = cancel.clone();
    tokio::spawn(async move {
        cancel_for_gateway.cancelled().await;
        shard_manager.shutdown_all().await;
    });

    tracing::info!("Statusboard starting, connecting to Discord");
    let result = client
        .start()
        .await
        .map_err(|e| StatusboardError::Discord(format!("gateway error: {}", e)));

    cancel.cancel();
    tracing::info!("Statusboard stopped");
    result
}
