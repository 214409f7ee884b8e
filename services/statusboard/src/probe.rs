//! Probes for bots, websites and the Discord component catalog
//!
//! Every probe folds its failures into a [`ProbeResult`]; nothing here returns
//! an error to the aggregator. There are no retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{BotTarget, WebsiteTarget};
use crate::io::HttpClient;
use crate::status::{titleize, ProbeResult, StatusLabel, TargetRef};

/// Upstream catalog of Discord platform components
pub const DISCORD_STATUS_CATALOG_URL: &str = "https://discordstatus.com/api/v2/components.json";

/// Timeout applied to website and catalog requests
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Label used for the synthetic entry when the catalog cannot be read
const CATALOG_LABEL: &str = "Discord API";

/// Live presence of a guild member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Idle,
    DoNotDisturb,
    Invisible,
    Offline,
}

impl Presence {
    /// Raw presence name as reported by the gateway
    pub fn raw(self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Idle => "idle",
            Presence::DoNotDisturb => "dnd",
            Presence::Invisible => "invisible",
            Presence::Offline => "offline",
        }
    }

    fn to_result(self, target: &BotTarget) -> ProbeResult {
        let (state, text) = match self {
            Presence::Online => (StatusLabel::Online, "Online"),
            Presence::Idle => (StatusLabel::Idle, "Idle"),
            Presence::DoNotDisturb => (StatusLabel::DoNotDisturb, "Do Not Disturb"),
            Presence::Invisible => (StatusLabel::Offline, "Invisible"),
            Presence::Offline => (StatusLabel::Offline, "Offline"),
        };
        ProbeResult::new(&target.label, TargetRef::Bot { id: target.id }, state, text)
            .with_raw_status(self.raw())
    }
}

/// Source of member presence within a guild
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PresenceSource: Send + Sync {
    async fn member_presence(&self, guild_id: u64, user_id: u64) -> crate::Result<Presence>;
}

/// One entry of the upstream component catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogComponent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    components: Vec<CatalogComponent>,
}

enum CatalogFetch {
    Components(Vec<CatalogComponent>),
    BadStatus(u16),
    Failed(String),
}

/// Map an upstream component status to a label and status line
pub fn component_status(raw: &str) -> (StatusLabel, String) {
    match raw {
        "operational" => (StatusLabel::Operational, "Operational".to_string()),
        "degraded_performance" | "partial_outage" => {
            (StatusLabel::PartialOutage, "Partial Outage".to_string())
        }
        "major_outage" => (StatusLabel::Offline, "Offline".to_string()),
        "under_maintenance" => (StatusLabel::Maintenance, "Maintenance".to_string()),
        other => (StatusLabel::NotFound, titleize(other)),
    }
}

/// Checks every kind of probed target
pub struct ProbeSet {
    http: Arc<dyn HttpClient>,
    presence: Arc<dyn PresenceSource>,
    catalog_url: String,
}

impl std::fmt::Debug for ProbeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSet")
            .field("catalog_url", &self.catalog_url)
            .finish()
    }
}

impl ProbeSet {
    pub fn new(http: Arc<dyn HttpClient>, presence: Arc<dyn PresenceSource>) -> Self {
        Self {
            http,
            presence,
            catalog_url: DISCORD_STATUS_CATALOG_URL.to_string(),
        }
    }

    /// Point the component probe at another catalog
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    pub async fn probe_bot(&self, guild_id: u64, target: &BotTarget) -> ProbeResult {
        let bot_ref = || TargetRef::Bot { id: target.id };
        match self.presence.member_presence(guild_id, target.id).await {
            Ok(presence) => presence.to_result(target),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Bot '{}' ({}) not in guild: {}", target.label, target.id, e);
                ProbeResult::new(
                    &target.label,
                    bot_ref(),
                    StatusLabel::NotFound,
                    "Not Found in Server",
                )
            }
            Err(e) if e.is_forbidden() => {
                tracing::debug!("No permission to look up '{}': {}", target.label, e);
                ProbeResult::new(&target.label, bot_ref(), StatusLabel::Error, "No Permissions")
            }
            Err(e) => {
                tracing::debug!("Presence lookup for '{}' failed: {}", target.label, e);
                ProbeResult::new(&target.label, bot_ref(), StatusLabel::Error, "Error Fetching")
            }
        }
    }

    pub async fn probe_bots(&self, guild_id: u64, targets: &[BotTarget]) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            results.push(self.probe_bot(guild_id, target).await);
        }
        results
    }

    pub async fn probe_website(&self, target: &WebsiteTarget) -> ProbeResult {
        let site_ref = TargetRef::Website {
            url: target.url.clone(),
        };
        match self.http.get_status(&target.url, PROBE_TIMEOUT).await {
            Ok(status) if (200..300).contains(&status) => {
                ProbeResult::new(&target.label, site_ref, StatusLabel::Online, "Online")
                    .with_raw_status(status.to_string())
            }
            Ok(status) => {
                tracing::debug!("Website '{}' answered {}", target.url, status);
                ProbeResult::new(
                    &target.label,
                    site_ref,
                    StatusLabel::Offline,
                    format!("Status {}", status),
                )
                .with_raw_status(status.to_string())
            }
            Err(e) => {
                tracing::debug!("Website '{}' unreachable: {}", target.url, e);
                ProbeResult::new(&target.label, site_ref, StatusLabel::Offline, "Offline")
                    .with_raw_status("unreachable")
            }
        }
    }

    pub async fn probe_websites(&self, targets: &[WebsiteTarget]) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            results.push(self.probe_website(target).await);
        }
        results
    }

    /// Look up the monitored component ids in one catalog request
    pub async fn probe_discord_components(&self, ids: &[String]) -> Vec<ProbeResult> {
        if ids.is_empty() {
            return Vec::new();
        }

        let components = match self.fetch_catalog().await {
            CatalogFetch::Components(components) => components,
            CatalogFetch::BadStatus(status) => {
                return vec![ProbeResult::new(
                    CATALOG_LABEL,
                    TargetRef::Catalog,
                    StatusLabel::Error,
                    format!("API Error ({})", status),
                )
                .with_raw_status("api_error")];
            }
            CatalogFetch::Failed(reason) => {
                tracing::warn!("Component catalog unavailable: {}", reason);
                return vec![ProbeResult::new(
                    CATALOG_LABEL,
                    TargetRef::Catalog,
                    StatusLabel::Error,
                    "Failed to Fetch",
                )
                .with_raw_status("fetch_failed")];
            }
        };

        ids.iter()
            .map(|id| {
                let component_ref = TargetRef::DiscordComponent { id: id.clone() };
                match components.iter().find(|c| &c.id == id) {
                    Some(component) => {
                        let (state, text) = component_status(&component.status);
                        ProbeResult::new(&component.name, component_ref, state, text)
                            .with_raw_status(&component.status)
                    }
                    None => ProbeResult::new(
                        titleize(id),
                        component_ref,
                        StatusLabel::NotFound,
                        "Not Found in API",
                    )
                    .with_raw_status("not_found"),
                }
            })
            .collect()
    }

    /// Full component catalog, for choosing which components to monitor
    pub async fn list_components(&self) -> crate::Result<Vec<CatalogComponent>> {
        match self.fetch_catalog().await {
            CatalogFetch::Components(components) => Ok(components),
            CatalogFetch::BadStatus(status) => Err(crate::StatusboardError::Http(format!(
                "Component catalog returned status {}",
                status
            ))),
            CatalogFetch::Failed(reason) => Err(crate::StatusboardError::Http(reason)),
        }
    }

    async fn fetch_catalog(&self) -> CatalogFetch {
        let response = match self.http.get(&self.catalog_url, PROBE_TIMEOUT).await {
            Ok(response) => response,
            Err(e) => return CatalogFetch::Failed(e.to_string()),
        };

        if response.status != 200 {
            tracing::debug!("Component catalog returned status {}", response.status);
            return CatalogFetch::BadStatus(response.status);
        }

        match serde_json::from_str::<CatalogResponse>(&response.body) {
            Ok(parsed) => CatalogFetch::Components(parsed.components),
            Err(e) => CatalogFetch::Failed(format!("Failed to parse component catalog: {}", e)),
        }
    }
}
