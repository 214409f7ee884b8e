//! Configuration record for the statusboard service
//!
//! The record is a single JSON document that is shared with the external admin
//! panel. Documents are versioned through `schema_version`; older documents are
//! upgraded by [`migrate`] before they are deserialized, and anything that
//! cannot be read is replaced by [`Config::default`].

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::display::DisplayRef;

/// Schema version written by this build
pub const CONFIG_SCHEMA_VERSION: u64 = 1;

/// File name of the configuration record inside the data directory
pub const CONFIG_FILE_NAME: &str = "status_config.json";

/// A bot whose presence is shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotTarget {
    pub id: u64,
    pub label: String,
}

/// A website probed with a GET request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteTarget {
    pub url: String,
    pub label: String,
}

/// A user-declared service whose status is copied through verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomService {
    pub name: String,
    pub status: String,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u64,
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
    pub bots: Vec<BotTarget>,
    pub websites: Vec<WebsiteTarget>,
    #[serde(with = "services_map")]
    pub services: Vec<CustomService>,
    pub monitored_discord_services: Vec<String>,
    /// Minutes between scheduled refreshes
    pub refresh_interval: u32,
    pub embed_title: String,
    pub api_post_url: Option<String>,
    pub api_secret_token: Option<String>,
    /// Keys this build does not know about, kept so they survive a rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            guild_id: None,
            channel_id: None,
            message_id: None,
            bots: Vec::new(),
            websites: Vec::new(),
            services: Vec::new(),
            monitored_discord_services: Vec::new(),
            refresh_interval: default_refresh_interval(),
            embed_title: default_embed_title(),
            api_post_url: None,
            api_secret_token: None,
            extra: Map::new(),
        }
    }
}

fn default_refresh_interval() -> u32 {
    5
}

fn default_embed_title() -> String {
    "Service Status".to_string()
}

/// Prefix `https://` when the URL carries no scheme
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Reference to the current display message, if one has been placed
    pub fn display_ref(&self) -> Option<DisplayRef> {
        match (self.channel_id, self.message_id) {
            (Some(channel_id), Some(message_id)) => Some(DisplayRef {
                channel_id,
                message_id,
            }),
            _ => None,
        }
    }

    pub fn set_display(&mut self, display: DisplayRef) {
        self.channel_id = Some(display.channel_id);
        self.message_id = Some(display.message_id);
    }

    pub fn clear_display(&mut self) {
        self.channel_id = None;
        self.message_id = None;
    }

    /// Add a bot; returns false when the id is already monitored
    pub fn add_bot(&mut self, id: u64, label: &str) -> bool {
        if self.bots.iter().any(|b| b.id == id) {
            return false;
        }
        self.bots.push(BotTarget {
            id,
            label: label.trim().to_string(),
        });
        true
    }

    pub fn remove_bot(&mut self, id: u64) -> Option<BotTarget> {
        let index = self.bots.iter().position(|b| b.id == id)?;
        Some(self.bots.remove(index))
    }

    /// Add a website; returns false when the (normalized) URL is already monitored
    pub fn add_website(&mut self, url: &str, label: &str) -> bool {
        let url = normalize_url(url);
        if self.websites.iter().any(|w| w.url == url) {
            return false;
        }
        let label = match label.trim() {
            "" => url.clone(),
            l => l.to_string(),
        };
        self.websites.push(WebsiteTarget { url, label });
        true
    }

    pub fn remove_website(&mut self, url: &str) -> Option<WebsiteTarget> {
        let url = normalize_url(url);
        let index = self.websites.iter().position(|w| w.url == url)?;
        Some(self.websites.remove(index))
    }

    /// Insert or update a custom service. An empty status means "Operational".
    pub fn set_service(&mut self, name: &str, status: &str) {
        let name = name.trim();
        let status = match status.trim() {
            "" => "Operational".to_string(),
            s => s.to_string(),
        };
        match self.services.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.status = status,
            None => self.services.push(CustomService {
                name: name.to_string(),
                status,
            }),
        }
    }

    pub fn remove_service(&mut self, name: &str) -> bool {
        let before = self.services.len();
        self.services.retain(|s| s.name != name.trim());
        self.services.len() != before
    }

    pub fn watch_component(&mut self, id: &str) -> bool {
        if self.monitored_discord_services.iter().any(|c| c == id) {
            return false;
        }
        self.monitored_discord_services.push(id.to_string());
        true
    }

    pub fn unwatch_component(&mut self, id: &str) -> bool {
        let before = self.monitored_discord_services.len();
        self.monitored_discord_services.retain(|c| c != id);
        self.monitored_discord_services.len() != before
    }

    pub fn set_refresh_interval(&mut self, minutes: u32) -> crate::Result<()> {
        if minutes == 0 {
            return Err(crate::StatusboardError::Config(
                "refresh interval must be at least one minute".to_string(),
            ));
        }
        self.refresh_interval = minutes;
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) {
        self.embed_title = match title.trim() {
            "" => default_embed_title(),
            t => t.to_string(),
        };
    }

    /// Set the sink URL and token; blank values unset them
    pub fn set_sink(&mut self, url: Option<String>, token: Option<String>) {
        self.api_post_url = non_empty(url);
        self.api_secret_token = non_empty(token);
    }
}

/// Custom services are stored as an ordered `{name: status}` object
mod services_map {
    use serde::de::Deserializer;
    use serde::ser::Serializer;
    use serde::Deserialize;
    use serde_json::{Map, Value};

    use super::CustomService;

    pub fn serialize<S: Serializer>(
        services: &[CustomService],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(services.iter().map(|s| (&s.name, &s.status)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<CustomService>, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .map(|(name, status)| {
                let status = match status {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                CustomService { name, status }
            })
            .collect())
    }
}

/// Upgrade a raw configuration document to the current schema version
pub fn migrate(mut document: Value) -> crate::Result<Value> {
    let object = document.as_object_mut().ok_or_else(|| {
        crate::StatusboardError::Config("configuration root is not a JSON object".to_string())
    })?;

    let version = object
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    if version > CONFIG_SCHEMA_VERSION {
        return Err(crate::StatusboardError::Config(format!(
            "unsupported schema version {} (newest known is {})",
            version, CONFIG_SCHEMA_VERSION
        )));
    }

    if version == 0 {
        migrate_v0_to_v1(object)?;
    }

    Ok(document)
}

/// Version 0 documents were written without a version and with keys missing
/// or null. Fill every key from the default record and clamp the interval.
fn migrate_v0_to_v1(object: &mut Map<String, Value>) -> crate::Result<()> {
    tracing::debug!("Migrating configuration from schema v0 to v1");

    let Value::Object(defaults) = serde_json::to_value(Config::default())? else {
        return Err(crate::StatusboardError::Config(
            "default configuration did not serialize to an object".to_string(),
        ));
    };

    for (key, default) in defaults {
        let missing = object.get(&key).is_none_or(Value::is_null);
        if missing {
            object.insert(key, default);
        }
    }

    let interval_ok = object
        .get("refresh_interval")
        .and_then(Value::as_u64)
        .is_some_and(|m| m > 0 && m <= u64::from(u32::MAX));
    if !interval_ok {
        object.insert(
            "refresh_interval".to_string(),
            Value::from(default_refresh_interval()),
        );
    }

    object.insert(
        "schema_version".to_string(),
        Value::from(CONFIG_SCHEMA_VERSION),
    );
    Ok(())
}

/// Parse configuration text, migrating older schema versions
pub fn parse_config(content: &str) -> crate::Result<Config> {
    let document: Value = serde_json::from_str(content)?;
    let document = migrate(document)?;
    let config: Config = serde_json::from_value(document)?;
    if config.refresh_interval == 0 {
        return Err(crate::StatusboardError::Config(
            "refresh_interval must be greater than zero".to_string(),
        ));
    }
    Ok(config)
}

/// Load configuration from a JSON file.
///
/// Never fails: a missing or unreadable file yields the default record. The
/// file is rewritten pretty-printed afterwards so it always reflects the
/// current schema.
pub fn load_config(path: &Path) -> Config {
    let config = match std::fs::read_to_string(path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Configuration file {:?} is unusable ({}), using defaults",
                    path,
                    e
                );
                Config::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No configuration file at {:?}, creating one", path);
            Config::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    };

    if let Err(e) = save_config(path, &config) {
        tracing::warn!("Failed to rewrite config file {:?}: {}", path, e);
    }
    config
}

/// Write configuration as pretty-printed JSON, creating parent directories.
///
/// The record is written to a temporary file beside `path` and renamed over
/// it, so a concurrent reader sees either the old or the new document.
pub fn save_config(path: &Path, config: &Config) -> crate::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let content = serde_json::to_string_pretty(config)?;
    let write_failed = |e: std::io::Error| {
        crate::StatusboardError::Config(format!("Failed to write config file {:?}: {}", path, e))
    };
    let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(write_failed)?;
    staged.write_all(content.as_bytes()).map_err(write_failed)?;
    staged.persist(path).map_err(|e| write_failed(e.error))?;

    tracing::debug!("Saved configuration to {:?}", path);
    Ok(())
}

/// Owns the configuration file and the in-memory copy of the record
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Config>,
}

impl ConfigStore {
    /// Load the record at `path`, falling back to defaults
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = load_config(&path);
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the in-memory record
    pub async fn current(&self) -> Config {
        self.current.read().await.clone()
    }

    /// Re-read the file, picking up edits made by the admin collaborator
    pub async fn reload(&self) -> Config {
        let config = load_config(&self.path);
        *self.current.write().await = config.clone();
        config
    }

    /// Apply a mutation and persist the result.
    ///
    /// The in-memory record only changes once the file has been written.
    pub async fn update<T>(&self, mutate: impl FnOnce(&mut Config) -> T) -> crate::Result<T> {
        let mut current = self.current.write().await;
        let mut next = current.clone();
        let result = mutate(&mut next);
        save_config(&self.path, &next)?;
        *current = next;
        Ok(result)
    }
}
