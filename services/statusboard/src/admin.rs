//! Offline edits of the configuration record

use crate::config::{normalize_url, Config};
use crate::StatusboardError;

/// One edit requested from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    AddBot { id: u64, label: String },
    RemoveBot { id: u64 },
    AddWebsite { url: String, label: Option<String> },
    RemoveWebsite { url: String },
    SetService { name: String, status: String },
    RemoveService { name: String },
    WatchComponent { id: String },
    UnwatchComponent { id: String },
    SetInterval { minutes: u32 },
    SetTitle { title: String },
    SetSink { url: Option<String>, token: Option<String> },
}

/// Apply `action` to `config` and describe what changed.
///
/// Rejected edits leave the record untouched.
pub fn apply(config: &mut Config, action: AdminAction) -> crate::Result<String> {
    match action {
        AdminAction::AddBot { id, label } => {
            if config.add_bot(id, &label) {
                Ok(format!("Added bot '{}' ({})", label, id))
            } else {
                Err(StatusboardError::Config(format!("Bot {} is already monitored", id)))
            }
        }
        AdminAction::RemoveBot { id } => match config.remove_bot(id) {
            Some(bot) => Ok(format!("Removed bot '{}'", bot.label)),
            None => Err(StatusboardError::Config(format!("Bot {} is not monitored", id))),
        },
        AdminAction::AddWebsite { url, label } => {
            let url = normalize_url(&url);
            let label = label.unwrap_or_else(|| url.clone());
            if config.add_website(&url, &label) {
                Ok(format!("Added website '{}' ({})", label, url))
            } else {
                Err(StatusboardError::Config(format!(
                    "Website {} is already monitored",
                    url
                )))
            }
        }
        AdminAction::RemoveWebsite { url } => match config.remove_website(&url) {
            Some(site) => Ok(format!("Removed website '{}'", site.label)),
            None => Err(StatusboardError::Config(format!(
                "Website {} is not monitored",
                url
            ))),
        },
        AdminAction::SetService { name, status } => {
            config.set_service(&name, &status);
            Ok(format!("Service '{}' set to '{}'", name, status))
        }
        AdminAction::RemoveService { name } => {
            if config.remove_service(&name) {
                Ok(format!("Removed service '{}'", name))
            } else {
                Err(StatusboardError::Config(format!("No service named '{}'", name)))
            }
        }
        AdminAction::WatchComponent { id } => {
            if config.watch_component(&id) {
                Ok(format!("Watching component {}", id))
            } else {
                Err(StatusboardError::Config(format!(
                    "Component {} is already watched",
                    id
                )))
            }
        }
        AdminAction::UnwatchComponent { id } => {
            if config.unwatch_component(&id) {
                Ok(format!("Stopped watching component {}", id))
            } else {
                Err(StatusboardError::Config(format!("Component {} is not watched", id)))
            }
        }
        AdminAction::SetInterval { minutes } => {
            config.set_refresh_interval(minutes)?;
            Ok(format!("Refresh interval set to {} minute(s)", minutes))
        }
        AdminAction::SetTitle { title } => {
            config.set_title(&title);
            Ok(format!("Title set to '{}'", config.embed_title))
        }
        AdminAction::SetSink { url, token } => {
            config.set_sink(url, token);
            Ok(match &config.api_post_url {
                Some(url) => format!("Sink set to {}", url),
                None => "Sink disabled".to_string(),
            })
        }
    }
}

/// Pretty JSON of the record with the sink token masked
pub fn show(config: &Config) -> crate::Result<String> {
    let mut redacted = config.clone();
    if redacted.api_secret_token.is_some() {
        redacted.api_secret_token = Some("********".to_string());
    }
    Ok(serde_json::to_string_pretty(&redacted)?)
}
