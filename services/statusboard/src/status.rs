//! Status labels, glyphs and probe results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Glyph used for statuses that have no entry in the lookup table
pub const PLACEHOLDER_GLYPH: &str = "❔";

/// Glyph shown while a refresh is in progress
pub const LOADING_GLYPH: &str = "🔄";

/// Normalized status of a probed or declared target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Online,
    Offline,
    Idle,
    DoNotDisturb,
    Operational,
    PartialOutage,
    Maintenance,
    NotFound,
    Error,
}

impl StatusLabel {
    /// Glyph for this status on the display surface
    pub fn glyph(self) -> &'static str {
        match self {
            StatusLabel::Online => "🟩",
            StatusLabel::Operational => "✅",
            StatusLabel::Idle | StatusLabel::DoNotDisturb | StatusLabel::PartialOutage => "🟨",
            StatusLabel::Offline | StatusLabel::Error => "🟥",
            StatusLabel::Maintenance => "🛠️",
            StatusLabel::NotFound => PLACEHOLDER_GLYPH,
        }
    }

    /// Whether the target counts as up
    pub fn is_online(self) -> bool {
        matches!(self, StatusLabel::Online | StatusLabel::Operational)
    }

    /// Parse free-form status text, as typed for custom services.
    ///
    /// Returns `None` for text that does not name a known status.
    pub fn from_text(text: &str) -> Option<Self> {
        let normalized = text.trim().to_ascii_lowercase();
        let label = match normalized.as_str() {
            "online" => StatusLabel::Online,
            "offline" => StatusLabel::Offline,
            "idle" => StatusLabel::Idle,
            "do not disturb" | "dnd" => StatusLabel::DoNotDisturb,
            "operational" => StatusLabel::Operational,
            "partial outage" => StatusLabel::PartialOutage,
            "maintenance" | "under maintenance" => StatusLabel::Maintenance,
            "not found" => StatusLabel::NotFound,
            "error" => StatusLabel::Error,
            _ => return None,
        };
        Some(label)
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Online => write!(f, "Online"),
            StatusLabel::Offline => write!(f, "Offline"),
            StatusLabel::Idle => write!(f, "Idle"),
            StatusLabel::DoNotDisturb => write!(f, "Do Not Disturb"),
            StatusLabel::Operational => write!(f, "Operational"),
            StatusLabel::PartialOutage => write!(f, "Partial Outage"),
            StatusLabel::Maintenance => write!(f, "Maintenance"),
            StatusLabel::NotFound => write!(f, "Not Found"),
            StatusLabel::Error => write!(f, "Error"),
        }
    }
}

/// Glyph for free-form status text, falling back to the placeholder
pub fn glyph_for_text(text: &str) -> &'static str {
    StatusLabel::from_text(text)
        .map(StatusLabel::glyph)
        .unwrap_or(PLACEHOLDER_GLYPH)
}

/// What a probe result refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRef {
    Bot { id: u64 },
    Website { url: String },
    DiscordComponent { id: String },
    /// Synthetic entry standing in for an unavailable component catalog
    Catalog,
    Custom,
}

/// Result of checking one target during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub label: String,
    #[serde(flatten)]
    pub target: TargetRef,
    pub state: StatusLabel,
    /// Human readable status line, e.g. "Status 500" or "Not Found in API"
    pub status: String,
    pub online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,
}

impl ProbeResult {
    pub fn new(
        label: impl Into<String>,
        target: TargetRef,
        state: StatusLabel,
        status: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            target,
            state,
            status: status.into(),
            online: state.is_online(),
            raw_status: None,
        }
    }

    pub fn with_raw_status(mut self, raw: impl Into<String>) -> Self {
        self.raw_status = Some(raw.into());
        self
    }

    /// Glyph for this result. Custom services carry free text and go through the text lookup.
    pub fn glyph(&self) -> &'static str {
        match self.target {
            TargetRef::Custom => glyph_for_text(&self.status),
            _ => self.state.glyph(),
        }
    }
}

/// Title-case text the way status identifiers are prettified:
/// underscores become spaces, the first letter of every word is upper-cased
/// and the remaining letters lower-cased.
pub fn titleize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}
