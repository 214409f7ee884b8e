//! Turns a snapshot into the status document shown on the display surface

use crate::config::Config;
use crate::snapshot::Snapshot;
use crate::status::{ProbeResult, StatusLabel, TargetRef, LOADING_GLYPH};

/// Link buttons a display message can carry
pub const MAX_QUICK_LINKS: usize = 25;

/// Shown instead of sections when nothing is monitored
pub const NOTHING_MONITORED: &str = "No services are currently being monitored.";

/// Accent color of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentColor {
    Operational,
    Partial,
    Outage,
    Maintenance,
}

impl DocumentColor {
    pub fn rgb(self) -> u32 {
        match self {
            DocumentColor::Operational => 0x2ECC71,
            DocumentColor::Partial => 0xF1C40F,
            DocumentColor::Outage => 0xE74C3C,
            DocumentColor::Maintenance => 0x3498DB,
        }
    }
}

/// A titled block of status lines, one line per entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub lines: Vec<String>,
}

impl Section {
    pub fn markdown(&self) -> String {
        format!("### **__{}__**\n{}", self.title, self.lines.join("\n\n"))
    }
}

/// Quick-link button attached to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickLink {
    pub label: String,
    pub url: String,
}

/// Structured status document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDocument {
    pub title: String,
    pub sections: Vec<Section>,
    pub description: String,
    pub color: DocumentColor,
    pub footer: Option<String>,
    pub links: Vec<QuickLink>,
}

impl DisplayDocument {
    /// Shown while a cycle is running
    pub fn loading() -> Self {
        Self {
            title: format!("{} Checking Status...", LOADING_GLYPH),
            sections: Vec::new(),
            description: String::new(),
            color: DocumentColor::Maintenance,
            footer: None,
            links: Vec::new(),
        }
    }

    /// Posted when a new display message is placed, before the first render
    pub fn initializing() -> Self {
        Self {
            title: "Service Status".to_string(),
            sections: Vec::new(),
            description: format!("{} Initializing...", LOADING_GLYPH),
            color: DocumentColor::Maintenance,
            footer: None,
            links: Vec::new(),
        }
    }
}

fn bot_line(result: &ProbeResult) -> String {
    format!(
        "{} **{}**\n> Status: **{}**",
        result.glyph(),
        result.label,
        result.status
    )
}

fn website_line(result: &ProbeResult) -> String {
    let url = match &result.target {
        TargetRef::Website { url } => url.as_str(),
        _ => "",
    };
    format!(
        "{} [{}]({})\n> Status: **{}**",
        result.glyph(),
        result.label,
        url,
        result.status
    )
}

fn discord_block(results: &[ProbeResult]) -> String {
    let mut lines = vec!["**[Discord]**".to_string()];
    lines.extend(
        results
            .iter()
            .map(|r| format!("> {} **{}**: {}", r.glyph(), r.label, r.status)),
    );
    lines.join("\n")
}

fn custom_line(result: &ProbeResult) -> String {
    format!(
        "**[{}]**\n> {} Status: **{}**",
        result.label,
        result.glyph(),
        result.status
    )
}

fn effective_label(result: &ProbeResult) -> Option<StatusLabel> {
    match result.target {
        TargetRef::Custom => StatusLabel::from_text(&result.status),
        _ => Some(result.state),
    }
}

/// Worst state across the snapshot decides the accent color
fn overall_color(snapshot: &Snapshot) -> DocumentColor {
    let labels: Vec<StatusLabel> = snapshot
        .bots
        .iter()
        .chain(&snapshot.websites)
        .chain(&snapshot.discord_services)
        .chain(&snapshot.custom_services)
        .filter_map(effective_label)
        .collect();

    if labels
        .iter()
        .any(|l| matches!(l, StatusLabel::Offline | StatusLabel::Error))
    {
        DocumentColor::Outage
    } else if labels.contains(&StatusLabel::PartialOutage) {
        DocumentColor::Partial
    } else if labels.contains(&StatusLabel::Maintenance) {
        DocumentColor::Maintenance
    } else {
        DocumentColor::Operational
    }
}

/// Quick links for the configured websites, truncated to what the surface accepts
pub fn quick_links(config: &Config) -> Vec<QuickLink> {
    config
        .websites
        .iter()
        .take(MAX_QUICK_LINKS)
        .map(|w| QuickLink {
            label: if w.label.is_empty() {
                w.url.clone()
            } else {
                w.label.clone()
            },
            url: w.url.clone(),
        })
        .collect()
}

/// Render a snapshot. The output depends only on the arguments.
pub fn render(snapshot: &Snapshot, config: &Config) -> DisplayDocument {
    let mut sections = Vec::new();

    if !snapshot.bots.is_empty() {
        sections.push(Section {
            title: "Bots".to_string(),
            lines: snapshot.bots.iter().map(bot_line).collect(),
        });
    }

    if !snapshot.websites.is_empty() {
        sections.push(Section {
            title: "Websites".to_string(),
            lines: snapshot.websites.iter().map(website_line).collect(),
        });
    }

    if !snapshot.discord_services.is_empty() || !snapshot.custom_services.is_empty() {
        let mut lines = Vec::new();
        if !snapshot.discord_services.is_empty() {
            lines.push(discord_block(&snapshot.discord_services));
        }
        lines.extend(snapshot.custom_services.iter().map(custom_line));
        sections.push(Section {
            title: "Other Services".to_string(),
            lines,
        });
    }

    let description = if sections.is_empty() {
        NOTHING_MONITORED.to_string()
    } else {
        sections
            .iter()
            .map(Section::markdown)
            .collect::<Vec<_>>()
            .join("\n")
    };

    DisplayDocument {
        title: config.embed_title.clone(),
        color: overall_color(snapshot),
        sections,
        description,
        footer: Some(format!(
            "Last Updated: {}",
            snapshot.last_updated_utc.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        links: quick_links(config),
    }
}
