//! BDD step definitions for website and component probes

use std::sync::Arc;

use cucumber::{given, then, when};

use statusboard::config::WebsiteTarget;
use statusboard::probe::{ProbeSet, DISCORD_STATUS_CATALOG_URL};
use statusboard::status::ProbeResult;

use crate::world::{OnlinePresence, Reply, StatusboardWorld};

fn probes(world: &StatusboardWorld) -> ProbeSet {
    ProbeSet::new(world.http.clone(), Arc::new(OnlinePresence))
}

fn catalog_body(world: &StatusboardWorld) -> String {
    let components: Vec<serde_json::Value> = world
        .catalog
        .iter()
        .map(|(id, name, status)| serde_json::json!({ "id": id, "name": name, "status": status }))
        .collect();
    serde_json::json!({ "components": components }).to_string()
}

fn entry<'a>(world: &'a StatusboardWorld, label: &str) -> &'a ProbeResult {
    world
        .probe_results
        .iter()
        .chain(world.snapshot.iter().flat_map(|s| {
            s.bots
                .iter()
                .chain(&s.websites)
                .chain(&s.discord_services)
                .chain(&s.custom_services)
        }))
        .find(|r| r.label == label)
        .unwrap_or_else(|| panic!("no entry labelled '{}'", label))
}

#[given(expr = "a website {string} at {string} answering {int}")]
fn website_answering(world: &mut StatusboardWorld, label: String, url: String, status: u16) {
    world.config.add_website(&url, &label);
    world.script(&url, Reply::Status(status));
}

#[given(expr = "a website {string} at {string} that is unreachable")]
fn website_unreachable(world: &mut StatusboardWorld, label: String, url: String) {
    world.config.add_website(&url, &label);
    world.script(&url, Reply::Unreachable);
}

#[given(expr = "the component catalog lists {string} named {string} as {string}")]
fn catalog_lists(world: &mut StatusboardWorld, id: String, name: String, status: String) {
    world.catalog.push((id, name, status));
    let body = catalog_body(world);
    world.script(DISCORD_STATUS_CATALOG_URL, Reply::Body(200, body));
}

#[given(expr = "the component catalog answers {int}")]
fn catalog_answers(world: &mut StatusboardWorld, status: u16) {
    world.script(DISCORD_STATUS_CATALOG_URL, Reply::Status(status));
}

#[given("the component catalog is unreachable")]
fn catalog_unreachable(world: &mut StatusboardWorld) {
    world.script(DISCORD_STATUS_CATALOG_URL, Reply::Unreachable);
}

#[given(expr = "component {string} is watched")]
fn component_watched(world: &mut StatusboardWorld, id: String) {
    world.config.watch_component(&id);
}

#[when(expr = "the website {string} is probed")]
async fn probe_website(world: &mut StatusboardWorld, label: String) {
    let target: WebsiteTarget = world
        .config
        .websites
        .iter()
        .find(|w| w.label == label)
        .cloned()
        .expect("website not configured");
    world.probe_result = Some(probes(world).probe_website(&target).await);
}

#[when("the watched components are probed")]
async fn probe_components(world: &mut StatusboardWorld) {
    let ids = world.config.monitored_discord_services.clone();
    world.probe_results = probes(world).probe_discord_components(&ids).await;
}

#[then(expr = "the status should be {string}")]
fn status_should_be(world: &mut StatusboardWorld, expected: String) {
    let result = world.probe_result.as_ref().expect("no probe result");
    assert_eq!(result.status, expected);
}

#[then("the target should be online")]
fn target_online(world: &mut StatusboardWorld) {
    assert!(world.probe_result.as_ref().expect("no probe result").online);
}

#[then("the target should be offline")]
fn target_offline(world: &mut StatusboardWorld) {
    assert!(!world.probe_result.as_ref().expect("no probe result").online);
}

#[then(expr = "the raw status should be {string}")]
fn raw_status_should_be(world: &mut StatusboardWorld, expected: String) {
    let result = world.probe_result.as_ref().expect("no probe result");
    assert_eq!(result.raw_status.as_deref(), Some(expected.as_str()));
}

#[then(expr = "{string} should read {string} with glyph {string}")]
fn entry_reads_with_glyph(world: &mut StatusboardWorld, label: String, status: String, glyph: String) {
    let result = entry(world, &label);
    assert_eq!(result.status, status);
    assert_eq!(result.glyph(), glyph);
}

#[then(expr = "{string} should read {string}")]
fn entry_reads(world: &mut StatusboardWorld, label: String, status: String) {
    assert_eq!(entry(world, &label).status, status);
}

#[then(expr = "there should be {int} component result(s)")]
fn component_result_count(world: &mut StatusboardWorld, count: usize) {
    assert_eq!(world.probe_results.len(), count);
}

#[then(expr = "the catalog should have been requested {int} time(s)")]
fn catalog_requested(world: &mut StatusboardWorld, count: usize) {
    assert_eq!(world.http.request_count(DISCORD_STATUS_CATALOG_URL), count);
}
