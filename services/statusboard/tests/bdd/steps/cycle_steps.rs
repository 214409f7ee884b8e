//! BDD step definitions for refresh cycles, rendering and publishing

use cucumber::{given, then, when};

use statusboard::display::DisplayRef;
use statusboard::render::render;
use statusboard::scheduler::TriggerOutcome;
use statusboard::snapshot::SnapshotStore;
use statusboard::snapshot::SNAPSHOT_FILE_NAME;

use crate::world::StatusboardWorld;

#[given(expr = "a custom service {string} with status {string}")]
fn custom_service(world: &mut StatusboardWorld, name: String, status: String) {
    world.config.set_service(&name, &status);
}

#[given(expr = "a sink at {string} with token {string}")]
fn sink_with_token(world: &mut StatusboardWorld, url: String, token: String) {
    world.config.set_sink(Some(url), Some(token));
}

#[given(expr = "the display message {int} in channel {int}")]
fn display_message(world: &mut StatusboardWorld, message_id: u64, channel_id: u64) {
    world.config.guild_id = Some(1);
    world.config.set_display(DisplayRef {
        channel_id,
        message_id,
    });
}

#[given("the display message has been deleted")]
fn display_deleted(world: &mut StatusboardWorld) {
    *world.display.message_gone.lock().unwrap() = true;
}

#[when("a refresh runs")]
async fn refresh_runs(world: &mut StatusboardWorld) {
    let outcome = world.board().scheduler.trigger_update().await;
    let TriggerOutcome::Completed(snapshot) = outcome else {
        panic!("refresh did not run");
    };

    let config = world.board().config.current().await;
    let last_publish = world.board().state.read().await.last_publish.clone();

    world.document = Some(render(&snapshot, &config));
    world.snapshot = Some(snapshot);
    world.publish_record = last_publish;
}

#[when(expr = "the display is placed in channel {int}")]
async fn display_placed(world: &mut StatusboardWorld, channel_id: u64) {
    world
        .board()
        .scheduler
        .place_display(channel_id)
        .await
        .expect("place display");
}

#[then(expr = "the {string} section should have {int} line(s)")]
fn section_lines(world: &mut StatusboardWorld, title: String, count: usize) {
    let document = world.document.as_ref().expect("no document");
    let section = document
        .sections
        .iter()
        .find(|s| s.title == title)
        .unwrap_or_else(|| panic!("no section '{}'", title));
    assert_eq!(section.lines.len(), count);
}

#[then(expr = "line {int} of {string} should start with {string}")]
fn line_starts_with(world: &mut StatusboardWorld, index: usize, title: String, prefix: String) {
    let document = world.document.as_ref().expect("no document");
    let section = document
        .sections
        .iter()
        .find(|s| s.title == title)
        .unwrap_or_else(|| panic!("no section '{}'", title));
    let line = &section.lines[index - 1];
    assert!(
        line.starts_with(&prefix),
        "line '{}' does not start with '{}'",
        line,
        prefix
    );
}

#[then(expr = "the sections should be {string}")]
fn sections_in_order(world: &mut StatusboardWorld, expected: String) {
    let document = world.document.as_ref().expect("no document");
    let titles: Vec<&str> = document.sections.iter().map(|s| s.title.as_str()).collect();
    let expected: Vec<&str> = expected.split(", ").collect();
    assert_eq!(titles, expected);
}

#[then(expr = "the document should have {int} quick link(s)")]
fn quick_links(world: &mut StatusboardWorld, count: usize) {
    assert_eq!(world.document.as_ref().expect("no document").links.len(), count);
}

#[then(expr = "the document should say {string}")]
fn document_says(world: &mut StatusboardWorld, text: String) {
    let document = world.document.as_ref().expect("no document");
    assert!(document.description.contains(&text));
}

#[then("each website should have been requested exactly once")]
fn each_website_once(world: &mut StatusboardWorld) {
    for site in &world.config.websites {
        assert_eq!(world.http.request_count(&site.url), 1, "{}", site.url);
    }
}

#[then("no request should have been sent to the sink")]
fn no_sink_request(world: &mut StatusboardWorld) {
    assert!(world.http.posts.lock().unwrap().is_empty());
    assert!(world.publish_record.is_none());
}

#[then(expr = "the sink should have received the snapshot at {string}")]
fn sink_received(world: &mut StatusboardWorld, url: String) {
    let posts = world.http.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, url);
    assert!(posts[0].1["last_updated_utc"].is_string());
    assert!(world.publish_record.as_ref().expect("no publish record").success);
}

#[then("the snapshot should be persisted")]
fn snapshot_persisted(world: &mut StatusboardWorld) {
    let store = SnapshotStore::new(world.dir.path().join(SNAPSHOT_FILE_NAME));
    assert_eq!(store.load().as_ref(), world.snapshot.as_ref());
}

#[then("the display refs should be cleared")]
async fn display_refs_cleared(world: &mut StatusboardWorld) {
    let config = world.board().config.current().await;
    assert_eq!(config.channel_id, None);
    assert_eq!(config.message_id, None);
}

#[then(expr = "the display should point at message {int} in channel {int}")]
async fn display_points_at(world: &mut StatusboardWorld, message_id: u64, channel_id: u64) {
    let config = world.board().config.current().await;
    assert_eq!(
        config.display_ref(),
        Some(DisplayRef {
            channel_id,
            message_id,
        })
    );
}

#[then(expr = "the display should finally show {string}")]
fn display_shows(world: &mut StatusboardWorld, title: String) {
    let edits = world.display.edits.lock().unwrap();
    let last = edits.last().expect("display never edited");
    assert_eq!(last.title, title);
}
