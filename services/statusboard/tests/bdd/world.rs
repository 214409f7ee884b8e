//! BDD test world for statusboard service

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cucumber::World;
use statusboard::config::{save_config, Config, CONFIG_FILE_NAME};
use statusboard::display::{DisplayRef, DisplaySurface};
use statusboard::io::{HttpClient, HttpResponse};
use statusboard::probe::{Presence, PresenceSource};
use statusboard::publisher::PublishRecord;
use statusboard::render::DisplayDocument;
use statusboard::snapshot::Snapshot;
use statusboard::status::ProbeResult;
use statusboard::{Statusboard, StatusboardError};
use tokio_util::sync::CancellationToken;

/// How a scripted endpoint answers
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Body(u16, String),
    Unreachable,
}

/// HTTP client answering from a script and recording every call
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    pub replies: Mutex<HashMap<String, Reply>>,
    pub requests: Mutex<Vec<String>>,
    pub posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedHttpClient {
    fn reply(&self, url: &str) -> Reply {
        self.requests.lock().unwrap().push(url.to_string());
        self.replies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Reply::Unreachable)
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn get(&self, url: &str, _timeout: Duration) -> statusboard::Result<HttpResponse> {
        match self.reply(url) {
            Reply::Status(status) => Ok(HttpResponse {
                status,
                body: String::new(),
            }),
            Reply::Body(status, body) => Ok(HttpResponse { status, body }),
            Reply::Unreachable => Err(StatusboardError::Http("connection refused".to_string())),
        }
    }

    async fn get_status(&self, url: &str, timeout: Duration) -> statusboard::Result<u16> {
        self.get(url, timeout).await.map(|r| r.status)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        _timeout: Duration,
    ) -> statusboard::Result<HttpResponse> {
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        Ok(HttpResponse {
            status: 200,
            body: "Success".to_string(),
        })
    }
}

/// Every member is online
#[derive(Debug)]
pub struct OnlinePresence;

#[async_trait::async_trait]
impl PresenceSource for OnlinePresence {
    async fn member_presence(&self, _guild_id: u64, _user_id: u64) -> statusboard::Result<Presence> {
        Ok(Presence::Online)
    }
}

/// Display surface that records edits; the message can be made to vanish
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub message_gone: Mutex<bool>,
    pub edits: Mutex<Vec<DisplayDocument>>,
    pub posts: Mutex<Vec<u64>>,
}

impl RecordingDisplay {
    fn check(&self) -> statusboard::Result<()> {
        if *self.message_gone.lock().unwrap() {
            return Err(StatusboardError::NotFound("Unknown Message".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DisplaySurface for RecordingDisplay {
    async fn post_message(
        &self,
        channel_id: u64,
        _document: &DisplayDocument,
    ) -> statusboard::Result<DisplayRef> {
        let mut posts = self.posts.lock().unwrap();
        posts.push(channel_id);
        Ok(DisplayRef {
            channel_id,
            message_id: 1000 + posts.len() as u64,
        })
    }

    async fn edit_message(
        &self,
        _display: DisplayRef,
        document: &DisplayDocument,
    ) -> statusboard::Result<()> {
        self.check()?;
        self.edits.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn delete_message(&self, _display: DisplayRef) -> statusboard::Result<()> {
        self.check()
    }

    async fn fetch_message(&self, _display: DisplayRef) -> statusboard::Result<()> {
        self.check()
    }

    async fn channel_guild(&self, _channel_id: u64) -> statusboard::Result<u64> {
        Ok(1)
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct StatusboardWorld {
    pub dir: tempfile::TempDir,
    pub config: Config,
    pub http: Arc<ScriptedHttpClient>,
    pub display: Arc<RecordingDisplay>,
    pub board: Option<Statusboard>,
    /// Catalog entries as (id, name, status)
    pub catalog: Vec<(String, String, String)>,

    pub probe_result: Option<ProbeResult>,
    pub probe_results: Vec<ProbeResult>,
    pub snapshot: Option<Snapshot>,
    pub document: Option<DisplayDocument>,
    pub publish_record: Option<PublishRecord>,
}

impl StatusboardWorld {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            config: Config::default(),
            http: Arc::new(ScriptedHttpClient::default()),
            display: Arc::new(RecordingDisplay::default()),
            board: None,
            catalog: Vec::new(),
            probe_result: None,
            probe_results: Vec::new(),
            snapshot: None,
            document: None,
            publish_record: None,
        }
    }

    pub fn script(&self, url: &str, reply: Reply) {
        self.http
            .replies
            .lock()
            .unwrap()
            .insert(url.to_string(), reply);
    }

    /// Persist the scenario's config and build the service around it
    pub fn board(&mut self) -> &Statusboard {
        if self.board.is_none() {
            save_config(&self.dir.path().join(CONFIG_FILE_NAME), &self.config)
                .expect("save config");
            self.board = Some(Statusboard::new(
                self.dir.path(),
                Arc::clone(&self.http) as Arc<dyn HttpClient>,
                Arc::new(OnlinePresence),
                Arc::clone(&self.display) as Arc<dyn DisplaySurface>,
                CancellationToken::new(),
            ));
        }
        self.board.as_ref().expect("board just built")
    }
}
