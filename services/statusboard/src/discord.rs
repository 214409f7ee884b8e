//! Discord adapter: REST for the display message, gateway cache for presences

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serenity::builder::{
    CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage,
};
use serenity::cache::Cache;
use serenity::client::{Context, EventHandler};
use serenity::http::Http;
use serenity::model::channel::Channel;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use serenity::model::user::OnlineStatus;

use crate::display::{DisplayRef, DisplaySurface};
use crate::probe::{Presence, PresenceSource};
use crate::render::{DisplayDocument, QuickLink};
use crate::scheduler::Scheduler;
use crate::StatusboardError;

/// Link buttons per action row
const BUTTONS_PER_ROW: usize = 5;

/// Intents needed to see members and their presence
pub fn gateway_intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS | GatewayIntents::GUILD_PRESENCES
}

/// Map a serenity failure, keeping 404 and 403 distinguishable
fn map_error(context: &str, e: serenity::Error) -> StatusboardError {
    if let serenity::Error::Http(http_error) = &e {
        match http_error.status_code().map(|s| s.as_u16()) {
            Some(404) => return StatusboardError::NotFound(format!("{}: {}", context, e)),
            Some(403) => return StatusboardError::Forbidden(format!("{}: {}", context, e)),
            _ => {}
        }
    }
    StatusboardError::Discord(format!("{}: {}", context, e))
}

fn channel_id(id: u64) -> crate::Result<ChannelId> {
    if id == 0 {
        return Err(StatusboardError::NotFound("channel id 0".to_string()));
    }
    Ok(ChannelId::new(id))
}

fn message_id(id: u64) -> crate::Result<MessageId> {
    if id == 0 {
        return Err(StatusboardError::NotFound("message id 0".to_string()));
    }
    Ok(MessageId::new(id))
}

pub fn presence_from_status(status: OnlineStatus) -> Presence {
    match status {
        OnlineStatus::Online => Presence::Online,
        OnlineStatus::Idle => Presence::Idle,
        OnlineStatus::DoNotDisturb => Presence::DoNotDisturb,
        OnlineStatus::Invisible => Presence::Invisible,
        _ => Presence::Offline,
    }
}

fn embed(document: &DisplayDocument) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title(&document.title)
        .description(&document.description)
        .colour(document.color.rgb());
    match &document.footer {
        Some(footer) => embed.footer(CreateEmbedFooter::new(footer)),
        None => embed,
    }
}

fn link_rows(links: &[QuickLink]) -> Vec<CreateActionRow> {
    links
        .chunks(BUTTONS_PER_ROW)
        .map(|chunk| {
            CreateActionRow::Buttons(
                chunk
                    .iter()
                    .map(|link| CreateButton::new_link(&link.url).label(&link.label))
                    .collect(),
            )
        })
        .collect()
}

/// Discord connection shared by the display and presence seams.
///
/// The gateway cache is attached on the first ready event; presence
/// lookups fail until then.
pub struct DiscordGateway {
    http: Arc<Http>,
    cache: OnceLock<Arc<Cache>>,
}

impl std::fmt::Debug for DiscordGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordGateway")
            .field("cache_ready", &self.cache.get().is_some())
            .finish()
    }
}

impl DiscordGateway {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
            cache: OnceLock::new(),
        }
    }

    pub fn attach_cache(&self, cache: Arc<Cache>) {
        if self.cache.set(cache).is_ok() {
            tracing::debug!("Gateway cache attached");
        }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

#[async_trait]
impl DisplaySurface for DiscordGateway {
    async fn post_message(
        &self,
        channel: u64,
        document: &DisplayDocument,
    ) -> crate::Result<DisplayRef> {
        let builder = CreateMessage::new()
            .embed(embed(document))
            .components(link_rows(&document.links));
        let message = channel_id(channel)?
            .send_message(self.http(), builder)
            .await
            .map_err(|e| map_error("send message", e))?;
        Ok(DisplayRef {
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
        })
    }

    async fn edit_message(
        &self,
        display: DisplayRef,
        document: &DisplayDocument,
    ) -> crate::Result<()> {
        let builder = EditMessage::new()
            .embed(embed(document))
            .components(link_rows(&document.links));
        channel_id(display.channel_id)?
            .edit_message(self.http(), message_id(display.message_id)?, builder)
            .await
            .map_err(|e| map_error("edit message", e))?;
        Ok(())
    }

    async fn delete_message(&self, display: DisplayRef) -> crate::Result<()> {
        channel_id(display.channel_id)?
            .delete_message(self.http(), message_id(display.message_id)?)
            .await
            .map_err(|e| map_error("delete message", e))
    }

    async fn fetch_message(&self, display: DisplayRef) -> crate::Result<()> {
        channel_id(display.channel_id)?
            .message(self.http(), message_id(display.message_id)?)
            .await
            .map_err(|e| map_error("fetch message", e))?;
        Ok(())
    }

    async fn channel_guild(&self, channel: u64) -> crate::Result<u64> {
        let resolved = channel_id(channel)?
            .to_channel(self.http())
            .await
            .map_err(|e| map_error("fetch channel", e))?;
        match resolved {
            Channel::Guild(guild_channel) => Ok(guild_channel.guild_id.get()),
            _ => Err(StatusboardError::NotFound(format!(
                "channel {} is not in a guild",
                channel
            ))),
        }
    }
}

#[async_trait]
impl PresenceSource for DiscordGateway {
    async fn member_presence(&self, guild_id: u64, user_id: u64) -> crate::Result<Presence> {
        let cache = self
            .cache
            .get()
            .ok_or_else(|| StatusboardError::Discord("gateway cache not ready".to_string()))?;
        if guild_id == 0 || user_id == 0 {
            return Err(StatusboardError::NotFound("id 0".to_string()));
        }
        let guild = GuildId::new(guild_id);
        let user = UserId::new(user_id);

        // The cache guard must not live across an await
        let cached = cache.guild(guild).map(|g| {
            (
                g.members.contains_key(&user),
                g.presences.get(&user).map(|p| p.status),
            )
        });

        match cached {
            None => Err(StatusboardError::Discord(format!(
                "guild {} not in cache",
                guild_id
            ))),
            Some((_, Some(status))) => Ok(presence_from_status(status)),
            Some((true, None)) => Ok(Presence::Offline),
            Some((false, None)) => {
                // Member list can be partial; ask the API before reporting absence
                guild
                    .member(self.http(), user)
                    .await
                    .map_err(|e| map_error("fetch member", e))?;
                Ok(Presence::Offline)
            }
        }
    }
}

/// Starts the scheduler once the gateway is ready
pub struct ReadyHandler {
    gateway: Arc<DiscordGateway>,
    scheduler: Arc<Scheduler>,
    place_channel: Option<u64>,
    placed: AtomicBool,
}

impl ReadyHandler {
    pub fn new(
        gateway: Arc<DiscordGateway>,
        scheduler: Arc<Scheduler>,
        place_channel: Option<u64>,
    ) -> Self {
        Self {
            gateway,
            scheduler,
            place_channel,
            placed: AtomicBool::new(false),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for ReadyHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("Connected to Discord as {}", ready.user.name);
        self.gateway.attach_cache(Arc::clone(&ctx.cache));

        // The timer fires as soon as it starts, so placing skips its own cycle
        if let Some(channel) = self.place_channel {
            if !self.placed.swap(true, Ordering::SeqCst) {
                if let Err(e) = self.scheduler.post_display(channel).await {
                    tracing::error!("Could not place display in channel {}: {}", channel, e);
                }
            }
        }

        self.scheduler.start();
    }
}
