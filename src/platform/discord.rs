use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    Channel, Client, Context, EventHandler, GatewayIntents, Http, Message, ReactionType, Ready,
    Timestamp, UserId,
};
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::config::Config;
use crate::platform::{
    AttachmentInfo, BotIdentity, ChannelKind, Feedback, GuildInfo, IncomingMessage,
};

/// Gateway intents needed to read message content in guilds. Direct
/// messages are not subscribed to.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Reacts to and replies on the Discord message being handled.
struct DiscordFeedback<'a> {
    http: Arc<Http>,
    message: &'a Message,
}

#[async_trait]
impl<'a> Feedback for DiscordFeedback<'a> {
    async fn react(&self, symbol: &str) -> Result<()> {
        self.message
            .react(&self.http, ReactionType::Unicode(symbol.to_string()))
            .await
            .context("Failed to add reaction")?;
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.message
            .reply(&self.http, text)
            .await
            .context("Failed to send reply")?;
        Ok(())
    }
}

/// Serenity event handler feeding messages into the bridge.
pub struct DiscordHandler {
    bridge: Arc<Bridge>,
    config: Config,
    bot_user_id: OnceLock<UserId>,
}

impl DiscordHandler {
    pub fn new(bridge: Arc<Bridge>, config: Config) -> Self {
        Self {
            bridge,
            config,
            bot_user_id: OnceLock::new(),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.bot_user_id.set(ready.user.id);

        info!(
            "Discord bot ready, logged in as {} ({} guilds)",
            ready.user.tag(),
            ready.guilds.len()
        );
        info!("  Input webhook: {}", self.config.webhooks.input_url);
        info!("  Query webhook: {}", self.config.webhooks.query_url);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let incoming = to_incoming(&ctx, &msg);
        let bot = self
            .bot_user_id
            .get()
            .map(|&bot_id| bot_identity(&ctx, &msg, bot_id));
        let feedback = DiscordFeedback {
            http: ctx.http.clone(),
            message: &msg,
        };

        let decision = self
            .bridge
            .handle(incoming, bot.as_ref(), &feedback, |incoming| {
                with_channel_details(&ctx, &msg, incoming)
            })
            .await;
        match decision {
            Some(decision) => debug!(
                "Handled message {} from {} as {}",
                msg.id, msg.author.name, decision.command_type
            ),
            None => debug!("Ignored message {}", msg.id),
        }
    }
}

/// The bot's user id plus, when the message pings roles, the roles the bot
/// holds in that guild. Roles come from the cache only.
fn bot_identity(ctx: &Context, msg: &Message, bot_id: UserId) -> BotIdentity {
    let mut bot = BotIdentity::new(bot_id.to_string());
    if msg.mention_roles.is_empty() {
        return bot;
    }

    if let Some(guild_id) = msg.guild_id {
        let roles: Option<Vec<String>> = ctx.cache.guild(guild_id).and_then(|guild| {
            guild
                .members
                .get(&bot_id)
                .map(|member| member.roles.iter().map(|r| r.to_string()).collect())
        });
        match roles {
            Some(roles) => bot.role_ids = roles,
            None => debug!("Bot member not cached for guild {}", guild_id),
        }
    }
    bot
}

fn permalink(guild_id: Option<&str>, channel_id: &str, message_id: &str) -> String {
    format!(
        "https://discord.com/channels/{}/{}/{}",
        guild_id.unwrap_or("@me"),
        channel_id,
        message_id
    )
}

fn display_name(global_name: Option<&str>, username: &str) -> String {
    global_name
        .filter(|name| !name.is_empty())
        .unwrap_or(username)
        .to_string()
}

fn to_utc(timestamp: &Timestamp) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&timestamp.to_string())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Resolve channel name and kind for a message that will be forwarded.
///
/// Guild channels are served from the cache when present, otherwise
/// fetched. A failed lookup keeps the provisional kind and leaves the name
/// empty rather than dropping the message.
async fn with_channel_details(
    ctx: &Context,
    msg: &Message,
    mut incoming: IncomingMessage,
) -> IncomingMessage {
    let (channel_name, channel_kind) = match msg.channel(ctx).await {
        Ok(Channel::Guild(channel)) => (
            Some(channel.name.clone()),
            ChannelKind::from_code(u8::from(channel.kind)),
        ),
        Ok(Channel::Private(channel)) => (None, ChannelKind::from_code(u8::from(channel.kind))),
        Ok(_) => (None, ChannelKind::Unknown),
        Err(e) => {
            warn!("Failed to look up channel {}: {}", msg.channel_id, e);
            (None, incoming.channel_kind)
        }
    };

    incoming.channel_name = channel_name;
    incoming.channel_kind = channel_kind;
    incoming
}

/// Snapshot a serenity message into the platform-neutral model without any
/// network calls. Channel name and kind are filled in later by
/// [`with_channel_details`], only for messages that get routed.
fn to_incoming(ctx: &Context, msg: &Message) -> IncomingMessage {
    let channel_kind = if msg.guild_id.is_none() {
        ChannelKind::Dm
    } else {
        ChannelKind::Unknown
    };

    let guild = msg.guild_id.map(|guild_id| GuildInfo {
        id: guild_id.to_string(),
        name: ctx.cache.guild(guild_id).map(|g| g.name.clone()),
    });

    let guild_id = msg.guild_id.map(|g| g.to_string());
    let permalink = permalink(
        guild_id.as_deref(),
        &msg.channel_id.to_string(),
        &msg.id.to_string(),
    );

    IncomingMessage {
        text: msg.content.clone(),
        author_id: msg.author.id.to_string(),
        author_username: msg.author.name.clone(),
        author_display_name: display_name(msg.author.global_name.as_deref(), &msg.author.name),
        author_is_bot: msg.author.bot,
        channel_id: msg.channel_id.to_string(),
        channel_name: None,
        channel_kind,
        message_id: msg.id.to_string(),
        permalink,
        created_at: to_utc(&msg.timestamp).unwrap_or_else(Utc::now),
        edited_at: msg.edited_timestamp.as_ref().and_then(to_utc),
        guild,
        mention_ids: msg.mentions.iter().map(|u| u.id.to_string()).collect(),
        mention_role_ids: msg.mention_roles.iter().map(|r| r.to_string()).collect(),
        mentions_everyone: msg.mention_everyone,
        attachments: msg
            .attachments
            .iter()
            .map(|att| AttachmentInfo {
                id: att.id.to_string(),
                name: att.filename.clone(),
                url: att.url.clone(),
                size: u64::from(att.size),
                content_type: att.content_type.clone(),
            })
            .collect(),
    }
}

/// Connect to Discord and route messages until SIGINT/SIGTERM.
pub async fn run(config: Config, bridge: Arc<Bridge>) -> Result<()> {
    info!("Starting Discord client...");

    let handler = DiscordHandler::new(bridge, config.clone());
    let mut client = Client::builder(&config.discord.bot_token, intents())
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down Discord bot...");
        shard_manager.shutdown_all().await;
    });

    if let Err(e) = client.start().await {
        error!("Discord client error: {}", e);
        return Err(e).context("Discord client stopped with an error");
    }

    info!("Discord client stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
