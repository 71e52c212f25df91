pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A chat message received from the platform, reduced to the fields the
/// bridge routes and forwards.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Raw message text as sent by the user
    pub text: String,
    pub author_id: String,
    pub author_username: String,
    pub author_display_name: String,
    /// Set for bots and webhooks; such messages are never routed
    pub author_is_bot: bool,
    pub channel_id: String,
    /// `None` for direct messages
    pub channel_name: Option<String>,
    pub channel_kind: ChannelKind,
    pub message_id: String,
    pub permalink: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub guild: Option<GuildInfo>,
    /// User ids mentioned in the message, in message order
    pub mention_ids: Vec<String>,
    /// Role ids mentioned in the message
    pub mention_role_ids: Vec<String>,
    /// `@everyone` or `@here` was used
    pub mentions_everyone: bool,
    pub attachments: Vec<AttachmentInfo>,
}

impl IncomingMessage {
    /// Text with surrounding whitespace and byte-order marks removed.
    pub fn trimmed_text(&self) -> &str {
        self.text
            .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
    }

    /// Lowercased, trimmed view of the text used for command matching.
    pub fn normalized_text(&self) -> String {
        self.trimmed_text().to_lowercase()
    }

    pub fn mentions(&self, user_id: &str) -> bool {
        self.mention_ids.iter().any(|id| id == user_id)
    }

    /// Whether the bot was pinged: directly, through `@everyone`/`@here`,
    /// or through a role the bot holds.
    pub fn mentions_bot(&self, bot: &BotIdentity) -> bool {
        self.mentions_everyone
            || self.mentions(&bot.user_id)
            || self
                .mention_role_ids
                .iter()
                .any(|role| bot.role_ids.contains(role))
    }
}

/// The bot's own account, as seen from the guild a message came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotIdentity {
    pub user_id: String,
    /// Roles the bot holds in the message's guild; empty in DMs
    pub role_ids: Vec<String>,
}

impl BotIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
impl IncomingMessage {
    /// A plain guild text message from a human author, for tests.
    pub fn sample(text: &str) -> Self {
        Self {
            text: text.to_string(),
            author_id: "1001".to_string(),
            author_username: "ada".to_string(),
            author_display_name: "Ada".to_string(),
            author_is_bot: false,
            channel_id: "2002".to_string(),
            channel_name: Some("brain".to_string()),
            channel_kind: ChannelKind::GuildText,
            message_id: "3003".to_string(),
            permalink: "https://discord.com/channels/4004/2002/3003".to_string(),
            created_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap_or_default(),
            edited_at: None,
            guild: Some(GuildInfo {
                id: "4004".to_string(),
                name: Some("Home".to_string()),
            }),
            mention_ids: Vec::new(),
            mention_role_ids: Vec::new(),
            mentions_everyone: false,
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuildInfo {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
    pub content_type: Option<String>,
}

impl AttachmentInfo {
    pub fn is_audio(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("audio/"))
    }
}

/// Channel kinds, carrying Discord's numeric channel type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildAnnouncement,
    AnnouncementThread,
    PublicThread,
    PrivateThread,
    GuildStageVoice,
    GuildDirectory,
    GuildForum,
    Unknown,
}

impl ChannelKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ChannelKind::GuildText,
            1 => ChannelKind::Dm,
            2 => ChannelKind::GuildVoice,
            3 => ChannelKind::GroupDm,
            4 => ChannelKind::GuildCategory,
            5 => ChannelKind::GuildAnnouncement,
            10 => ChannelKind::AnnouncementThread,
            11 => ChannelKind::PublicThread,
            12 => ChannelKind::PrivateThread,
            13 => ChannelKind::GuildStageVoice,
            14 => ChannelKind::GuildDirectory,
            15 => ChannelKind::GuildForum,
            _ => ChannelKind::Unknown,
        }
    }

    pub fn code(self) -> Option<u8> {
        match self {
            ChannelKind::GuildText => Some(0),
            ChannelKind::Dm => Some(1),
            ChannelKind::GuildVoice => Some(2),
            ChannelKind::GroupDm => Some(3),
            ChannelKind::GuildCategory => Some(4),
            ChannelKind::GuildAnnouncement => Some(5),
            ChannelKind::AnnouncementThread => Some(10),
            ChannelKind::PublicThread => Some(11),
            ChannelKind::PrivateThread => Some(12),
            ChannelKind::GuildStageVoice => Some(13),
            ChannelKind::GuildDirectory => Some(14),
            ChannelKind::GuildForum => Some(15),
            ChannelKind::Unknown => None,
        }
    }
}

impl Serialize for ChannelKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.code() {
            Some(code) => serializer.serialize_u8(code),
            None => serializer.serialize_none(),
        }
    }
}

/// Acknowledgments sent back to the originating message.
///
/// Both operations are best-effort: callers log failures and carry on.
#[async_trait]
pub trait Feedback: Send + Sync {
    /// Attach a short emoji reaction to the message
    async fn react(&self, symbol: &str) -> Result<()>;

    /// Reply to the message with text
    async fn reply(&self, text: &str) -> Result<()>;
}
