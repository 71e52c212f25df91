use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::platform::{AttachmentInfo, ChannelKind, GuildInfo, IncomingMessage};

/// JSON body posted to a webhook: a snapshot of the message plus its
/// command type and the time it was dispatched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    pub content: String,
    pub content_lower: String,
    pub command_type: String,
    pub author: AuthorPayload,
    pub channel: ChannelPayload,
    pub message: MessagePayload,
    pub guild: Option<GuildInfo>,
    pub attachments: Vec<AttachmentInfo>,
    /// Dispatch time, RFC 3339 UTC with milliseconds
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub bot: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelPayload {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: String,
    pub url: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    pub edited_timestamp: Option<i64>,
}

impl OutboundPayload {
    pub fn build(
        message: &IncomingMessage,
        command_type: &str,
        dispatched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content: message.trimmed_text().to_string(),
            content_lower: message.normalized_text(),
            command_type: command_type.to_string(),
            author: AuthorPayload {
                id: message.author_id.clone(),
                username: message.author_username.clone(),
                display_name: message.author_display_name.clone(),
                bot: message.author_is_bot,
            },
            channel: ChannelPayload {
                id: message.channel_id.clone(),
                name: message.channel_name.clone(),
                kind: message.channel_kind,
            },
            message: MessagePayload {
                id: message.message_id.clone(),
                url: message.permalink.clone(),
                timestamp: message.created_at.timestamp_millis(),
                edited_timestamp: message.edited_at.map(|t| t.timestamp_millis()),
            },
            guild: message.guild.clone(),
            attachments: message.attachments.clone(),
            timestamp: dispatched_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
