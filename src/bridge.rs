use std::future::Future;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::payload::OutboundPayload;
use crate::platform::{BotIdentity, Feedback, IncomingMessage};
use crate::routing::{self, RoutingDecision};
use crate::webhook::Delivery;

pub const SUCCESS_REACTION: &str = "✅";
pub const FAILURE_REACTION: &str = "❌";

/// Apology sent when a critical command could not be delivered at all.
pub const DELIVERY_ERROR_REPLY: &str =
    "⚠️ Sorry, there was an error processing your command. Please try again.";

/// Command types whose transport failures are reported to the user in text.
const CRITICAL_COMMANDS: &[&str] = &["save", "complete"];

const LOG_PREVIEW_CHARS: usize = 50;

/// Reaction shown as soon as a command is accepted. Commands without an
/// entry get no early reaction.
fn received_reaction(command_type: &str) -> Option<&'static str> {
    match command_type {
        "save" => Some("💾"),
        "ask" => Some("🤔"),
        "complete" => Some("🔍"),
        "update" => Some("✏️"),
        "delete" => Some("🗑️"),
        "search" => Some("🔍"),
        "number" => Some("🔢"),
        "voice" => Some("🎤"),
        "help" => Some("❓"),
        "status" => Some("📊"),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

/// Routes chat messages to the workflow webhooks.
///
/// Holds no per-message state; concurrent messages share only the
/// delivery client.
pub struct Bridge {
    delivery: Box<dyn Delivery>,
}

impl Bridge {
    pub fn new(delivery: Box<dyn Delivery>) -> Self {
        Self { delivery }
    }

    /// Classify a message and, when it is a recognized command, forward it.
    /// Returns the routing decision, or `None` when the message was ignored.
    ///
    /// `enrich` fills in details that cost a platform lookup (channel name
    /// and kind); it only runs once the message is known to be a command.
    pub async fn handle<F, Fut>(
        &self,
        message: IncomingMessage,
        bot: Option<&BotIdentity>,
        feedback: &dyn Feedback,
        enrich: F,
    ) -> Option<RoutingDecision>
    where
        F: FnOnce(IncomingMessage) -> Fut,
        Fut: Future<Output = IncomingMessage>,
    {
        let decision = routing::classify(&message, bot)?;
        let message = enrich(message).await;
        self.dispatch(&message, decision, feedback).await;
        Some(decision)
    }

    /// Deliver one classified message and report the outcome through
    /// reactions. Never fails: every error ends up in the log.
    pub async fn dispatch(
        &self,
        message: &IncomingMessage,
        decision: RoutingDecision,
        feedback: &dyn Feedback,
    ) {
        let command_type = decision.command_type;

        if let Some(symbol) = received_reaction(command_type) {
            react(feedback, symbol).await;
        }

        let payload = OutboundPayload::build(message, command_type, Utc::now());

        info!("Routing {} to {} workflow", command_type, decision.destination);

        match self.delivery.deliver(decision.destination, &payload).await {
            Ok(status) if status.is_success() => {
                react(feedback, SUCCESS_REACTION).await;
                info!(
                    "{} -> {}: {}...",
                    command_type.to_uppercase(),
                    decision.destination,
                    preview(&payload.content)
                );
            }
            Ok(status) => {
                react(feedback, FAILURE_REACTION).await;
                error!("{} webhook error: {}", decision.destination, status);
            }
            Err(e) => {
                error!(
                    "Error sending {} to {} webhook: {:#}",
                    command_type, decision.destination, e
                );
                react(feedback, FAILURE_REACTION).await;

                if CRITICAL_COMMANDS.contains(&command_type) {
                    if let Err(e) = feedback.reply(DELIVERY_ERROR_REPLY).await {
                        error!("Failed to send error reply: {:#}", e);
                    }
                }
            }
        }
    }
}

async fn react(feedback: &dyn Feedback, symbol: &str) {
    match feedback.react(symbol).await {
        Ok(()) => debug!("Reacted with {}", symbol),
        Err(e) => warn!("Failed to add reaction {}: {:#}", symbol, e),
    }
}
