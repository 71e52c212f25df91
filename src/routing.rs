use std::fmt;

use crate::platform::{BotIdentity, IncomingMessage};

/// Downstream workflow that receives a routed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Content-saving workflows
    Input,
    /// Information-retrieval workflows
    Query,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Input => write!(f, "INPUT"),
            Destination::Query => write!(f, "QUERY"),
        }
    }
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    pub command_type: &'static str,
    pub destination: Destination,
}

impl RoutingDecision {
    const fn new(command_type: &'static str, destination: Destination) -> Self {
        Self {
            command_type,
            destination,
        }
    }
}

/// Prefix commands, tested in order after the special triggers.
/// Input commands come first; the first matching prefix wins.
const PREFIX_ROUTES: &[(&str, Destination)] = &[
    ("!save", Destination::Input),
    ("save:", Destination::Input),
    ("!complete", Destination::Input),
    ("!update", Destination::Input),
    ("!delete", Destination::Input),
    ("!clear", Destination::Input),
    ("!backup", Destination::Input),
    ("!ask", Destination::Query),
    ("!search", Destination::Query),
    ("!find", Destination::Query),
    ("!help", Destination::Query),
    ("!status", Destination::Query),
    ("!stats", Destination::Query),
    ("!export", Destination::Query),
    ("!settings", Destination::Query),
    ("!config", Destination::Query),
];

/// Strip one leading `!` and one trailing `:` from a prefix.
fn command_type_for(prefix: &'static str) -> &'static str {
    let tag = prefix.strip_prefix('!').unwrap_or(prefix);
    tag.strip_suffix(':').unwrap_or(tag)
}

fn is_single_digit_selection(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some('1'..='9'), None))
}

/// Decide whether and where a message should be forwarded.
///
/// Rules are checked in a fixed order and the first match wins:
/// digit selection, bot mention, audio attachment, input prefixes,
/// query prefixes. `bot` is the bot's own identity; while it is unknown
/// the mention rule cannot match.
pub fn classify(message: &IncomingMessage, bot: Option<&BotIdentity>) -> Option<RoutingDecision> {
    if message.author_is_bot {
        return None;
    }

    let content = message.normalized_text();

    if is_single_digit_selection(&content) {
        return Some(RoutingDecision::new("number", Destination::Input));
    }

    if bot.is_some_and(|bot| message.mentions_bot(bot)) {
        return Some(RoutingDecision::new("ask", Destination::Query));
    }

    if message.attachments.iter().any(|att| att.is_audio()) {
        return Some(RoutingDecision::new("voice", Destination::Input));
    }

    PREFIX_ROUTES
        .iter()
        .find(|(prefix, _)| content.starts_with(prefix))
        .map(|&(prefix, destination)| {
            RoutingDecision::new(command_type_for(prefix), destination)
        })
}
