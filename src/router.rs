//! Decides what to do with each inbound message.
//!
//! Precedence, first match wins: command, reply to the bot, passive tracking, ignore.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::composer::Composer;
use crate::config::MessagesConfig;
use crate::platform::{ChatSender, InboundEvent, OutgoingMessage};
use crate::registry::MemberRegistry;

/// The bot's own account, used to recognise replies to it and addressed commands
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub user_id: u64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Greeting, any chat
    Start,
    /// Manual broadcast, groups only
    Ask,
}

impl Command {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Command::Start),
            "ask" => Some(Command::Ask),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    ReplyToBot { text: String },
    Track { handle: Option<String> },
    Ignore,
}

/// Pure classification of one event.
pub fn classify(event: &InboundEvent, me: &BotIdentity) -> Route {
    let Some(text) = event.text.as_deref().filter(|t| !t.is_empty()) else {
        return Route::Ignore;
    };

    if text.starts_with('/') {
        return match parse_command(text, me.username.as_deref()) {
            Some(command) => Route::Command(command),
            // unknown or addressed to another bot
            None => Route::Ignore,
        };
    }

    let replies_to_me = event
        .reply_to
        .as_ref()
        .is_some_and(|reply| reply.author_id == Some(me.user_id));
    if replies_to_me {
        return Route::ReplyToBot {
            text: text.to_string(),
        };
    }

    Route::Track {
        handle: event.sender_handle.clone().filter(|h| !h.is_empty()),
    }
}

/// Parse `/name` or `/name@botname` at the start of `text`.
fn parse_command(text: &str, my_username: Option<&str>) -> Option<Command> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    let (name, addressee) = match token.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (token, None),
    };

    if let Some(addressee) = addressee {
        let mine = my_username.is_some_and(|me| me.eq_ignore_ascii_case(addressee));
        if !mine {
            return None;
        }
    }

    Command::from_name(&name.to_ascii_lowercase())
}

/// Dispatches classified events to the registry, the composer and the chat.
pub struct Router {
    identity: BotIdentity,
    registry: Arc<MemberRegistry>,
    composer: Arc<Composer>,
    sender: Arc<dyn ChatSender>,
    messages: MessagesConfig,
}

impl Router {
    pub fn new(
        identity: BotIdentity,
        registry: Arc<MemberRegistry>,
        composer: Arc<Composer>,
        sender: Arc<dyn ChatSender>,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            identity,
            registry,
            composer,
            sender,
            messages,
        }
    }

    /// Handle one event. Errors come only from the send step and affect only this event.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        let route = classify(&event, &self.identity);
        debug!("Message {} in chat {} routed to {:?}", event.message_id, event.chat_id, route);

        match route {
            Route::Command(Command::Start) => {
                let reply = OutgoingMessage::plain(event.chat_id, &self.messages.greeting)
                    .replying_to(event.message_id);
                self.sender.send(reply).await
            }
            Route::Command(Command::Ask) => {
                if !event.chat_kind.is_group() {
                    info!("Rejected /ask outside a group (chat {})", event.chat_id);
                    let reply = OutgoingMessage::plain(event.chat_id, &self.messages.group_only)
                        .replying_to(event.message_id);
                    return self.sender.send(reply).await;
                }

                info!("Manual broadcast requested in chat {}", event.chat_id);
                let text = self.composer.compose_broadcast().await;
                let reply = OutgoingMessage::html(event.chat_id, text).replying_to(event.message_id);
                self.sender.send(reply).await
            }
            Route::ReplyToBot { text } => {
                let quip = self.composer.compose_reply(&text).await;
                let reply = OutgoingMessage::html(event.chat_id, quip).replying_to(event.message_id);
                self.sender.send(reply).await
            }
            Route::Track { handle } => {
                if let Some(handle) = handle {
                    if self.registry.record(&handle).await {
                        info!("Now tracking @{}", handle);
                    }
                }
                Ok(())
            }
            Route::Ignore => Ok(()),
        }
    }
}
