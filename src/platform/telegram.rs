use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{Chat, MessageId, ParseMode, ReplyParameters};
use tracing::{debug, error, info, warn};

use crate::platform::{ChatKind, ChatSender, InboundEvent, OutgoingMessage, ReplyRef, TextFormat};
use crate::router::{BotIdentity, Router};

/// Build a bot whose HTTP calls give up after `timeout`
pub fn build_bot(token: &str, timeout: Duration) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(timeout)
        .build()
        .context("Failed to build Telegram HTTP client")?;
    Ok(Bot::with_client(token, client))
}

/// Ask Telegram who we are
pub async fn fetch_identity(bot: &Bot) -> Result<BotIdentity> {
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    let identity = BotIdentity {
        user_id: me.id.0,
        username: me.user.username.clone(),
    };
    info!(
        "Bot user ID: {}, username: @{}",
        identity.user_id,
        identity.username.as_deref().unwrap_or("?")
    );
    Ok(identity)
}

/// Send primitive backed by the Bot API
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(message.chat_id), message.text);
        if message.format == TextFormat::Html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(id) = message.reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }

        request
            .await
            .with_context(|| format!("Failed to send message to chat {}", message.chat_id))?;
        Ok(())
    }
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_group() {
        ChatKind::Group
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Private
    }
}

/// Public handle of a real member. Anonymous admins and channel posts arrive
/// through service bots with `sender_chat` set; those have no member handle.
fn sender_handle(msg: &Message) -> Option<String> {
    if msg.sender_chat.is_some() {
        return None;
    }
    msg.from
        .as_ref()
        .filter(|u| !u.is_bot)
        .and_then(|u| u.username.clone())
}

/// Reduce a Telegram message to the fields routing looks at
fn to_inbound(msg: &Message) -> InboundEvent {
    InboundEvent {
        chat_id: msg.chat.id.0,
        chat_kind: chat_kind(&msg.chat),
        message_id: msg.id.0,
        sender_handle: sender_handle(msg),
        text: msg.text().map(str::to_string),
        reply_to: msg.reply_to_message().map(|original| ReplyRef {
            author_id: original.from.as_ref().map(|u| u.id.0),
        }),
    }
}

/// Run the Telegram long-polling loop until shutdown
pub async fn run(router: Arc<Router>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    warn!("Telegram dispatcher stopped");
    Ok(())
}

async fn handle_message(msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    let event = to_inbound(&msg);

    debug!(
        "Telegram message {} from {:?} in chat {}",
        event.message_id, event.sender_handle, event.chat_id
    );

    // a failed reply is this message's problem only
    if let Err(e) = router.dispatch(event).await {
        error!("Error handling message {}: {:#}", msg.id.0, e);
    }

    Ok(())
}
