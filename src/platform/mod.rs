pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Kind of chat a message arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Multi-party chats where broadcasts make sense
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// The message an inbound message replies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRef {
    /// Platform user id of the original message's author, if known
    pub author_id: Option<u64>,
}

/// A message received from the chat platform, reduced to what routing needs
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub message_id: i32,
    /// Sender's public handle, without the leading '@'
    pub sender_handle: Option<String>,
    pub text: Option<String>,
    pub reply_to: Option<ReplyRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Html,
}

/// A message to deliver through the platform's send primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub format: TextFormat,
    /// Message id to thread the reply under
    pub reply_to: Option<i32>,
}

impl OutgoingMessage {
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: TextFormat::Plain,
            reply_to: None,
        }
    }

    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            format: TextFormat::Html,
            ..Self::plain(chat_id, text)
        }
    }

    pub fn replying_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<()>;
}
