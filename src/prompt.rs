//! Text generation for the daily question and for quips.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;

use crate::llm::{ChatMessage, LlmClient};

/// What the provider is asked to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRequest<'a> {
    DailyQuestion,
    /// A short reply to a member who answered one of the bot's messages
    ReactiveQuip { context: &'a str },
}

impl PromptRequest<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            PromptRequest::DailyQuestion => "daily_question",
            PromptRequest::ReactiveQuip { .. } => "reactive_quip",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("provider returned no text")]
    Empty,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Decode(e)
        } else {
            ProviderError::Request(e)
        }
    }
}

/// Anything that can produce generated text. Failures are reported, never papered over.
#[async_trait]
pub trait PromptProvider: Send + Sync {
    async fn generate(&self, request: PromptRequest<'_>) -> Result<String, ProviderError>;
}

const QUESTION_PREAMBLE: &str = "You are a supportive Telegram bot for stress relief...";
const QUESTION_LANGUAGE: &str = "Write the question in Persian (Farsi), casual and safe.";

const QUIP_PROMPT: &str = "You are a supportive Telegram bot for stress relief in a group chat. \
     A member just replied to one of your messages. Answer with a short, warm and playful \
     reply of one or two sentences. Write in Persian (Farsi), casual and safe. \
     Never give medical advice.";

/// Question styles; one is picked at random for every daily question.
pub const THEMES: [&str; 20] = [
    "Ask a poetic and dreamy question about how emotions feel.",
    "Ask a funny and light-hearted question related to everyday stress.",
    "Ask a deep and reflective question about how someone handles anxiety.",
    "Ask a metaphorical question that turns stress into a symbol or image.",
    "Ask a journal-style question that helps people explore their thoughts.",
    "Ask a question like a calm friend inviting someone to breathe and share.",
    "Ask a creative question using colors or seasons to describe emotions.",
    "Ask a question that encourages gratitude and noticing small joys.",
    "Ask a question that compares stress to weather or natural forces.",
    "Ask a question that helps someone reconnect with their inner peace.",
    "Ask a playful 'what if' question that invites imagination and emotion.",
    "Ask a nostalgic question about comforting memories during hard times.",
    "Ask a gentle and warm question that could be part of a daily check-in.",
    "Ask a surreal question, like something from a dream or fantasy.",
    "Ask a short, thought-provoking quote-style question.",
    "Ask a music-related question about songs that help during stress.",
    "Ask a sensory question (taste, smell, sound) linked to feelings.",
    "Ask a question about how someone would comfort a friend who's anxious.",
    "Ask a storytelling-style question, like 'Imagine you're on a calm island...'",
    "Ask a self-care question disguised as a game or playful challenge.",
];

fn question_prompt(theme: &str) -> String {
    format!("{QUESTION_PREAMBLE}\n{theme}\n{QUESTION_LANGUAGE}")
}

/// Build the message list for a request. The theme is drawn here so every call is a fresh roll.
pub fn build_messages(request: PromptRequest<'_>) -> Vec<ChatMessage> {
    match request {
        PromptRequest::DailyQuestion => {
            let theme = THEMES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(THEMES[0]);
            debug!("Daily question theme: {}", theme);
            vec![ChatMessage::system(question_prompt(theme))]
        }
        PromptRequest::ReactiveQuip { context } => vec![
            ChatMessage::system(QUIP_PROMPT),
            ChatMessage::user(context),
        ],
    }
}

/// Prompt provider backed by a chat completions endpoint
pub struct LlmPromptProvider {
    llm: LlmClient,
}

impl LlmPromptProvider {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PromptProvider for LlmPromptProvider {
    async fn generate(&self, request: PromptRequest<'_>) -> Result<String, ProviderError> {
        self.llm.chat(&build_messages(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_question_uses_a_known_theme() {
        let messages = build_messages(PromptRequest::DailyQuestion);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "system");

        let content = messages[0].content.as_deref().unwrap();
        assert!(content.starts_with(QUESTION_PREAMBLE));
        assert!(content.ends_with(QUESTION_LANGUAGE));
        assert!(THEMES.iter().any(|theme| content.contains(theme)));
    }

    #[test]
    fn test_quip_carries_user_text() {
        let messages = build_messages(PromptRequest::ReactiveQuip {
            context: "امروز خیلی خسته‌ام",
        });
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content.as_deref(), Some("امروز خیلی خسته‌ام"));
    }

    #[test]
    fn test_request_kind_names() {
        assert_eq!(PromptRequest::DailyQuestion.kind(), "daily_question");
        assert_eq!(
            PromptRequest::ReactiveQuip { context: "x" }.kind(),
            "reactive_quip"
        );
    }

    #[test]
    fn test_api_error_message() {
        let err = ProviderError::Api {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 429: rate limited");
    }
}
