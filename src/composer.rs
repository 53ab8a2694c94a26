use std::sync::Arc;

use teloxide::utils::html;
use tracing::warn;

use crate::config::MessagesConfig;
use crate::mentions::MentionSelector;
use crate::prompt::{PromptProvider, PromptRequest};

/// Builds broadcast and quip text from generated content.
/// Every call asks the provider again; nothing is cached.
pub struct Composer {
    provider: Arc<dyn PromptProvider>,
    mentions: MentionSelector,
    messages: MessagesConfig,
}

impl Composer {
    pub fn new(
        provider: Arc<dyn PromptProvider>,
        mentions: MentionSelector,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            provider,
            mentions,
            messages,
        }
    }

    /// Daily question with a few member mentions, as Telegram HTML.
    pub async fn compose_broadcast(&self) -> String {
        let request = PromptRequest::DailyQuestion;
        let question = match self.provider.generate(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} generation failed, using fallback: {}", request.kind(), e);
                self.messages.fallback_question.clone()
            }
        };

        let mentions = self.mentions.select().await;
        self.render_broadcast(&question, &mentions)
    }

    /// Short reaction to `user_text`, as Telegram HTML.
    pub async fn compose_reply(&self, user_text: &str) -> String {
        let request = PromptRequest::ReactiveQuip { context: user_text };
        match self.provider.generate(request).await {
            Ok(text) => html::escape(&text),
            Err(e) => {
                warn!("{} generation failed, using fallback: {}", request.kind(), e);
                html::escape(&self.messages.fallback_quip)
            }
        }
    }

    fn render_broadcast(&self, question: &str, mentions: &[String]) -> String {
        let mut text = format!(
            "{}\n{}",
            html::escape(&self.messages.question_header),
            html::escape(question)
        );
        if !mentions.is_empty() {
            text.push_str(&format!(
                "\n\n{} {}",
                html::escape(&self.messages.mentions_prefix),
                mentions.join(" ")
            ));
        }
        text
    }
}
