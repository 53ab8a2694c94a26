//! Test doubles for the provider and platform seams.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::platform::{ChatSender, OutgoingMessage};
use crate::prompt::{PromptProvider, PromptRequest, ProviderError};

/// Replies with fixed text, or fails every call.
pub struct ScriptedProvider {
    reply: Option<String>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (kind, context) for every generate call so far
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PromptProvider for ScriptedProvider {
    async fn generate(&self, request: PromptRequest<'_>) -> Result<String, ProviderError> {
        let context = match request {
            PromptRequest::DailyQuestion => None,
            PromptRequest::ReactiveQuip { context } => Some(context.to_string()),
        };
        self.calls
            .lock()
            .unwrap()
            .push((request.kind().to_string(), context));

        self.reply.clone().ok_or(ProviderError::Timeout)
    }
}

/// Keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingSender {
    fail: bool,
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every attempted send, including failed ones
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        if self.fail {
            anyhow::bail!("network unreachable");
        }
        Ok(())
    }
}
