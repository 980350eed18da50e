use chrono::Utc;
use tracing::warn;

use crate::model::{ChatMessage, Sender};
use crate::storefront::{Storefront, StorefrontError};

pub const AGENT_FAILURE_REPLY: &str = "Network/Server error, please try again.";

/// Conversation with the support agent, oldest message first.
#[derive(Debug, Default, Clone)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn push(&mut self, sender: Sender, text: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage {
            sender,
            text: text.into(),
            sent_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Send one user message and record the agent's answer.
    ///
    /// Blank input and a missing session are returned as errors without
    /// touching the transcript. Any other failure is recorded as an agent
    /// reply so the conversation stays readable.
    pub async fn send(
        &mut self,
        storefront: &Storefront,
        text: &str,
    ) -> Result<&ChatMessage, StorefrontError> {
        if text.trim().is_empty() {
            return Err(StorefrontError::Validation("Please type a message."));
        }
        if !storefront.session().is_signed_in() {
            return Err(StorefrontError::NotSignedIn);
        }

        self.push(Sender::User, text);
        let reply = match storefront.ask_agent(text).await {
            Ok(reply) => reply,
            Err(StorefrontError::SessionExpired) => {
                self.push(Sender::Agent, AGENT_FAILURE_REPLY);
                return Err(StorefrontError::SessionExpired);
            }
            Err(err) => {
                warn!(?err, "agent call failed");
                AGENT_FAILURE_REPLY.to_string()
            }
        };
        Ok(self.push(Sender::Agent, reply))
    }
}
