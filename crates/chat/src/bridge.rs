use crate::client::ChatTransport;
use crate::context::{ChatContext, ChatReply, ChatRequest, ClaimsData, ContextType, case_context_intro};
use crate::session::{ChatMessage, ChatSession};
use anyhow::Result;
use tracing::{info, warn};

pub const FALLBACK_REPLY: &str = "Unable to contact the invoice assistant. Please retry shortly.";
pub const CONNECTION_FAILED: &str = "Connection failed. Verify the backend is reachable.";

pub struct ChatBridge<T> {
    transport: T,
    history_window: usize,
    client_tag: String,
}

impl<T: ChatTransport> ChatBridge<T> {
    pub fn new(transport: T, history_window: usize, client_tag: impl Into<String>) -> Self {
        Self {
            transport,
            history_window,
            client_tag: client_tag.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Record the user's question and build the upstream request.
    ///
    /// Returns `None` for blank input, leaving the session untouched.
    pub fn prepare(
        &self,
        session: &mut ChatSession,
        text: &str,
        context: &ChatContext<'_>,
    ) -> Option<ChatRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        session.push(ChatMessage::user(text));

        let message = match context.current_case {
            Some(case) => format!("{}{}", case_context_intro(case), text),
            None => text.to_string(),
        };

        Some(ChatRequest {
            message,
            chat_history: session.history(self.history_window),
            context_type: if context.current_case.is_some() {
                ContextType::Case
            } else {
                ContextType::Dashboard
            },
            claims_data: ClaimsData::from_context(context),
            client: self.client_tag.clone(),
        })
    }

    /// One request, no retry.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.transport.send(request).await
    }

    /// Prepare, send and record the reply in one go.
    pub async fn submit(
        &self,
        session: &mut ChatSession,
        text: &str,
        context: &ChatContext<'_>,
    ) -> Option<ChatMessage> {
        let request = self.prepare(session, text, context)?;
        let reply = reply_message(self.send(&request).await);
        session.push(reply.clone());
        Some(reply)
    }
}

/// Turn the transport outcome into the assistant message to show.
pub fn reply_message(outcome: Result<ChatReply>) -> ChatMessage {
    match outcome {
        Ok(ChatReply {
            success: true,
            response: Some(response),
            ..
        }) if !response.is_empty() => {
            info!(chars = response.len(), "Chat reply received");
            ChatMessage::assistant(response)
        }
        Ok(reply) => {
            let text = reply
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| FALLBACK_REPLY.to_string());
            warn!(success = reply.success, error = %text, "Chat endpoint returned no answer");
            ChatMessage::error(text)
        }
        Err(e) => {
            warn!(error = %e, "Chat request failed");
            ChatMessage::error(CONNECTION_FAILED)
        }
    }
}
