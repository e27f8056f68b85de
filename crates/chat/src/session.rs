use chrono::{DateTime, Utc};
use registry::Case;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into(), false)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text.into(), false)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text.into(), true)
    }

    fn new(sender: Sender, text: String, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text,
            timestamp: Utc::now(),
            is_error,
        }
    }
}

/// One role/content pair of the history sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Sender,
    pub content: String,
}

/// Conversation for one dashboard view.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    active_case_id: Option<String>,
    /// Bumped whenever the conversation is replaced.
    conversation: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn active_case_id(&self) -> Option<&str> {
        self.active_case_id.as_deref()
    }

    /// Identifies the current conversation; changes when a new case resets it.
    pub fn conversation(&self) -> u64 {
        self.conversation
    }

    /// Follow the open case. Switching to a different case replaces the
    /// conversation with a greeting; closing the case keeps it.
    pub fn focus_case(&mut self, case: Option<&Case>) -> bool {
        let Some(case) = case.filter(|c| !c.id.is_empty()) else {
            return false;
        };
        if self.active_case_id.as_deref() == Some(case.id.as_str()) {
            return false;
        }

        self.messages = vec![ChatMessage::assistant(format!(
            "You are reviewing {}. Ask anything about its invoices, ATP plan, or logistics.",
            case.label
        ))];
        self.active_case_id = Some(case.id.clone());
        self.conversation += 1;
        true
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// The last `window` messages as role/content turns.
    pub fn history(&self, window: usize) -> Vec<HistoryTurn> {
        let skip = self.messages.len().saturating_sub(window);
        self.messages[skip..]
            .iter()
            .map(|m| HistoryTurn {
                role: m.sender,
                content: m.text.clone(),
            })
            .collect()
    }
}
