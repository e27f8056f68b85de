pub mod bridge;
pub mod client;
pub mod context;
pub mod session;

pub use bridge::{CONNECTION_FAILED, ChatBridge, FALLBACK_REPLY, reply_message};
pub use client::{ChatClient, ChatTransport, DEFAULT_BACKEND_URL};
pub use context::{CaseSummary, ChatContext, ChatReply, ChatRequest, ClaimsData, ContextType, CurrentCaseSummary, case_context_intro};
pub use session::{ChatMessage, ChatSession, HistoryTurn, Sender};
