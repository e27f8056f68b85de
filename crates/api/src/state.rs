use crate::config::AppConfig;
use crate::metrics::Metrics;
use axum::http::HeaderMap;
use chat::{ChatBridge, ChatClient, ChatSession};
use dashmap::DashMap;
use insights::{DashboardStats, compute_stats};
use pipeline::PipelineDriver;
use registry::Case;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

pub const SESSION_HEADER: &str = "x-nips-session";
pub const DEFAULT_SESSION: &str = "default";

/// What one dashboard view owns: its open pipeline run and its conversation.
pub struct ViewSession {
    pub pipeline: PipelineDriver,
    pub chat: Mutex<ChatSession>,
    /// Milliseconds since startup at the last request for this view.
    last_seen: AtomicU64,
}

pub struct AppState {
    pub config: AppConfig,
    pub cases: Vec<Case>,
    pub stats: DashboardStats,
    pub chat: ChatBridge<ChatClient>,
    pub sessions: DashMap<String, Arc<ViewSession>>,
    pub metrics: Arc<Metrics>,
    started: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, cases: Vec<Case>, chat: ChatBridge<ChatClient>, metrics: Arc<Metrics>) -> Self {
        let stats = compute_stats(&cases);
        Self {
            config,
            cases,
            stats,
            chat,
            sessions: DashMap::new(),
            metrics,
            started: Instant::now(),
        }
    }

    pub fn find_case(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// The view session named by the session header, created on first use.
    ///
    /// When `server.max_sessions` views exist, the least recently used
    /// quarter is dropped before a new one is created. Dropping a view
    /// cancels its pending pipeline transition.
    pub fn session(&self, headers: &HeaderMap) -> Arc<ViewSession> {
        let key = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_SESSION);
        let now = self.started.elapsed().as_millis() as u64;

        if let Some(existing) = self.sessions.get(key) {
            existing.last_seen.store(now, Ordering::Relaxed);
            return existing.clone();
        }

        self.evict_idle_sessions();

        self.sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(ViewSession {
                    pipeline: PipelineDriver::new(self.config.pipeline.timing, self.config.pipeline.seed),
                    chat: Mutex::new(ChatSession::new()),
                    last_seen: AtomicU64::new(now),
                })
            })
            .clone()
    }

    fn evict_idle_sessions(&self) {
        let max_sessions = self.config.server.max_sessions.max(1);
        if self.sessions.len() < max_sessions {
            return;
        }

        let mut idle: Vec<(u64, String)> = self
            .sessions
            .iter()
            .map(|r| (r.value().last_seen.load(Ordering::Relaxed), r.key().clone()))
            .collect();
        idle.sort();

        let count = (max_sessions / 4).max(1);
        for (_, key) in idle.into_iter().take(count) {
            self.sessions.remove(&key);
        }
        self.metrics.record_sessions_evicted(count);
        info!(evicted = count, remaining = self.sessions.len(), "View sessions evicted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use registry::builtin_definitions;
    use std::time::Duration;

    fn state(max_sessions: usize) -> AppState {
        let mut config = AppConfig::default();
        config.server.max_sessions = max_sessions;
        let client = ChatClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let bridge = ChatBridge::new(client, 10, "nips");
        AppState::new(config, builtin_definitions(), bridge, Metrics::new())
    }

    fn headers(session: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_str(session).unwrap());
        headers
    }

    #[test]
    fn test_same_header_reuses_session() {
        let state = state(8);
        let first = state.session(&headers("a"));
        let again = state.session(&headers("a"));
        assert!(Arc::ptr_eq(&first, &again));

        let default = state.session(&HeaderMap::new());
        assert!(!Arc::ptr_eq(&first, &default));
        assert!(state.sessions.contains_key(DEFAULT_SESSION));
    }

    #[test]
    fn test_distinct_headers_stay_under_cap() {
        let state = state(8);
        for i in 0..10_000 {
            state.session(&headers(&format!("view-{i}")));
        }

        assert!(state.sessions.len() <= 8);
        assert!(state.sessions.contains_key("view-9999"));
        assert!(state.metrics.snapshot().sessions_evicted > 0);
    }

    #[test]
    fn test_recently_used_session_survives_eviction() {
        let state = state(4);
        state.session(&headers("keep"));
        for i in 0..3 {
            std::thread::sleep(Duration::from_millis(2));
            state.session(&headers(&format!("other-{i}")));
        }
        std::thread::sleep(Duration::from_millis(2));
        state.session(&headers("keep"));

        std::thread::sleep(Duration::from_millis(2));
        state.session(&headers("new"));

        assert_eq!(state.sessions.len(), 4);
        assert!(state.sessions.contains_key("keep"));
        assert!(!state.sessions.contains_key("other-0"));
    }
}
