use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Pipeline
    pipeline_runs: AtomicUsize,
    pipelines_cancelled: AtomicUsize,
    sessions_evicted: AtomicUsize,

    // Chat (timing in microseconds)
    chat_replies: AtomicUsize,
    chat_failures: AtomicUsize,
    total_chat_time_us: AtomicU64,

    // Registry: referenced documents that could not be loaded
    failed_documents: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            pipeline_runs: AtomicUsize::new(0),
            pipelines_cancelled: AtomicUsize::new(0),
            sessions_evicted: AtomicUsize::new(0),
            chat_replies: AtomicUsize::new(0),
            chat_failures: AtomicUsize::new(0),
            total_chat_time_us: AtomicU64::new(0),
            failed_documents: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A run started; `replaced` when it cancelled an unfinished one.
    pub fn record_pipeline_start(&self, replaced: bool) {
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.pipelines_cancelled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_pipeline_cancel(&self) {
        self.pipelines_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sessions_evicted(&self, count: usize) {
        self.sessions_evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_chat(&self, success: bool, duration: Duration) {
        self.total_chat_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if success {
            self.chat_replies.fetch_add(1, Ordering::Relaxed);
        } else {
            self.chat_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failed_documents(&self, count: usize) {
        self.failed_documents.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let chat_total = self.chat_replies.load(Ordering::Relaxed) + self.chat_failures.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            pipeline_runs: self.pipeline_runs.load(Ordering::Relaxed),
            pipelines_cancelled: self.pipelines_cancelled.load(Ordering::Relaxed),
            sessions_evicted: self.sessions_evicted.load(Ordering::Relaxed),
            chat_replies: self.chat_replies.load(Ordering::Relaxed),
            chat_failures: self.chat_failures.load(Ordering::Relaxed),
            avg_chat_time_ms: avg_time_ms(&self.total_chat_time_us, chat_total),
            failed_documents: self.failed_documents.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    if count > 0 {
        total / count as f64 / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub pipeline_runs: usize,
    pub pipelines_cancelled: usize,
    pub sessions_evicted: usize,
    pub chat_replies: usize,
    pub chat_failures: usize,
    pub avg_chat_time_ms: f64,
    pub failed_documents: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
