use crate::placeholder::PlaceholderGenerator;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample(&self, generator: &mut PlaceholderGenerator) -> Duration {
        generator.delay(self.min_ms, self.max_ms)
    }

    fn scaled(&self, divisor: u64) -> Self {
        let divisor = divisor.max(1);
        Self::new(self.min_ms / divisor, self.max_ms / divisor)
    }
}

/// How long each phase of a stage stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTiming {
    /// In-progress message.
    pub running: DelayRange,
    /// Completion message.
    pub completion: DelayRange,
    /// "Stage processed" marker.
    pub processed: DelayRange,
}

impl Default for PipelineTiming {
    fn default() -> Self {
        Self {
            running: DelayRange::new(3000, 5000),
            completion: DelayRange::new(2000, 3000),
            processed: DelayRange::new(1000, 2000),
        }
    }
}

impl PipelineTiming {
    /// Every range divided by `divisor`, for demos.
    pub fn accelerated(divisor: u64) -> Self {
        let base = Self::default();
        Self {
            running: base.running.scaled(divisor),
            completion: base.completion.scaled(divisor),
            processed: base.processed.scaled(divisor),
        }
    }

    /// Upper bound on the length of one stage.
    pub fn max_stage_duration(&self) -> Duration {
        Duration::from_millis(self.running.max_ms + self.completion.max_ms + self.processed.max_ms)
    }
}
