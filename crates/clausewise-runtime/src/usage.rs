//! Token accounting for structured judge calls.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated LLM usage for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Number of completions requested, failed ones included
    pub llm_calls: u32,

    /// Completions that returned a response
    pub successful_calls: u32,

    pub prompt_tokens: u32,

    pub completion_tokens: u32,

    pub total_tokens: u32,
}

impl LlmUsage {
    fn add(&mut self, usage: &TokenUsage) {
        self.successful_calls += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
    }
}

/// Shared usage counter. Safe to record from concurrent clause tasks.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a call before it is sent.
    pub fn record_call(&self) {
        self.usage.write().llm_calls += 1;
    }

    /// Record the tokens of a completed call.
    pub fn record_response(&self, usage: &TokenUsage) {
        self.usage.write().add(usage);
    }

    pub fn snapshot(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    pub fn reset(&self) {
        *self.usage.write() = LlmUsage::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_accumulates() {
        let tracker = UsageTracker::new();
        tracker.record_call();
        tracker.record_response(&TokenUsage {
            prompt_tokens: 30,
            completion_tokens: 20,
        });
        tracker.record_call();

        let usage = tracker.snapshot();
        assert_eq!(usage.llm_calls, 2);
        assert_eq!(usage.successful_calls, 1);
        assert_eq!(usage.total_tokens, 50);
    }

    #[test]
    fn test_reset() {
        let tracker = UsageTracker::new();
        tracker.record_call();
        tracker.reset();
        assert_eq!(tracker.snapshot(), LlmUsage::default());
    }
}
