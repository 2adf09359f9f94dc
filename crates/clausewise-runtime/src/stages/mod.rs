//! The three pipeline stages.
//!
//! Each stage can run on its own; the orchestrator sequences them.

mod extraction;
mod matching;
mod report;

use serde::Serialize;

pub use extraction::ExtractionStage;
pub use matching::MatchingStage;
pub use report::ReportStage;

/// Compact JSON for progress messages.
fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unrenderable: {}>", e))
}
