//! Final report synthesis.

use std::sync::Arc;

use clausewise_core::{ClauseComplianceCheck, ComplianceReport};

use super::render;
use crate::error::ReviewError;
use crate::events::EventSink;
use crate::judge::prompts::COMPLIANCE_REPORT;
use crate::judge::{structured_predict, PromptInputs, StructuredJudge};

const UNKNOWN_VENDOR: &str = "Unknown vendor";

/// One judge call over all results. Not retried; a bad report fails the run.
#[derive(Clone)]
pub struct ReportStage {
    judge: Arc<dyn StructuredJudge>,
}

impl ReportStage {
    pub fn new(judge: Arc<dyn StructuredJudge>) -> Self {
        Self { judge }
    }

    pub async fn generate(
        &self,
        vendor_name: Option<&str>,
        results: &[ClauseComplianceCheck],
        events: &EventSink,
    ) -> Result<ComplianceReport, ReviewError> {
        events.progress(">> Generating final report");
        tracing::info!(results = results.len(), "Generating report");

        let compliance_results = serde_json::to_string_pretty(results)
            .map_err(|e| ReviewError::Aborted(format!("Cannot serialize results: {}", e)))?;
        let inputs = PromptInputs::new()
            .with("vendor_name", vendor_name.unwrap_or(UNKNOWN_VENDOR))
            .with("compliance_results", compliance_results);

        let mut report =
            structured_predict::<ComplianceReport>(self.judge.as_ref(), &COMPLIANCE_REPORT, &inputs)
                .await
                .map_err(|e| {
                    if e.is_schema_mismatch() {
                        ReviewError::ReportSchemaMismatch(e)
                    } else {
                        ReviewError::Judge(e)
                    }
                })?;

        if report.vendor_name.is_none() {
            report.vendor_name = vendor_name.map(str::to_string);
        }

        events.progress(format!(">> Report generated: {}", render(&report)));
        Ok(report)
    }
}
