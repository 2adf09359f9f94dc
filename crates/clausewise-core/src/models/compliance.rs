//! Compliance verdict and report models.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{SchemaKind, StructuredOutput};

/// A guideline passage as recorded inside a compliance check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidelineMatch {
    /// The guideline text the clause was compared against
    pub guideline_text: String,

    /// Relevance score reported by the retriever or the judge
    #[serde(default)]
    pub similarity_score: Option<f64>,

    /// Why this guideline applies to the clause
    #[serde(default)]
    pub relevance_explanation: Option<String>,
}

impl GuidelineMatch {
    pub fn new(guideline_text: impl Into<String>) -> Self {
        Self {
            guideline_text: guideline_text.into(),
            similarity_score: None,
            relevance_explanation: None,
        }
    }
}

/// Verdict for one clause.
///
/// Exactly one is produced per processed clause. Failed clauses are recorded
/// as non-compliant with no matched guideline and the failure in `notes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClauseComplianceCheck {
    pub clause_text: String,

    #[serde(default)]
    pub matched_guideline: Option<GuidelineMatch>,

    pub compliant: bool,

    #[serde(default)]
    pub notes: Option<String>,
}

impl ClauseComplianceCheck {
    /// Record for a clause whose matching could not be completed.
    pub fn failed(clause_text: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            clause_text: clause_text.into(),
            matched_guideline: None,
            compliant: false,
            notes: Some(format!("Error processing clause: {}", reason)),
        }
    }

    /// Guideline text, if a guideline was matched.
    pub fn guideline_text(&self) -> Option<&str> {
        self.matched_guideline
            .as_ref()
            .map(|g| g.guideline_text.as_str())
    }
}

impl StructuredOutput for ClauseComplianceCheck {
    const SCHEMA: SchemaKind = SchemaKind::ClauseComplianceCheck;
}

/// Contract-level compliance report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceReport {
    #[serde(default)]
    pub vendor_name: Option<String>,

    /// True only if the contract as a whole complies
    pub overall_compliant: bool,

    /// Narrative summary
    pub summary_notes: String,

    /// Most important findings, one per entry
    #[serde(default)]
    pub key_findings: Vec<String>,
}

impl StructuredOutput for ComplianceReport {
    const SCHEMA: SchemaKind = SchemaKind::ComplianceReport;
}

impl fmt::Display for ComplianceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Vendor: {}",
            self.vendor_name.as_deref().unwrap_or("(unknown)")
        )?;
        writeln!(
            f,
            "Overall: {}",
            if self.overall_compliant {
                "COMPLIANT"
            } else {
                "NON-COMPLIANT"
            }
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.summary_notes)?;
        if !self.key_findings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Key findings:")?;
            for finding in &self.key_findings {
                writeln!(f, "  - {}", finding)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_record_shape() {
        let check = ClauseComplianceCheck::failed("Clause1", "judge unavailable");
        assert!(!check.compliant);
        assert!(check.matched_guideline.is_none());
        assert_eq!(
            check.notes.as_deref(),
            Some("Error processing clause: judge unavailable")
        );
    }

    #[test]
    fn test_check_accepts_null_guideline() {
        let check = ClauseComplianceCheck::from_value(json!({
            "clause_text": "Data is sold to partners.",
            "matched_guideline": null,
            "compliant": false,
            "notes": "No lawful basis."
        }))
        .unwrap();
        assert!(check.guideline_text().is_none());
    }

    #[test]
    fn test_check_rejects_guideline_without_text() {
        let result = ClauseComplianceCheck::from_value(json!({
            "clause_text": "Data is sold to partners.",
            "matched_guideline": {"similarity_score": 0.4},
            "compliant": false
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_rejects_string_verdict() {
        let result = ClauseComplianceCheck::from_value(json!({
            "clause_text": "x",
            "compliant": "yes"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_report_display() {
        let report = ComplianceReport {
            vendor_name: Some("Acme Cloud".to_string()),
            overall_compliant: false,
            summary_notes: "Transfers lack safeguards.".to_string(),
            key_findings: vec!["Clause 4 permits transfers without SCCs".to_string()],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("Vendor: Acme Cloud"));
        assert!(rendered.contains("NON-COMPLIANT"));
        assert!(rendered.contains("  - Clause 4 permits transfers without SCCs"));
    }
}
