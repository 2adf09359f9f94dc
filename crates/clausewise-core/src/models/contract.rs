//! Contract extraction model.
//!
//! A `ContractExtraction` is produced exactly once per contract, either by the
//! structured judge or by loading it back from the extraction cache. It is
//! never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::schema::{SchemaKind, StructuredOutput};

/// One extracted clause with its compliance-relevant indicators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractClause {
    /// The exact text of the clause
    pub clause_text: String,

    /// Clause involves personal data collection or usage
    #[serde(default)]
    pub mentions_data_processing: bool,

    /// Clause involves transferring personal data to third parties or across borders
    #[serde(default)]
    pub mentions_data_transfer: bool,

    /// Clause states that user consent is needed for data activities
    #[serde(default)]
    pub requires_consent: bool,

    /// Clause specifies a clear purpose for data handling or transfer
    #[serde(default)]
    pub specifies_purpose: bool,

    /// Clause mentions security measures or other safeguards
    #[serde(default)]
    pub mentions_safeguards: bool,
}

impl ContractClause {
    /// Create a clause with every flag unset.
    pub fn new(clause_text: impl Into<String>) -> Self {
        Self {
            clause_text: clause_text.into(),
            mentions_data_processing: false,
            mentions_data_transfer: false,
            requires_consent: false,
            specifies_purpose: false,
            mentions_safeguards: false,
        }
    }

    /// Names of the flags that are set, in declaration order.
    pub fn active_flags(&self) -> Vec<&'static str> {
        [
            ("mentions_data_processing", self.mentions_data_processing),
            ("mentions_data_transfer", self.mentions_data_transfer),
            ("requires_consent", self.requires_consent),
            ("specifies_purpose", self.specifies_purpose),
            ("mentions_safeguards", self.mentions_safeguards),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Structured representation of a contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractExtraction {
    /// The vendor's name if identifiable
    #[serde(default)]
    pub vendor_name: Option<String>,

    /// Effective date of the agreement, as written in the contract
    #[serde(default)]
    pub effective_date: Option<String>,

    /// Governing law, if stated
    #[serde(default)]
    pub governing_law: Option<String>,

    /// Clauses in extraction order. May be empty.
    pub clauses: Vec<ContractClause>,
}

impl ContractExtraction {
    /// Create an extraction with no metadata.
    pub fn with_clauses(clauses: Vec<ContractClause>) -> Self {
        Self {
            vendor_name: None,
            effective_date: None,
            governing_law: None,
            clauses,
        }
    }

    /// Set the vendor name.
    pub fn vendor(mut self, vendor_name: impl Into<String>) -> Self {
        self.vendor_name = Some(vendor_name.into());
        self
    }
}

impl StructuredOutput for ContractExtraction {
    const SCHEMA: SchemaKind = SchemaKind::ContractExtraction;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_default_to_false() {
        let clause: ContractClause =
            serde_json::from_value(json!({"clause_text": "Vendor stores data in the EU."})).unwrap();
        assert!(clause.active_flags().is_empty());
    }

    #[test]
    fn test_active_flags_in_order() {
        let mut clause = ContractClause::new("Transfers require consent.");
        clause.requires_consent = true;
        clause.mentions_data_transfer = true;
        assert_eq!(
            clause.active_flags(),
            vec!["mentions_data_transfer", "requires_consent"]
        );
    }

    #[test]
    fn test_extraction_from_value_accepts_empty_clauses() {
        let extraction = ContractExtraction::from_value(json!({
            "vendor_name": "Acme Cloud",
            "clauses": []
        }))
        .unwrap();
        assert_eq!(extraction.vendor_name.as_deref(), Some("Acme Cloud"));
        assert!(extraction.clauses.is_empty());
    }

    #[test]
    fn test_extraction_from_value_rejects_missing_clauses() {
        let result = ContractExtraction::from_value(json!({"vendor_name": "Acme"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_extraction_preserves_clause_order() {
        let extraction = ContractExtraction::from_value(json!({
            "clauses": [
                {"clause_text": "first"},
                {"clause_text": "second"},
                {"clause_text": "third"}
            ]
        }))
        .unwrap();
        let texts: Vec<_> = extraction.clauses.iter().map(|c| c.clause_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }
}
