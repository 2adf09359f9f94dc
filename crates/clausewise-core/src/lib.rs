//! # clausewise-core
//!
//! Data model for contract compliance review.
//!
//! This crate holds everything about a review that does not need I/O:
//! - The contract extraction model (`ContractExtraction`, `ContractClause`)
//! - Per-clause verdicts (`ClauseComplianceCheck`) and the final `ComplianceReport`
//! - Embedded JSON Schemas that every structured model output is checked against
//!
//! The pipeline that produces these values lives in `clausewise-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use clausewise_core::{ContractExtraction, StructuredOutput};
//!
//! let extraction = ContractExtraction::from_json_str(
//!     r#"{"vendor_name": "Acme", "clauses": [{"clause_text": "Data stays in the EU."}]}"#,
//! ).unwrap();
//! assert_eq!(extraction.clauses.len(), 1);
//! ```

pub mod json;
pub mod models;
pub mod schema;

pub use json::extract_json_block;
pub use models::{
    ClauseComplianceCheck, ComplianceReport, ContractClause, ContractExtraction, GuidelineMatch,
};
pub use schema::{SchemaError, SchemaKind, StructuredOutput};
