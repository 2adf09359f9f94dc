//! Contract review data model.

mod compliance;
mod contract;

pub use compliance::{ClauseComplianceCheck, ComplianceReport, GuidelineMatch};
pub use contract::{ContractClause, ContractExtraction};
