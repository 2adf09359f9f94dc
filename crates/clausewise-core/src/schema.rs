//! JSON Schema validation for structured judge output.
//!
//! Every value a language model returns is validated against the embedded
//! schema of its target type before it is deserialized. The extraction cache
//! file is validated against the same schema when it is read back.

use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const CONTRACT_EXTRACTION_SCHEMA_JSON: &str =
    include_str!("../schemas/contract_extraction.schema.json");
const CLAUSE_COMPLIANCE_CHECK_SCHEMA_JSON: &str =
    include_str!("../schemas/clause_compliance_check.schema.json");
const COMPLIANCE_REPORT_SCHEMA_JSON: &str =
    include_str!("../schemas/compliance_report.schema.json");

static CONTRACT_EXTRACTION: OnceLock<Result<CompiledSchema, String>> = OnceLock::new();
static CLAUSE_COMPLIANCE_CHECK: OnceLock<Result<CompiledSchema, String>> = OnceLock::new();
static COMPLIANCE_REPORT: OnceLock<Result<CompiledSchema, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),

    #[error("{schema} does not conform to its schema: {}", errors.join("; "))]
    Invalid {
        schema: &'static str,
        errors: Vec<String>,
    },
}

/// The structured shapes a judge can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    ContractExtraction,
    ClauseComplianceCheck,
    ComplianceReport,
}

impl SchemaKind {
    pub fn name(self) -> &'static str {
        match self {
            SchemaKind::ContractExtraction => "ContractExtraction",
            SchemaKind::ClauseComplianceCheck => "ClauseComplianceCheck",
            SchemaKind::ComplianceReport => "ComplianceReport",
        }
    }

    fn source(self) -> &'static str {
        match self {
            SchemaKind::ContractExtraction => CONTRACT_EXTRACTION_SCHEMA_JSON,
            SchemaKind::ClauseComplianceCheck => CLAUSE_COMPLIANCE_CHECK_SCHEMA_JSON,
            SchemaKind::ComplianceReport => COMPLIANCE_REPORT_SCHEMA_JSON,
        }
    }

    fn cell(self) -> &'static OnceLock<Result<CompiledSchema, String>> {
        match self {
            SchemaKind::ContractExtraction => &CONTRACT_EXTRACTION,
            SchemaKind::ClauseComplianceCheck => &CLAUSE_COMPLIANCE_CHECK,
            SchemaKind::ComplianceReport => &COMPLIANCE_REPORT,
        }
    }

    fn compiled(self) -> Result<&'static CompiledSchema, SchemaError> {
        let result = self.cell().get_or_init(|| {
            let value: Value = serde_json::from_str(self.source())
                .map_err(|e| format!("Invalid {} schema JSON: {}", self.name(), e))?;
            let validator = jsonschema::options()
                .build(&value)
                .map_err(|e| format!("Failed to compile {} schema: {}", self.name(), e))?;
            Ok(CompiledSchema { value, validator })
        });

        match result {
            Ok(compiled) => Ok(compiled),
            Err(e) => Err(SchemaError::LoadError(e.clone())),
        }
    }

    /// The raw JSON Schema document, for embedding in prompts.
    pub fn document(self) -> Result<&'static Value, SchemaError> {
        self.compiled().map(|c| &c.value)
    }

    /// Validate a value, collecting every violation.
    pub fn validate(self, instance: &Value) -> Result<(), SchemaError> {
        let compiled = self.compiled()?;

        let errors: Vec<String> = compiled
            .validator
            .iter_errors(instance)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                schema: self.name(),
                errors,
            })
        }
    }
}

struct CompiledSchema {
    value: Value,
    validator: jsonschema::Validator,
}

/// A model type that a structured judge can produce.
pub trait StructuredOutput: Serialize + DeserializeOwned + Send + 'static {
    const SCHEMA: SchemaKind;

    /// Validate `value` against the type's schema, then deserialize it.
    fn from_value(value: Value) -> Result<Self, SchemaError> {
        Self::SCHEMA.validate(&value)?;
        serde_json::from_value(value).map_err(|e| SchemaError::Invalid {
            schema: Self::SCHEMA.name(),
            errors: vec![e.to_string()],
        })
    }

    /// Parse and validate a JSON document.
    fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(json).map_err(|e| SchemaError::Invalid {
            schema: Self::SCHEMA.name(),
            errors: vec![e.to_string()],
        })?;
        Self::from_value(value)
    }
}
