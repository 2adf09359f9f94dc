//! Prompt templates for the structured judge.
//!
//! Templates are role-tagged message lists with `{name}` placeholders. The
//! schema the answer must conform to is not part of the template; the judge
//! adds it, so the same template works for any backend.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::JudgeError;
use crate::providers::{ChatMessage, Role};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("Invalid regex");
}

/// Extraction prompt. Input: `contract_data`.
pub const CONTRACT_EXTRACT_PROMPT: &str = r#"
You are a legal analyst reviewing a vendor agreement for data protection compliance.

Read the contract below and extract:
- The vendor's name, the effective date and the governing law, when the contract states them.
- Every clause that concerns personal data: its collection, processing, storage, transfer,
  retention, deletion, security, consent, or the rights of data subjects.

For each clause, copy its text exactly as written and set the indicators:
- mentions_data_processing: the clause involves personal data collection or usage
- mentions_data_transfer: the clause involves transferring personal data to third parties or across borders
- requires_consent: the clause states that user consent is needed for data activities
- specifies_purpose: the clause specifies a clear purpose for data handling or transfer
- mentions_safeguards: the clause mentions security measures or other safeguards for data

Keep clauses in the order they appear in the contract. Do not paraphrase or merge clauses.

Contract:
{contract_data}
"#;

/// Matching prompt. Inputs: `clause_text`, `guideline_text`.
pub const CONTRACT_MATCH_PROMPT: &str = r#"
You are a data protection compliance reviewer.

Decide whether the contract clause below complies with the guideline below.
Judge the clause only against this guideline. If the guideline does not address what the
clause covers, say so in the notes and judge the clause as compliant unless it plainly
conflicts with the guideline.

Clause:
{clause_text}

Guideline:
{guideline_text}

Return the clause text unchanged, the guideline you compared it against, whether the clause
is compliant, and notes explaining the verdict and any gaps.
"#;

/// Report system prompt.
pub const COMPLIANCE_REPORT_SYSTEM_PROMPT: &str = r#"
You are an expert compliance analyst. You write concise, factual compliance reports for
legal and procurement teams. You never invent findings that are not supported by the
clause-level results you are given.
"#;

/// Report user prompt. Inputs: `vendor_name`, `compliance_results`.
pub const COMPLIANCE_REPORT_USER_PROMPT: &str = r#"
Create a compliance report for the agreement with vendor: {vendor_name}

Clause-level compliance results (JSON):
{compliance_results}

The contract is compliant overall only if every clause is compliant. Results whose notes
start with "Error processing clause" could not be evaluated; treat them as open risks.
Summarize the compliance position and list the key findings, most serious first.
"#;

/// A role-tagged prompt with named placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub messages: &'static [(Role, &'static str)],
}

pub const CONTRACT_EXTRACT: PromptTemplate = PromptTemplate {
    name: "contract_extract",
    messages: &[(Role::User, CONTRACT_EXTRACT_PROMPT)],
};

pub const CONTRACT_MATCH: PromptTemplate = PromptTemplate {
    name: "contract_match",
    messages: &[(Role::User, CONTRACT_MATCH_PROMPT)],
};

pub const COMPLIANCE_REPORT: PromptTemplate = PromptTemplate {
    name: "compliance_report",
    messages: &[
        (Role::System, COMPLIANCE_REPORT_SYSTEM_PROMPT),
        (Role::User, COMPLIANCE_REPORT_USER_PROMPT),
    ],
};

impl PromptTemplate {
    /// Placeholder names, in order of first appearance.
    pub fn variables(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for (_, text) in self.messages {
            for caps in PLACEHOLDER.captures_iter(text) {
                if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                    if !seen.contains(&name) {
                        seen.push(name);
                    }
                }
            }
        }
        seen
    }

    /// Substitute every placeholder. Fails if any has no input.
    ///
    /// Substitution is single-pass: braces inside input values are left alone.
    pub fn format(&self, inputs: &PromptInputs) -> Result<Vec<ChatMessage>, JudgeError> {
        if let Some(missing) = self.variables().into_iter().find(|v| !inputs.contains(v)) {
            return Err(JudgeError::MissingVariable {
                template: self.name,
                name: missing.to_string(),
            });
        }

        Ok(self
            .messages
            .iter()
            .map(|(role, text)| {
                let content = PLACEHOLDER.replace_all(text.trim(), |caps: &Captures| {
                    inputs.get(&caps[1]).unwrap_or_default().to_string()
                });
                ChatMessage {
                    role: *role,
                    content: content.into_owned(),
                }
            })
            .collect())
    }
}

/// Named inputs for a prompt template.
#[derive(Debug, Clone, Default)]
pub struct PromptInputs {
    values: BTreeMap<String, String>,
}

impl PromptInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}
