//! Guideline retrieval.
//!
//! A [`GuidelineRetriever`] returns candidate guideline passages for a query,
//! best match first. The matching stage only ever looks at the first one.

mod lexical;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use clausewise_core::GuidelineMatch;

use crate::documents::LoaderError;

pub use lexical::LexicalRetriever;

/// Errors from guideline retrieval.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Guidelines not found at {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to load guidelines: {0}")]
    Loader(#[from] LoaderError),

    #[error("Retrieval backend failed: {0}")]
    Backend(String),
}

/// A candidate guideline passage. Rank is its position in the result list.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidelinePassage {
    pub text: String,

    /// Backend relevance score, higher is better
    pub score: Option<f64>,

    /// Where the passage came from (file name, index id)
    pub source: Option<String>,
}

impl GuidelinePassage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
            source: None,
        }
    }
}

impl From<&GuidelinePassage> for GuidelineMatch {
    fn from(passage: &GuidelinePassage) -> Self {
        GuidelineMatch {
            guideline_text: passage.text.clone(),
            similarity_score: passage.score,
            relevance_explanation: None,
        }
    }
}

/// Returns guideline passages relevant to a query, most relevant first.
#[async_trait]
pub trait GuidelineRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<GuidelinePassage>, RetrievalError>;
}
