//! In-process BM25 retriever over a directory of guideline documents.
//!
//! Documents are split into paragraph passages; a heading-only paragraph is
//! folded into the paragraph after it so that a bare title never wins a match.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{GuidelinePassage, GuidelineRetriever, RetrievalError};
use crate::documents::{DirectoryLoader, Document, DocumentLoader};

const K1: f64 = 1.5;
const B: f64 = 0.75;

lazy_static! {
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n[ \t]*\n").expect("Invalid regex");
    static ref TOKEN: Regex = Regex::new(r"[a-z0-9]+").expect("Invalid regex");
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
    "its", "of", "on", "or", "shall", "such", "that", "the", "this", "to", "which", "with",
];

fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn split_passages(text: &str) -> Vec<String> {
    let mut passages = Vec::new();
    let mut pending_heading: Option<String> = None;

    for para in PARAGRAPH_BREAK.split(text) {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        if para.starts_with('#') && !para.contains('\n') {
            pending_heading = Some(match pending_heading.take() {
                Some(prev) => format!("{}\n{}", prev, para),
                None => para.to_string(),
            });
            continue;
        }
        match pending_heading.take() {
            Some(heading) => passages.push(format!("{}\n{}", heading, para)),
            None => passages.push(para.to_string()),
        }
    }
    if let Some(heading) = pending_heading {
        passages.push(heading);
    }
    passages
}

struct IndexedPassage {
    text: String,
    source: Option<String>,
    term_freq: HashMap<String, u32>,
    len: usize,
}

/// BM25 ranking over paragraph passages.
pub struct LexicalRetriever {
    passages: Vec<IndexedPassage>,
    doc_freq: HashMap<String, u32>,
    avg_len: f64,
    top_k: usize,
}

impl LexicalRetriever {
    /// Index the given documents.
    pub fn from_documents(documents: &[Document], top_k: usize) -> Self {
        let mut passages = Vec::new();
        let mut doc_freq: HashMap<String, u32> = HashMap::new();

        for doc in documents {
            let source = doc.metadata.get("file_name").cloned();
            for text in split_passages(&doc.text) {
                let tokens = tokenize(&text);
                let mut term_freq: HashMap<String, u32> = HashMap::new();
                for token in &tokens {
                    *term_freq.entry(token.clone()).or_default() += 1;
                }
                for term in term_freq.keys() {
                    *doc_freq.entry(term.clone()).or_default() += 1;
                }
                passages.push(IndexedPassage {
                    text,
                    source: source.clone(),
                    term_freq,
                    len: tokens.len(),
                });
            }
        }

        let avg_len = if passages.is_empty() {
            0.0
        } else {
            passages.iter().map(|p| p.len).sum::<usize>() as f64 / passages.len() as f64
        };

        tracing::info!(
            documents = documents.len(),
            passages = passages.len(),
            "Guideline index built"
        );

        Self {
            passages,
            doc_freq,
            avg_len,
            top_k,
        }
    }

    /// Load and index every text file in `dir`.
    pub async fn from_directory(dir: &Path, top_k: usize) -> Result<Self, RetrievalError> {
        if !dir.is_dir() {
            return Err(RetrievalError::MissingSource(dir.to_path_buf()));
        }
        let documents = DirectoryLoader.load(dir).await?;
        Ok(Self::from_documents(&documents, top_k))
    }

    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.passages.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, passage: &IndexedPassage, query_terms: &[String]) -> f64 {
        let norm = if self.avg_len > 0.0 {
            1.0 - B + B * passage.len as f64 / self.avg_len
        } else {
            1.0
        };
        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *passage.term_freq.get(term)? as f64;
                Some(self.idf(term) * tf * (K1 + 1.0) / (tf + K1 * norm))
            })
            .sum()
    }

    /// Rank passages for `query`. Only passages sharing a term are returned.
    pub fn rank(&self, query: &str) -> Vec<GuidelinePassage> {
        let mut query_terms = tokenize(query);
        query_terms.sort();
        query_terms.dedup();

        let mut scored: Vec<(usize, f64)> = self
            .passages
            .iter()
            .enumerate()
            .map(|(i, p)| (i, self.score(p, &query_terms)))
            .filter(|(_, s)| *s > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(self.top_k)
            .map(|(i, score)| GuidelinePassage {
                text: self.passages[i].text.clone(),
                score: Some(score),
                source: self.passages[i].source.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl GuidelineRetriever for LexicalRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<GuidelinePassage>, RetrievalError> {
        Ok(self.rank(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{temp_dir, FixtureDir};

    const GDPR_EXCERPT: &str = "# Article 28 Processor

Processing by a processor shall be governed by a contract that sets out the subject-matter and duration of the processing.

# Article 32 Security of processing

The controller and the processor shall implement appropriate technical and organisational measures, including encryption of personal data.

# Article 44 General principle for transfers

Any transfer of personal data to a third country shall take place only if the conditions laid down in this Chapter are complied with.";

    fn retriever(top_k: usize) -> LexicalRetriever {
        let doc = Document::new(GDPR_EXCERPT).with_metadata("file_name", "gdpr.md");
        LexicalRetriever::from_documents(&[doc], top_k)
    }

    #[test]
    fn test_headings_fold_into_passages() {
        let passages = split_passages(GDPR_EXCERPT);
        assert_eq!(passages.len(), 3);
        assert!(passages[1].starts_with("# Article 32 Security of processing\nThe controller"));
    }

    #[test]
    fn test_tokenize_drops_stopwords() {
        assert_eq!(
            tokenize("The Transfer of DATA to a third-country"),
            vec!["transfer", "data", "third", "country"]
        );
    }

    #[tokio::test]
    async fn test_best_match_first() {
        let results = retriever(20)
            .retrieve("Vendor may transfer customer data to a third country")
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert!(results[0].text.contains("Article 44"));
        assert_eq!(results[0].source.as_deref(), Some("gdpr.md"));
        let scores: Vec<f64> = results.iter().filter_map(|p| p.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_encryption_matches_security_article() {
        let results = retriever(20)
            .retrieve("All data is protected with encryption at rest")
            .await
            .unwrap();
        assert!(results[0].text.contains("Article 32"));
    }

    #[tokio::test]
    async fn test_no_shared_terms_is_empty() {
        let results = retriever(20).retrieve("Invoices are payable in euros").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_limit() {
        let results = retriever(1).retrieve("processor personal data").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = temp_dir("lexical-missing");
        let result = LexicalRetriever::from_directory(&dir.path().join("guidelines"), 5).await;
        assert!(matches!(result, Err(RetrievalError::MissingSource(_))));
    }

    #[tokio::test]
    async fn test_from_directory() {
        let dir = temp_dir("lexical-dir");
        dir.write("gdpr.md", GDPR_EXCERPT);
        let retriever = LexicalRetriever::from_directory(dir.path(), 5).await.unwrap();
        assert_eq!(retriever.passage_count(), 3);
    }
}
