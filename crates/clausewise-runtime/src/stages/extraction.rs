//! Contract extraction, cache first.

use std::path::Path;
use std::sync::Arc;

use clausewise_core::ContractExtraction;

use super::render;
use crate::cache::ExtractionCache;
use crate::documents::{DocumentLoader, MetadataMode};
use crate::error::ReviewError;
use crate::events::EventSink;
use crate::judge::prompts::CONTRACT_EXTRACT;
use crate::judge::{structured_predict, PromptInputs, StructuredJudge};

/// Turns a contract into a [`ContractExtraction`], reusing a cached one when
/// present.
///
/// Extraction is never retried: a malformed answer points at a prompt or
/// schema problem, not a transient fault.
#[derive(Clone)]
pub struct ExtractionStage {
    judge: Arc<dyn StructuredJudge>,
    loader: Arc<dyn DocumentLoader>,
    cache: ExtractionCache,
}

impl ExtractionStage {
    pub fn new(
        judge: Arc<dyn StructuredJudge>,
        loader: Arc<dyn DocumentLoader>,
        cache: ExtractionCache,
    ) -> Self {
        Self {
            judge,
            loader,
            cache,
        }
    }

    pub async fn extract(
        &self,
        contract_path: &Path,
        cache_path: &Path,
        events: &EventSink,
    ) -> Result<ContractExtraction, ReviewError> {
        let extraction = match self.cache.load(cache_path).await? {
            Some(cached) => {
                tracing::info!(path = %cache_path.display(), "Using cached extraction");
                events.progress(">> Loading contract from cache");
                cached
            }
            None => {
                events.progress(">> Reading contract");
                let extraction = self.extract_fresh(contract_path).await?;
                self.cache.store(cache_path, &extraction).await?;
                extraction
            }
        };

        tracing::info!(
            clauses = extraction.clauses.len(),
            vendor = extraction.vendor_name.as_deref().unwrap_or("unknown"),
            "Contract extracted"
        );
        events.progress(format!(">> Contract data: {}", render(&extraction)));
        Ok(extraction)
    }

    async fn extract_fresh(&self, contract_path: &Path) -> Result<ContractExtraction, ReviewError> {
        let documents = self.loader.load(contract_path).await?;
        let contract_data = documents
            .iter()
            .map(|d| d.get_content(MetadataMode::All))
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!(
            documents = documents.len(),
            chars = contract_data.len(),
            "Requesting contract extraction"
        );

        let inputs = PromptInputs::new().with("contract_data", contract_data);
        structured_predict::<ContractExtraction>(self.judge.as_ref(), &CONTRACT_EXTRACT, &inputs)
            .await
            .map_err(|e| {
                if e.is_schema_mismatch() {
                    ReviewError::ExtractionSchemaMismatch(e)
                } else {
                    ReviewError::Judge(e)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::FileLoader;
    use crate::events::WorkflowEvent;
    use crate::test_support::{temp_dir, FixtureDir, ScriptedJudge};
    use clausewise_core::SchemaKind;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn extraction_json() -> serde_json::Value {
        json!({
            "vendor_name": "Acme Analytics",
            "clauses": [
                {"clause_text": "Clause1 mentions consent", "requires_consent": true},
                {"clause_text": "Clause2 mentions transfer", "mentions_data_transfer": true}
            ]
        })
    }

    fn stage(judge: Arc<ScriptedJudge>) -> ExtractionStage {
        ExtractionStage::new(judge, Arc::new(FileLoader), ExtractionCache::default())
    }

    #[tokio::test]
    async fn test_miss_calls_judge_and_writes_cache() {
        let dir = temp_dir("extract-miss");
        let contract = dir.write("vendor_agreement.md", "# Agreement\nVendor: Acme Analytics");
        let cache_path = dir.path().join("out/workflow_output/contract_extraction.json");
        let judge = Arc::new(ScriptedJudge::new().respond(extraction_json()));

        let extraction = stage(judge.clone())
            .extract(&contract, &cache_path, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(extraction.clauses.len(), 2);
        assert_eq!(judge.call_count(SchemaKind::ContractExtraction), 1);
        assert!(cache_path.is_file());

        let contract_data = judge.calls()[0].inputs.get("contract_data").unwrap().to_string();
        assert!(contract_data.contains("file_name: vendor_agreement.md"));
        assert!(contract_data.contains("Vendor: Acme Analytics"));
    }

    #[tokio::test]
    async fn test_second_run_is_cache_hit() {
        let dir = temp_dir("extract-hit");
        let contract = dir.write("vendor_agreement.md", "Vendor: Acme Analytics");
        let cache_path = dir.path().join("workflow_output/contract_extraction.json");

        let first_judge = Arc::new(ScriptedJudge::new().respond(extraction_json()));
        let first = stage(first_judge)
            .extract(&contract, &cache_path, &EventSink::disabled())
            .await
            .unwrap();

        // A fresh stage and cache: the hit must come from the file.
        let second_judge = Arc::new(ScriptedJudge::new());
        let second = stage(second_judge.clone())
            .extract(&contract, &cache_path, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(second_judge.calls().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_fatal_without_judge_call() {
        let dir = temp_dir("extract-corrupt");
        let contract = dir.write("vendor_agreement.md", "Vendor: Acme");
        let cache_path = dir.write(
            "workflow_output/contract_extraction.json",
            r#"{"clauses": [{"requires_consent": true}]}"#,
        );
        let judge = Arc::new(ScriptedJudge::new().respond(extraction_json()));

        let err = stage(judge.clone())
            .extract(&contract, &cache_path, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::CacheCorruption { .. }));
        assert!(judge.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_extraction_is_not_cached() {
        let dir = temp_dir("extract-invalid");
        let contract = dir.write("vendor_agreement.md", "Vendor: Acme");
        let cache_path = dir.path().join("workflow_output/contract_extraction.json");
        let judge = Arc::new(ScriptedJudge::new().respond(json!({"vendor_name": "Acme"})));

        let err = stage(judge.clone())
            .extract(&contract, &cache_path, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::ExtractionSchemaMismatch(_)));
        assert_eq!(judge.calls().len(), 1);
        assert!(!cache_path.exists());
    }

    #[tokio::test]
    async fn test_missing_contract() {
        let dir = temp_dir("extract-missing");
        let cache_path = dir.path().join("workflow_output/contract_extraction.json");
        let err = stage(Arc::new(ScriptedJudge::new()))
            .extract(&dir.path().join("absent.md"), &cache_path, &EventSink::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::MissingSource(_)));
    }

    #[tokio::test]
    async fn test_progress_events() {
        let dir = temp_dir("extract-events");
        let contract = dir.write("vendor_agreement.md", "Vendor: Acme");
        let cache_path = dir.path().join("workflow_output/contract_extraction.json");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let judge = Arc::new(ScriptedJudge::new().respond(extraction_json()));

        stage(judge)
            .extract(&contract, &cache_path, &EventSink::new(tx, true))
            .await
            .unwrap();

        let messages: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                WorkflowEvent::Progress(p) => Some(p.message),
                _ => None,
            })
            .collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ">> Reading contract");
        assert!(messages[1].starts_with(">> Contract data: {"));
        assert!(messages[1].contains("Acme Analytics"));
    }
}
