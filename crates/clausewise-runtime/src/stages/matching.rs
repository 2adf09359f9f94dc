//! Clause-by-clause guideline matching.

use std::sync::Arc;

use backon::{ConstantBuilder, Retryable};
use futures::stream::{self, StreamExt};

use clausewise_core::{ClauseComplianceCheck, ContractClause, GuidelineMatch};

use super::render;
use crate::config::MatchingPolicy;
use crate::error::error_chain;
use crate::events::EventSink;
use crate::judge::prompts::CONTRACT_MATCH;
use crate::judge::{structured_predict, JudgeError, PromptInputs, StructuredJudge};
use crate::retrieval::GuidelineRetriever;

/// Judges each clause against its best-matching guideline.
///
/// Never fails as a whole. A clause whose retrieval errors or whose judge
/// attempts are exhausted becomes a failed record; a clause with no
/// guideline candidates produces no record at all. Output order follows
/// clause order regardless of `concurrency`.
#[derive(Clone)]
pub struct MatchingStage {
    judge: Arc<dyn StructuredJudge>,
    retriever: Arc<dyn GuidelineRetriever>,
    policy: MatchingPolicy,
}

impl MatchingStage {
    pub fn new(
        judge: Arc<dyn StructuredJudge>,
        retriever: Arc<dyn GuidelineRetriever>,
        policy: MatchingPolicy,
    ) -> Self {
        Self {
            judge,
            retriever,
            policy,
        }
    }

    pub async fn run(
        &self,
        clauses: &[ContractClause],
        events: &EventSink,
    ) -> Vec<ClauseComplianceCheck> {
        tracing::info!(
            clauses = clauses.len(),
            concurrency = self.policy.concurrency,
            "Matching clauses"
        );
        events.progress(">> Matching clauses against guidelines");

        // Collected eagerly: a borrowing `map` closure inside the stream
        // fails the higher-ranked `Send` check under `tokio::spawn`.
        let pending: Vec<_> = clauses
            .iter()
            .enumerate()
            .map(|(index, clause)| self.match_clause(index, clause, events))
            .collect();
        let results: Vec<Option<ClauseComplianceCheck>> = stream::iter(pending)
            .buffered(self.policy.concurrency.max(1))
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }

    async fn match_clause(
        &self,
        index: usize,
        clause: &ContractClause,
        events: &EventSink,
    ) -> Option<ClauseComplianceCheck> {
        let passages = match self.retriever.retrieve(&clause.clause_text).await {
            Ok(passages) => passages,
            Err(e) => return Some(self.failed(index, clause, &e, events)),
        };

        let Some(top) = passages.first() else {
            tracing::warn!(clause = index, "No guideline candidates, clause skipped");
            return None;
        };

        let inputs = PromptInputs::new()
            .with("clause_text", clause.clause_text.as_str())
            .with("guideline_text", top.text.as_str());

        match self.judge_with_retry(index, &inputs, events).await {
            Ok(mut check) => {
                check.clause_text = clause.clause_text.clone();
                if check.matched_guideline.is_none() {
                    check.matched_guideline = Some(GuidelineMatch::from(top));
                }
                events.progress(format!(">> Clause matched: {}", render(&check)));
                Some(check)
            }
            Err(e) => Some(self.failed(index, clause, &e, events)),
        }
    }

    async fn judge_with_retry(
        &self,
        index: usize,
        inputs: &PromptInputs,
        events: &EventSink,
    ) -> Result<ClauseComplianceCheck, JudgeError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let backoff = ConstantBuilder::default()
            .with_delay(self.policy.backoff)
            .with_max_times(max_attempts as usize - 1);
        let mut retries = 0u32;

        (|| structured_predict::<ClauseComplianceCheck>(self.judge.as_ref(), &CONTRACT_MATCH, inputs))
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|err: &JudgeError, delay| {
                retries += 1;
                tracing::warn!(
                    clause = index,
                    attempt = retries,
                    max_attempts,
                    delay = ?delay,
                    error = %err,
                    "Clause match failed, retrying"
                );
                events.progress(format!(
                    ">> Retry {}/{} for clause: {}",
                    retries, max_attempts, err
                ));
            })
            .await
    }

    fn failed(
        &self,
        index: usize,
        clause: &ContractClause,
        err: &dyn std::error::Error,
        events: &EventSink,
    ) -> ClauseComplianceCheck {
        let reason = error_chain(err);
        tracing::error!(clause = index, error = %reason, "Clause processing failed");
        events.progress(format!(">> Error processing clause: {}", reason));
        ClauseComplianceCheck::failed(clause.clause_text.clone(), reason)
    }
}
