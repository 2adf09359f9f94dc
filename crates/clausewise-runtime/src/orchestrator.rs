//! Review orchestrator.
//!
//! A run is a strict sequence of stages driven by an explicit state machine:
//!
//! ```text
//! Created -> Extracting -> Matching -> Reporting -> Completed
//!     \__________\____________\___________\______-> Failed
//! ```
//!
//! Only extraction and report failures (plus a run timeout) reach `Failed`;
//! matching absorbs its failures per clause.
//!
//! [`Workflow::run`] spawns the pipeline and returns a [`ReviewHandle`]. Callers
//! either stream events until the terminal `Stop`, or await the handle for
//! the [`ReviewOutcome`]. Both may be combined.

use std::future::IntoFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use clausewise_core::{ClauseComplianceCheck, ComplianceReport, ContractExtraction};

use crate::cache::ExtractionCache;
use crate::config::{MatchingPolicy, ReviewConfig};
use crate::documents::{loader_for, DocumentLoader, FileLoader};
use crate::error::{error_chain, ReviewError};
use crate::events::{EventSink, WorkflowEvent};
use crate::judge::StructuredJudge;
use crate::retrieval::GuidelineRetriever;
use crate::stages::{ExtractionStage, MatchingStage, ReportStage};
use crate::usage::LlmUsage;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Created,
    Extracting,
    Matching,
    Reporting,
    Completed,
    Failed,
}

/// What just happened, as input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Start,
    Extracted,
    Matched,
    Reported,
    Fail,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    /// The transition table.
    pub fn next(self, step: StepKind) -> Result<PipelineState, ReviewError> {
        use PipelineState::*;
        match (self, step) {
            (Created, StepKind::Start) => Ok(Extracting),
            (Extracting, StepKind::Extracted) => Ok(Matching),
            (Matching, StepKind::Matched) => Ok(Reporting),
            (Reporting, StepKind::Reported) => Ok(Completed),
            (state, StepKind::Fail) if !state.is_terminal() => Ok(Failed),
            (from, step) => Err(ReviewError::InvalidTransition { from, step }),
        }
    }
}

struct StateMachine {
    state: PipelineState,
    tx: watch::Sender<PipelineState>,
}

impl StateMachine {
    fn new(tx: watch::Sender<PipelineState>) -> Self {
        Self {
            state: PipelineState::Created,
            tx,
        }
    }

    fn advance(&mut self, step: StepKind) -> Result<PipelineState, ReviewError> {
        let next = self.state.next(step)?;
        tracing::debug!(from = ?self.state, to = ?next, "State transition");
        self.state = next;
        self.tx.send_replace(next);
        Ok(next)
    }
}

/// Terminal value of a completed run.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub report: ComplianceReport,

    /// Every per-clause record, in clause order
    pub results: Vec<ClauseComplianceCheck>,

    pub extraction: ContractExtraction,

    pub usage: LlmUsage,
}

impl ReviewOutcome {
    pub fn non_compliant(&self) -> impl Iterator<Item = &ClauseComplianceCheck> {
        self.results.iter().filter(|r| !r.compliant)
    }
}

/// A configured review pipeline. Cheap to clone; each [`run`](Self::run) is
/// independent.
#[derive(Clone)]
pub struct Workflow {
    extraction: ExtractionStage,
    matching: MatchingStage,
    report: ReportStage,
    judge: Arc<dyn StructuredJudge>,
    cache_path: PathBuf,
    verbose: bool,
    run_timeout: Option<Duration>,
}

impl Workflow {
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// Start a review of the contract at `contract_path`.
    ///
    /// Must be called from within a tokio runtime. Fails immediately with
    /// [`ReviewError::MissingSource`] if the contract does not exist.
    pub fn run(&self, contract_path: impl AsRef<Path>) -> Result<ReviewHandle, ReviewError> {
        let contract_path = contract_path.as_ref().to_path_buf();
        if !contract_path.exists() {
            tracing::error!(path = %contract_path.display(), "Contract not found");
            return Err(ReviewError::MissingSource(contract_path));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PipelineState::Created);
        let events = EventSink::new(tx, self.verbose);
        let workflow = self.clone();

        let task = tokio::spawn(async move { workflow.drive(contract_path, events, state_tx).await });

        Ok(ReviewHandle {
            events: rx,
            state: state_rx,
            task,
        })
    }

    async fn drive(
        self,
        contract_path: PathBuf,
        events: EventSink,
        state_tx: watch::Sender<PipelineState>,
    ) -> Result<ReviewOutcome, ReviewError> {
        let mut machine = StateMachine::new(state_tx);
        tracing::info!(contract = %contract_path.display(), "Review started");

        let pipeline = self.pipeline(&contract_path, &events, &mut machine);
        let result = match self.run_timeout {
            Some(limit) => tokio::time::timeout(limit, pipeline)
                .await
                .unwrap_or_else(|_| Err(ReviewError::Timeout(limit))),
            None => pipeline.await,
        };

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    results = outcome.results.len(),
                    non_compliant = outcome.non_compliant().count(),
                    llm_calls = outcome.usage.llm_calls,
                    "Review completed"
                );
                events.finish(WorkflowEvent::Stop(outcome.clone()));
            }
            Err(e) => {
                let message = error_chain(e);
                tracing::error!(state = ?machine.state, error = %message, "Review failed");
                if let Err(transition) = machine.advance(StepKind::Fail) {
                    tracing::error!(error = %transition, "Could not mark run failed");
                }
                events.finish(WorkflowEvent::Failed { message });
            }
        }
        result
    }

    async fn pipeline(
        &self,
        contract_path: &Path,
        events: &EventSink,
        machine: &mut StateMachine,
    ) -> Result<ReviewOutcome, ReviewError> {
        machine.advance(StepKind::Start)?;
        let extraction = self
            .extraction
            .extract(contract_path, &self.cache_path, events)
            .await?;

        machine.advance(StepKind::Extracted)?;
        let results = self.matching.run(&extraction.clauses, events).await;

        machine.advance(StepKind::Matched)?;
        let report = self
            .report
            .generate(extraction.vendor_name.as_deref(), &results, events)
            .await?;

        machine.advance(StepKind::Reported)?;
        Ok(ReviewOutcome {
            report,
            results,
            extraction,
            usage: self.judge.usage(),
        })
    }
}

/// Builder for [`Workflow`].
pub struct WorkflowBuilder {
    judge: Option<Arc<dyn StructuredJudge>>,
    retriever: Option<Arc<dyn GuidelineRetriever>>,
    loader: Arc<dyn DocumentLoader>,
    cache: ExtractionCache,
    policy: MatchingPolicy,
    cache_path: PathBuf,
    verbose: bool,
    run_timeout: Option<Duration>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        let defaults = ReviewConfig::default();
        Self {
            judge: None,
            retriever: None,
            loader: Arc::new(FileLoader),
            cache: ExtractionCache::default(),
            policy: defaults.matching.clone(),
            cache_path: defaults.extraction_cache_path(),
            verbose: defaults.verbose,
            run_timeout: defaults.run_timeout,
        }
    }

    pub fn judge(mut self, judge: Arc<dyn StructuredJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn GuidelineRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Take loader, matching policy, cache location, verbosity and timeout
    /// from `config`.
    pub fn config(mut self, config: &ReviewConfig) -> Self {
        self.loader = loader_for(config.loader);
        self.policy = config.matching.clone();
        self.cache_path = config.extraction_cache_path();
        self.verbose = config.verbose;
        self.run_timeout = config.run_timeout;
        self
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Share an extraction memo between workflows.
    pub fn cache(mut self, cache: ExtractionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<Workflow, ReviewError> {
        let judge = self
            .judge
            .ok_or_else(|| ReviewError::NotConfigured("No judge set".to_string()))?;
        let retriever = self
            .retriever
            .ok_or_else(|| ReviewError::NotConfigured("No guideline retriever set".to_string()))?;

        Ok(Workflow {
            extraction: ExtractionStage::new(judge.clone(), self.loader, self.cache),
            matching: MatchingStage::new(judge.clone(), retriever, self.policy),
            report: ReportStage::new(judge.clone()),
            judge,
            cache_path: self.cache_path,
            verbose: self.verbose,
            run_timeout: self.run_timeout,
        })
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running review.
///
/// The event stream is single pass. Awaiting the handle yields the run's
/// result whether or not events were consumed.
pub struct ReviewHandle {
    events: mpsc::UnboundedReceiver<WorkflowEvent>,
    state: watch::Receiver<PipelineState>,
    task: JoinHandle<Result<ReviewOutcome, ReviewError>>,
}

impl ReviewHandle {
    /// Next event, or `None` once the run has ended and the stream is drained.
    pub async fn next_event(&mut self) -> Option<WorkflowEvent> {
        self.events.recv().await
    }

    pub fn stream_events(&mut self) -> impl Stream<Item = WorkflowEvent> + '_ {
        futures::stream::poll_fn(move |cx| self.events.poll_recv(cx))
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }
}

impl IntoFuture for ReviewHandle {
    type Output = Result<ReviewOutcome, ReviewError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            match self.task.await {
                Ok(result) => result,
                Err(e) => Err(ReviewError::Aborted(e.to_string())),
            }
        })
    }
}
