//! Clausewise CLI
//!
//! Reviews a vendor contract against a directory of data-protection
//! guidelines and prints the compliance report.
//!
//! ```text
//! clausewise --contract-path data/vendor_agreement.md --verbose
//! ```
//!
//! Exits non-zero if the review fails.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing_subscriber::{fmt, EnvFilter};

use clausewise_runtime::{
    build_provider, CompletionConfig, LexicalRetriever, LlmJudge, ReviewConfig, ReviewOutcome,
    Workflow, WorkflowEvent,
};

const RULE_WIDTH: usize = 50;

/// Contract compliance review
#[derive(Parser)]
#[command(name = "clausewise")]
#[command(version)]
#[command(about = "Review a vendor contract against data-protection guidelines")]
struct Cli {
    /// Contract file to review
    #[arg(long, default_value = "data/vendor_agreement.md")]
    contract_path: PathBuf,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of guideline documents (overrides config)
    #[arg(long)]
    guidelines_dir: Option<PathBuf>,

    /// Output directory for the extraction cache (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %format!("{:#}", e), "Review failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ReviewConfig> {
    let mut config = match &cli.config {
        Some(path) => ReviewConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReviewConfig::default(),
    }
    .with_env_overrides()
    .context("Invalid environment configuration")?;

    if let Some(dir) = &cli.guidelines_dir {
        config.retrieval.guidelines_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if cli.quiet {
        config.verbose = false;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        "Using LLM"
    );

    let provider = build_provider(&config.llm).context("Failed to set up LLM provider")?;
    let judge = Arc::new(LlmJudge::new(
        provider,
        CompletionConfig::from_settings(&config.llm),
    ));
    let retriever = LexicalRetriever::from_directory(
        &config.retrieval.guidelines_dir,
        config.retrieval.similarity_top_k,
    )
    .await
    .context("Failed to index guidelines")?;
    tracing::info!(
        dir = %config.retrieval.guidelines_dir.display(),
        passages = retriever.passage_count(),
        "Guidelines indexed"
    );

    let workflow = Workflow::builder()
        .judge(judge)
        .retriever(Arc::new(retriever))
        .config(&config)
        .build()?;

    let mut handle = workflow
        .run(&cli.contract_path)
        .with_context(|| format!("Cannot review {}", cli.contract_path.display()))?;

    let mut stdout = std::io::stdout();
    let mut events = handle.stream_events();
    while let Some(event) = events.next().await {
        match event {
            WorkflowEvent::Progress(progress) if progress.delta => {
                print!("{}", progress);
                stdout.flush()?;
            }
            WorkflowEvent::Progress(progress) => println!("{}", progress),
            WorkflowEvent::Stop(_) | WorkflowEvent::Failed { .. } => break,
        }
    }
    drop(events);

    let outcome = handle.await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &ReviewOutcome) {
    let rule = "=".repeat(RULE_WIDTH);

    println!("\nCompliance Report:");
    println!("{}", rule);
    println!("{}", outcome.report);

    let mut non_compliant = outcome.non_compliant().peekable();
    if non_compliant.peek().is_none() {
        return;
    }

    println!("\nNon-Compliant Clauses:");
    println!("{}", rule);
    for result in non_compliant {
        println!("\nClause: {}", result.clause_text);
        let flags = outcome
            .extraction
            .clauses
            .iter()
            .find(|c| c.clause_text == result.clause_text)
            .map(|c| c.active_flags())
            .unwrap_or_default();
        if !flags.is_empty() {
            println!("Flags: {}", flags.join(", "));
        }
        if let Some(guideline) = result.guideline_text() {
            println!("Guideline: {}", guideline);
        }
        println!("Notes: {}", result.notes.as_deref().unwrap_or("-"));
    }
}
