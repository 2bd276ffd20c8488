//! Command-line interface for factcheck.
//!
//! Provides commands for checking text, managing the evidence index,
//! checking the reasoning service and showing configuration.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{self, paths, ResolvedConfig};
use crate::core::Orchestrator;

/// factcheck - verify claims against a curated fact corpus
#[derive(Parser, Debug)]
#[command(name = "factcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `check` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fact-check text (prompts interactively when no input is given)
    Check(CheckArgs),

    /// Manage the evidence index
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },

    /// Check that the reasoning service can be reached
    Health,

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Text to check
    #[arg(short, long, conflicts_with = "input")]
    pub text: Option<String>,

    /// Read text from a file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Number of evidence facts to retrieve per claim
    #[arg(short = 'k', long = "evidence")]
    pub k: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommands {
    /// Rebuild the index snapshot from the fact corpus
    Build,

    /// Search the persisted index
    Search {
        /// Query text
        query: String,

        /// Number of hits to show
        #[arg(short = 'k', long = "evidence")]
        k: Option<usize>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command.unwrap_or(Commands::Check(CheckArgs::default())) {
            Commands::Check(args) => check_text(args).await,
            Commands::Index { command } => match command {
                IndexCommands::Build => build_index().await,
                IndexCommands::Search { query, k } => search_index(&query, k).await,
            },
            Commands::Health => health().await,
            Commands::Config => show_config().await,
        }
    }
}

fn orchestrator(cfg: &ResolvedConfig) -> Result<Orchestrator> {
    Orchestrator::from_config(cfg).context("Failed to initialize pipeline")
}

/// Print a prompt on stderr and read one trimmed line from stdin
fn prompt_line(prompt: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt).context("Failed to write prompt")?;
    stderr.flush().context("Failed to write prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn parse_k(raw: &str) -> Result<usize> {
    let k: usize = raw
        .parse()
        .with_context(|| format!("Invalid evidence count: {}", raw))?;
    if k == 0 {
        anyhow::bail!("Evidence count must be at least 1");
    }
    Ok(k)
}

/// Run the pipeline and print the report as JSON
async fn check_text(args: CheckArgs) -> Result<()> {
    let cfg = config::config()?;
    let stdin = io::stdin();

    let (text, k) = if let Some(text) = args.text {
        (text, args.k)
    } else if let Some(path) = args.input {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        (text, args.k)
    } else if !stdin.is_terminal() {
        // Piped input
        let mut buffer = String::new();
        stdin
            .lock()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        (buffer, args.k)
    } else {
        let text = prompt_line("Enter the text you want to fact-check:\n> ")?;
        if text.is_empty() {
            eprintln!("No text provided. Exiting.");
            std::process::exit(1);
        }

        let k = match args.k {
            Some(k) => Some(k),
            None => {
                let raw = prompt_line("Enter number of evidence facts to retrieve (default 3): ")?;
                if raw.is_empty() {
                    None
                } else {
                    Some(parse_k(&raw)?)
                }
            }
        };
        (text, k)
    };

    let text = text.trim();
    if text.is_empty() {
        eprintln!("No text provided. Exiting.");
        std::process::exit(1);
    }

    let k = k.unwrap_or(cfg.retrieval.k);
    let report = orchestrator(cfg)?.run(text, k).await?;

    println!("{}", report.to_json_pretty().context("Failed to serialize report")?);
    Ok(())
}

/// Rebuild the snapshot from the corpus
async fn build_index() -> Result<()> {
    let cfg = config::config()?;
    let count = orchestrator(cfg)?.rebuild_index().await?;

    eprintln!(
        "Indexed {} facts from {} into {}",
        count,
        paths::facts_csv()?.display(),
        paths::snapshot_dir()?.display()
    );
    Ok(())
}

/// Print scored hits from the persisted snapshot
async fn search_index(query: &str, k: Option<usize>) -> Result<()> {
    let cfg = config::config()?;
    let k = k.unwrap_or(cfg.retrieval.k);
    let hits = orchestrator(cfg)?.search(query, k).await?;

    if hits.is_empty() {
        eprintln!("No matches for '{}'", query);
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>2}. [{:.4}] #{} {}", rank + 1, hit.score, hit.fact.ordinal, hit.fact.text);
    }
    Ok(())
}

/// Check the reasoning service and report local state
async fn health() -> Result<()> {
    let cfg = config::config()?;
    let orchestrator = orchestrator(cfg)?;
    let service = orchestrator.completion();

    let mut healthy = true;

    match service.health_check().await {
        Ok(()) => println!("✓ Reasoning service '{}' available", service.name()),
        Err(e) => {
            healthy = false;
            println!("✗ {}", e);
        }
    }

    let facts = paths::facts_csv()?;
    if facts.exists() {
        println!("✓ Fact corpus: {}", facts.display());
    } else {
        healthy = false;
        println!("✗ Fact corpus missing: {}", facts.display());
    }

    let snapshot = paths::snapshot_paths()?;
    if snapshot.index.exists() && snapshot.metadata.exists() {
        println!("✓ Index snapshot: {}", snapshot.dir().display());
    } else {
        println!("- No index snapshot yet (built on first check)");
    }

    if !healthy {
        anyhow::bail!("Health check failed");
    }
    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;
    let snapshot = paths::snapshot_paths()?;

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("  factcheck Configuration");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:        {}", paths::factcheck_home()?.display());
    println!("  Facts:       {}", paths::facts_csv()?.display());
    println!("  Index:       {}", snapshot.index.display());
    println!("  Metadata:    {}", snapshot.metadata.display());
    println!();
    println!("Reasoning:");
    println!("  Program:     {}", cfg.reasoning.program);
    println!("  Model:       {}", cfg.reasoning.model);
    println!("  Timeout:     {}s", cfg.reasoning.timeout_seconds);
    println!();
    println!("Embedding:");
    println!("  Backend:     {}", cfg.embedding.backend.as_str());
    println!("  Model:       {}", cfg.embedding.model);
    println!("  URL:         {}", cfg.embedding.url);
    println!("  Dimension:   {}", cfg.embedding.dimension);
    println!();
    println!("Retrieval:");
    println!("  k:           {}", cfg.retrieval.k);
    println!("  Reuse index: {}", cfg.retrieval.reuse_snapshot);

    Ok(())
}
