//! `context-finder` — a thin command-line caller over [`context_protocol::LocalCore`].
//!
//! One subcommand per [`context_protocol::CoreOperations`] method. No
//! daemon, no RPC: each invocation opens the project's index fresh and
//! talks straight to `context-indexer`/`context-search`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use context_indexer::SearchMode;
use context_protocol::{models, CoreOperations, LocalCore};
use context_vector_store::Embedder;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "context-finder", version, about = "Semantic + full-text search over a codebase")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Project root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Emit machine-readable JSON instead of a human-readable summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSearchMode {
    Hybrid,
    Vector,
    Fts,
}

impl From<CliSearchMode> for SearchMode {
    fn from(mode: CliSearchMode) -> Self {
        match mode {
            CliSearchMode::Hybrid => SearchMode::Hybrid,
            CliSearchMode::Vector => SearchMode::Vector,
            CliSearchMode::Fts => SearchMode::Fts,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build an index from scratch for this project
    CreateIndex {
        /// Skip the confirmation prompt normally required for a full (re)build
        #[arg(long)]
        yes: bool,
    },
    /// Search code chunks
    SearchCode {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, value_enum, default_value_t = CliSearchMode::Hybrid)]
        mode: CliSearchMode,
        #[arg(long, default_value_t = 0.5)]
        alpha: f32,
        /// Truncate result text and omit per-result metadata
        #[arg(long)]
        compact: bool,
    },
    /// Search documentation/prose chunks
    SearchDocs {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, value_enum, default_value_t = CliSearchMode::Hybrid)]
        mode: CliSearchMode,
        #[arg(long, default_value_t = 0.5)]
        alpha: f32,
        #[arg(long)]
        compact: bool,
    },
    /// List file paths matching a glob pattern
    SearchByPath {
        pattern: String,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Report whether this project has an index and its current stats
    GetIndexStatus,
    /// Summarize a single file's functions/classes
    GetFileSummary {
        path: String,
        #[arg(long)]
        no_complexity: bool,
        #[arg(long)]
        no_docstrings: bool,
    },
    /// Print the effective `config.json`
    GetConfig,
    /// Rebuild the whole index from scratch
    ReindexProject {
        #[arg(long)]
        yes: bool,
    },
    /// Reindex a single file incrementally
    ReindexFile { path: String },
    /// Delete the project's index and config
    DeleteIndex {
        #[arg(long)]
        yes: bool,
    },
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = root.map_or_else(|| std::env::current_dir().context("could not determine current directory"), Ok)?;
    root.canonicalize().with_context(|| format!("{} does not exist", root.display()))
}

fn print_result<T: serde::Serialize + std::fmt::Debug>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{value:#?}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let root = resolve_root(cli.root)?;

    let model_dir = models::resolve_model_dir();
    let (code_config, docs_config) = models::default_embedder_configs(&model_dir);
    let code_embedder = Arc::new(Embedder::new(code_config));
    let docs_embedder = Arc::new(Embedder::new(docs_config));

    let core = LocalCore::open(&root, code_embedder, docs_embedder).await?;

    match cli.command {
        Command::CreateIndex { yes } => {
            let stats = core.create_index(core.project_root(), yes).await?;
            print_result(&stats, cli.json)?;
        }
        Command::SearchCode { query, top_k, mode, alpha, compact } => {
            let response = core.search_code(&query, top_k, mode.into(), alpha, compact).await?;
            print_result(&response, cli.json)?;
        }
        Command::SearchDocs { query, top_k, mode, alpha, compact } => {
            let response = core.search_docs(&query, top_k, mode.into(), alpha, compact).await?;
            print_result(&response, cli.json)?;
        }
        Command::SearchByPath { pattern, limit } => {
            let paths = core.search_by_path(&pattern, limit).await?;
            print_result(&paths, cli.json)?;
        }
        Command::GetIndexStatus => {
            let status = core.get_index_status().await?;
            print_result(&status, cli.json)?;
        }
        Command::GetFileSummary { path, no_complexity, no_docstrings } => {
            let summary = core.get_file_summary(&path, !no_complexity, !no_docstrings).await?;
            print_result(&summary, cli.json)?;
        }
        Command::GetConfig => {
            let config = core.get_config().await?;
            print_result(&config, cli.json)?;
        }
        Command::ReindexProject { yes } => {
            let stats = core.reindex_project(yes).await?;
            print_result(&stats, cli.json)?;
        }
        Command::ReindexFile { path } => {
            let stats = core.reindex_file(&path).await?;
            print_result(&stats, cli.json)?;
        }
        Command::DeleteIndex { yes } => {
            let result = core.delete_index(yes).await?;
            print_result(&result, cli.json)?;
        }
    }

    Ok(())
}
