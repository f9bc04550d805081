//! Lexigraph CLI - ask questions of a weighted fact graph

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod console;
mod output;
mod suggest;

use commands::{ask, completions, entity, io, query};
use config::{config_file_path, Config};
use lexigraph_core::QueryContext;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "lexigraph")]
#[command(author, version, about = "Answer questions from a weighted subject-verb-object fact graph")]
pub struct Cli {
    /// Output format (defaults to the config file's output_format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Maximum answer lines per question
    #[arg(short, long, global = true)]
    pub budget: Option<usize>,

    /// Config file to use instead of the default location
    #[arg(long, env = "LEXIGRAPH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Abort on the first malformed fact instead of skipping it
    #[arg(long, global = true)]
    pub strict: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        config_file_path(self.config.as_deref())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask one question
    Ask(ask::AskArgs),
    /// Answer questions interactively until "end"
    Repl(ask::ReplArgs),
    /// Run a structured query
    Query(query::QueryArgs),
    /// Show what the graph knows about one entity
    Entity(entity::EntityArgs),
    /// Show graph statistics
    Stats(entity::StatsArgs),
    /// Re-emit the loaded facts
    Export(io::ExportArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Settings resolved from the config file and command line flags
pub struct AppContext {
    pub config: Config,
    pub format: OutputFormat,
    pub budget: usize,
    pub strict: bool,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let path = cli.config_path();
        tracing::debug!("Using config file at: {:?}", path);
        let config = Config::load(&path)?;

        Ok(Self {
            format: cli.format.unwrap_or(config.output_format),
            budget: cli.budget.unwrap_or(config.default_budget),
            strict: cli.strict,
            config,
        })
    }

    /// Fresh query state carrying the configured knobs
    pub fn query_context(&self) -> anyhow::Result<QueryContext> {
        Ok(QueryContext::new()
            .with_threshold(self.config.similarity_threshold)?
            .with_max_depth(self.config.max_depth)?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting lexigraph CLI");

    match &cli.command {
        Commands::Config(args) => return commands::config::run(args, &cli),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let ctx = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Ask(args) => ask::run(args, &ctx)?,
        Commands::Repl(args) => ask::run_repl(args, &ctx)?,
        Commands::Query(args) => query::run(args, &ctx)?,
        Commands::Entity(args) => entity::run(args, &ctx)?,
        Commands::Stats(args) => entity::run_stats(args, &ctx)?,
        Commands::Export(args) => io::run_export(args, &ctx)?,
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}
