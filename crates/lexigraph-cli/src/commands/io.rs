//! Loading fact files and exporting them again

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::output::{format_json, OutputFormat};
use crate::AppContext;
use lexigraph_core::{parse_facts, Fact, Graph};

#[derive(Args)]
pub struct ExportArgs {
    /// Fact file (CSV)
    pub facts: PathBuf,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Read and parse a fact file.
///
/// Malformed lines are logged and skipped; with `strict` the first one
/// aborts the load.
pub fn load_facts(path: &Path, strict: bool) -> anyhow::Result<Vec<Fact>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fact file {}", path.display()))?;

    let (facts, errors) = parse_facts(&content);
    if strict {
        if let Some(first) = errors.into_iter().next() {
            return Err(first).with_context(|| format!("Invalid fact file {}", path.display()));
        }
    } else {
        for e in &errors {
            tracing::warn!("{}: {}", path.display(), e);
        }
    }

    tracing::info!("Read {} facts from {:?}", facts.len(), path);
    Ok(facts)
}

/// Build a graph from already parsed facts.
pub fn build_graph(facts: &[Fact], strict: bool) -> anyhow::Result<Graph> {
    let mut graph = Graph::new();
    for (i, fact) in facts.iter().enumerate() {
        if let Err(e) = graph.insert_fact(fact) {
            if strict {
                return Err(e).with_context(|| format!("Failed to insert fact #{}", i + 1));
            }
            tracing::warn!("Skipping fact #{}: {}", i + 1, e);
        }
    }

    let stats = graph.stats();
    tracing::debug!(
        "Graph ready: {} entities, {} verbs, {} descriptors",
        stats.entities,
        stats.verbs,
        stats.descriptors
    );
    Ok(graph)
}

pub fn load_graph(path: &Path, ctx: &AppContext) -> anyhow::Result<Graph> {
    let facts = load_facts(path, ctx.strict)?;
    build_graph(&facts, ctx.strict)
}

pub fn run_export(args: &ExportArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let facts = load_facts(&args.facts, ctx.strict)?;

    let rendered = match ctx.format {
        OutputFormat::Json => format_json(&facts),
        OutputFormat::Text => facts
            .iter()
            .map(Fact::to_csv_line)
            .collect::<Vec<_>>()
            .join("\n"),
    };

    match &args.output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writeln!(file, "{}", rendered)?;
            eprintln!("Exported {} facts to {}", facts.len(), path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
