//! Entity inspection and graph statistics

use std::path::PathBuf;

use clap::Args;

use crate::commands::io::load_graph;
use crate::output::{print_stats, print_summary};
use crate::AppContext;
use lexigraph_core::UNSPECIFIED_ID;

#[derive(Args)]
pub struct EntityArgs {
    /// Fact file (CSV)
    pub facts: PathBuf,

    /// Entity name
    pub name: String,

    /// Entity id (any id when omitted)
    #[arg(long, default_value_t = UNSPECIFIED_ID, allow_hyphen_values = true)]
    pub id: i64,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Fact file (CSV)
    pub facts: PathBuf,
}

pub fn run(args: &EntityArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let graph = load_graph(&args.facts, ctx)?;
    let entity = graph.require_entity(&args.name, args.id)?;
    print_summary(&graph.summary(entity), ctx.format);
    Ok(())
}

pub fn run_stats(args: &StatsArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let graph = load_graph(&args.facts, ctx)?;
    print_stats(&graph.stats(), ctx.format);
    Ok(())
}
