//! Structured query command

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;

use crate::commands::io::load_graph;
use crate::console::ConsoleDisambiguator;
use crate::output::StdoutSink;
use crate::AppContext;
use lexigraph_core::{AnswerQuery, Disambiguator, FirstCandidate, QueryEngine, UNSPECIFIED_ID};

#[derive(Args)]
pub struct QueryArgs {
    /// Fact file (CSV)
    pub facts: PathBuf,

    /// Entity to start from
    pub entity: String,

    /// Entity id (any id when omitted)
    #[arg(long, default_value_t = UNSPECIFIED_ID, allow_hyphen_values = true)]
    pub id: i64,

    /// Follow only this verb
    #[arg(long)]
    pub verb: Option<String>,

    /// Follow only edges with this descriptor (needs --verb)
    #[arg(long, requires = "verb")]
    pub descriptor: Option<String>,

    /// Follow edges pointing at the entity instead of away from it
    #[arg(long)]
    pub incoming: bool,

    /// Never ask; take the closest entity and every subclass
    #[arg(long)]
    pub no_prompt: bool,

    /// Ignore facts that expired before this instant (RFC 3339)
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,
}

impl QueryArgs {
    fn to_query(&self, budget: usize) -> AnswerQuery {
        let mut query = AnswerQuery::new(&self.entity)
            .with_id(self.id)
            .with_budget(budget);
        if let Some(verb) = &self.verb {
            query = query.verb(verb);
        }
        if let Some(descriptor) = &self.descriptor {
            query = query.descriptor(descriptor);
        }
        if self.incoming {
            query = query.incoming();
        }
        if !self.no_prompt {
            query = query.interactive();
        }
        query
    }
}

pub fn run(args: &QueryArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let graph = load_graph(&args.facts, ctx)?;
    let mut qctx = ctx.query_context()?;
    if let Some(instant) = args.as_of {
        qctx = qctx.as_of(instant);
    }

    let query = args.to_query(ctx.budget);
    let mut sink = StdoutSink::new(ctx.format);

    let mut first = FirstCandidate;
    let mut console = ConsoleDisambiguator::new(std::io::stdin().lock(), std::io::stderr());
    let disambiguator: &mut dyn Disambiguator = if args.no_prompt {
        &mut first
    } else {
        &mut console
    };

    let emitted = QueryEngine::new(&graph, &mut qctx, disambiguator, &mut sink).execute(&query);
    sink.finish();

    if emitted == 0 {
        eprintln!("No answer found.");
    }
    tracing::info!("Query emitted {} of {} lines", emitted, ctx.budget);
    Ok(())
}
