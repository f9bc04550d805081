//! Natural question commands: one-shot `ask` and the `repl` loop

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Args;

use crate::commands::io::load_graph;
use crate::console::ConsoleDisambiguator;
use crate::output::StdoutSink;
use crate::suggest::suggest_verbs;
use crate::AppContext;
use lexigraph_core::text::eq_ignore_case;
use lexigraph_core::{
    recognize, Disambiguator, FirstCandidate, Graph, QueryContext, QueryEngine,
};

const PROMPT: &str = "How may I help you?";
const END_WORD: &str = "end";
const SUGGESTIONS: usize = 3;

#[derive(Args)]
pub struct AskArgs {
    /// Fact file (CSV)
    pub facts: PathBuf,

    /// Question, e.g. `cat is ?` or `? is mammal`
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub question: Vec<String>,

    /// Never ask; take the closest entity and every subclass
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(Args)]
pub struct ReplArgs {
    /// Fact file (CSV)
    pub facts: PathBuf,
}

/// Recognise `text` and answer it, returning the lines emitted.
///
/// Unrecognised questions are reported on stderr together with the
/// closest known verbs.
fn answer(
    graph: &Graph,
    qctx: &mut QueryContext,
    disambiguator: &mut dyn Disambiguator,
    text: &str,
    ctx: &AppContext,
) -> usize {
    let Some(question) = recognize(graph, text) else {
        eprintln!("Sorry, I did not understand {:?}.", text.trim());
        let suggestions = suggest_verbs(graph.verbs(), text, SUGGESTIONS);
        if !suggestions.is_empty() {
            eprintln!("Known verbs like it: {}", suggestions.join(", "));
        }
        return 0;
    };
    tracing::debug!("Recognised {:?}", question);

    let mut sink = StdoutSink::new(ctx.format);
    let emitted = QueryEngine::new(graph, qctx, disambiguator, &mut sink)
        .execute(&question.to_query(ctx.budget));
    sink.finish();

    if emitted == 0 {
        eprintln!("No answer found.");
    }
    emitted
}

pub fn run(args: &AskArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let graph = load_graph(&args.facts, ctx)?;
    let mut qctx = ctx.query_context()?;
    let text = args.question.join(" ");

    if args.no_prompt {
        answer(&graph, &mut qctx, &mut FirstCandidate, &text, ctx);
    } else {
        let mut console = ConsoleDisambiguator::new(std::io::stdin().lock(), std::io::stderr());
        answer(&graph, &mut qctx, &mut console, &text, ctx);
    }
    Ok(())
}

pub fn run_repl(args: &ReplArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let graph = load_graph(&args.facts, ctx)?;
    let mut qctx = ctx.query_context()?;
    let mut input = std::io::stdin().lock();

    loop {
        print!("{}\n\n", PROMPT);
        std::io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if eq_ignore_case(text, END_WORD) {
            break;
        }
        if text.is_empty() {
            continue;
        }

        // Choices are read from the same stream as questions.
        let mut console = ConsoleDisambiguator::new(&mut input, std::io::stderr());
        answer(&graph, &mut qctx, &mut console, text, ctx);
        println!();
    }

    tracing::info!("Session answered with {} lines in total", qctx.lines_emitted());
    Ok(())
}
