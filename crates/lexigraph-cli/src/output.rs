//! Output formatting utilities

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use lexigraph_core::{AnswerLine, EntitySummary, GraphStats, LineSink};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown output format: {} (expected text or json)", other),
        }
    }
}

/// Format structured output as pretty JSON
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Sink writing answer lines to stdout
///
/// Text lines are printed as they arrive; JSON is collected and printed as
/// one array by [`StdoutSink::finish`]. After the first write error (a
/// closed pipe, say) the sink stops writing.
pub struct StdoutSink<W = std::io::Stdout> {
    format: OutputFormat,
    out: W,
    collected: Vec<AnswerLine>,
    closed: bool,
}

impl StdoutSink<std::io::Stdout> {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, std::io::stdout())
    }
}

impl<W: Write> StdoutSink<W> {
    pub fn with_writer(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            out,
            collected: Vec::new(),
            closed: false,
        }
    }

    pub fn finish(mut self) {
        if self.format == OutputFormat::Json && !self.closed {
            let rendered = format_json(&self.collected);
            self.write(&rendered);
        }
    }

    fn write(&mut self, text: &str) {
        let result = writeln!(self.out, "{}", text).and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!("Stopped writing answers: {}", e);
            self.closed = true;
        }
    }
}

impl<W: Write> LineSink for StdoutSink<W> {
    fn emit(&mut self, line: AnswerLine) {
        if self.closed {
            return;
        }
        match self.format {
            OutputFormat::Text => self.write(&line.to_string()),
            OutputFormat::Json => self.collected.push(line),
        }
    }
}

pub fn print_summary(summary: &EntitySummary, format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{}", format_json(summary));
        return;
    }

    println!("{} ({})", summary.name, summary.id);
    if let Some(def) = &summary.definition {
        println!("  definition: {}", def);
    }
    println!("  outgoing:   {}", verb_list(&summary.outgoing_verbs));
    println!("  incoming:   {}", verb_list(&summary.incoming_verbs));
    println!("  relations:  {}", summary.relation_count);
    println!("  subclasses: {}", summary.subclass_count);
}

fn verb_list(verbs: &[String]) -> String {
    if verbs.is_empty() {
        "-".to_string()
    } else {
        verbs.join(", ")
    }
}

pub fn print_stats(stats: &GraphStats, format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{}", format_json(stats));
        return;
    }

    println!("Facts:       {}", stats.facts);
    println!(
        "Entities:    {} (tree height {})",
        stats.entities, stats.noun_tree_height
    );
    println!(
        "Verbs:       {} (tree height {})",
        stats.verbs, stats.verb_tree_height
    );
    println!(
        "Descriptors: {} (tree height {})",
        stats.descriptors, stats.descriptor_tree_height
    );
}
