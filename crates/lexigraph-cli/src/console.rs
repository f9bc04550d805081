//! Interactive disambiguation on a terminal

use std::io::{BufRead, Write};

use lexigraph_core::{Candidate, Disambiguator, Selection};

/// Asks the user to pick between candidates
///
/// Choices are numbered from 1. `a` or `all` takes every candidate; an
/// empty line, `0`, anything unparsable or end of input skips.
pub struct ConsoleDisambiguator<R, W> {
    input: R,
    prompt: W,
}

impl<R: BufRead, W: Write> ConsoleDisambiguator<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self { input, prompt }
    }

    fn ask(&mut self, heading: &str, candidates: &[Candidate]) -> Selection {
        if let Err(e) = self.offer(heading, candidates) {
            tracing::warn!("Failed to write prompt: {}", e);
            return Selection::Skip;
        }

        let mut reply = String::new();
        match self.input.read_line(&mut reply) {
            Ok(0) => Selection::Skip,
            Ok(_) => parse_choice(&reply),
            Err(e) => {
                tracing::warn!("Failed to read choice: {}", e);
                Selection::Skip
            }
        }
    }

    fn offer(&mut self, heading: &str, candidates: &[Candidate]) -> std::io::Result<()> {
        writeln!(self.prompt, "{}", heading)?;
        for (i, candidate) in candidates.iter().enumerate() {
            writeln!(self.prompt, "{} : {}", i + 1, candidate)?;
        }
        writeln!(self.prompt, "a : all of them")?;
        write!(self.prompt, "> ")?;
        self.prompt.flush()
    }
}

fn parse_choice(reply: &str) -> Selection {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("a") || reply.eq_ignore_ascii_case("all") {
        return Selection::All;
    }
    match reply.parse::<usize>() {
        Ok(n) if n > 0 => Selection::One(n - 1),
        _ => Selection::Skip,
    }
}

impl<R: BufRead, W: Write> Disambiguator for ConsoleDisambiguator<R, W> {
    fn choose_entity(&mut self, query: &str, candidates: &[Candidate]) -> Selection {
        tracing::debug!("Asking which of {} entities matches {:?}", candidates.len(), query);
        self.ask("Did you mean :", candidates)
    }

    fn choose_interest(&mut self, candidates: &[Candidate]) -> Selection {
        self.ask("What are you interested in?", candidates)
    }
}
