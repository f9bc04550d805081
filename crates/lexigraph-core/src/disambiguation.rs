//! Choosing between ambiguous entities during a query
//!
//! A query asks a [`Disambiguator`] when fuzzy name resolution finds more
//! than one entity, and (when the caller allows it) when several subclasses
//! could continue the answer. Front ends decide how to ask; the engine only
//! sees the [`Selection`].

use crate::entity::EntityId;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One option offered to a [`Disambiguator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl Candidate {
    pub fn of(graph: &Graph, entity: EntityId) -> Self {
        let key = graph.key(entity);
        let noun = graph.noun(entity);
        Self {
            name: key.name.clone(),
            id: key.id,
            definition: noun.has_definition().then(|| noun.definition.clone()),
        }
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(def) = &self.definition {
            write!(f, " ({})", def)?;
        }
        Ok(())
    }
}

/// Answer to a disambiguation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the offered candidates
    One(usize),
    /// Use every candidate
    All,
    /// Use none
    Skip,
}

/// Resolves ambiguity on behalf of a query
pub trait Disambiguator {
    /// Several entities resemble `query`.
    fn choose_entity(&mut self, query: &str, candidates: &[Candidate]) -> Selection;

    /// Several subclasses could continue the answer.
    fn choose_interest(&mut self, candidates: &[Candidate]) -> Selection;
}

/// Non-interactive choice: the best entity, every subclass
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl Disambiguator for FirstCandidate {
    fn choose_entity(&mut self, _query: &str, _candidates: &[Candidate]) -> Selection {
        Selection::One(0)
    }

    fn choose_interest(&mut self, _candidates: &[Candidate]) -> Selection {
        Selection::All
    }
}

/// Replays a fixed queue of selections and records what it was shown
///
/// Once the queue is empty every request gets [`Selection::Skip`].
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    replies: VecDeque<Selection>,
    /// Candidate names offered on each request, in order
    pub offered: Vec<Vec<String>>,
}

impl Scripted {
    pub fn new(replies: impl IntoIterator<Item = Selection>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            offered: Vec::new(),
        }
    }

    fn next(&mut self, candidates: &[Candidate]) -> Selection {
        self.offered
            .push(candidates.iter().map(|c| c.name.clone()).collect());
        self.replies.pop_front().unwrap_or(Selection::Skip)
    }
}

impl Disambiguator for Scripted {
    fn choose_entity(&mut self, _query: &str, candidates: &[Candidate]) -> Selection {
        self.next(candidates)
    }

    fn choose_interest(&mut self, candidates: &[Candidate]) -> Selection {
        self.next(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate {
                name: "elephant".to_string(),
                id: 4,
                definition: None,
            },
            Candidate {
                name: "elephent".to_string(),
                id: 4,
                definition: Some("a misspelling".to_string()),
            },
        ]
    }

    #[test]
    fn test_first_candidate() {
        let mut d = FirstCandidate;
        assert_eq!(d.choose_entity("elephnt", &candidates()), Selection::One(0));
        assert_eq!(d.choose_interest(&candidates()), Selection::All);
    }

    #[test]
    fn test_scripted_replays_then_skips() {
        let mut d = Scripted::new([Selection::All, Selection::One(1)]);
        assert_eq!(d.choose_entity("x", &candidates()), Selection::All);
        assert_eq!(d.choose_interest(&candidates()), Selection::One(1));
        assert_eq!(d.choose_interest(&candidates()), Selection::Skip);
        assert_eq!(d.offered.len(), 3);
        assert_eq!(d.offered[0], vec!["elephant", "elephent"]);
    }

    #[test]
    fn test_candidate_display() {
        let c = candidates();
        assert_eq!(c[0].to_string(), "elephant");
        assert_eq!(c[1].to_string(), "elephent (a misspelling)");
    }
}
