//! Turning a typed question into a structured query
//!
//! Words are classified against the graph's own verb and descriptor
//! registries. The recognised shapes are:
//!
//! | Input                         | Query                              |
//! |-------------------------------|------------------------------------|
//! | `cat`                         | everything about `cat`             |
//! | `cat is ?`                    | outgoing `is` from `cat`           |
//! | `? is mammal`                 | incoming `is` into `mammal`        |
//! | `cat is a ?`                  | outgoing `is` with descriptor `a`  |
//! | `? is a mammal`               | incoming `is` with descriptor `a`  |
//!
//! Verbs and descriptors may span several words.

use crate::graph::Graph;
use crate::limits::UNSPECIFIED_ID;
use crate::query::AnswerQuery;
use crate::relation::Direction;
use serde::{Deserialize, Serialize};

const QUESTION_MARK: &str = "?";

/// A recognised question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    EverythingAbout {
        entity: String,
    },
    ByVerb {
        entity: String,
        verb: String,
        direction: Direction,
    },
    ByVerbAndDescriptor {
        entity: String,
        verb: String,
        descriptor: String,
        direction: Direction,
    },
}

impl Question {
    /// The structured query this question asks, with the sentinel id and
    /// disambiguation enabled.
    pub fn to_query(&self, budget: usize) -> AnswerQuery {
        let query = match self {
            Question::EverythingAbout { entity } => AnswerQuery::new(entity),
            Question::ByVerb {
                entity,
                verb,
                direction,
            } => AnswerQuery::new(entity).verb(verb).with_direction(*direction),
            Question::ByVerbAndDescriptor {
                entity,
                verb,
                descriptor,
                direction,
            } => AnswerQuery::new(entity)
                .verb(verb)
                .descriptor(descriptor)
                .with_direction(*direction),
        };
        query
            .with_id(UNSPECIFIED_ID)
            .with_budget(budget)
            .interactive()
    }
}

/// Classify `text`, or `None` when it matches no known shape.
pub fn recognize(graph: &Graph, text: &str) -> Option<Question> {
    // "cat is?" and "cat is ?" read the same.
    let spaced = text.replace('?', " ? ");
    let words: Vec<&str> = spaced.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    if words[0] == QUESTION_MARK {
        return recognize_incoming(graph, &words[1..]);
    }

    let Some((start, end)) = find_verb(graph, &words) else {
        if words.contains(&QUESTION_MARK) {
            return None;
        }
        return Some(Question::EverythingAbout {
            entity: words.join(" "),
        });
    };

    // <noun phrase> <verb> [descriptor] ?
    if start == 0 || words.last() != Some(&QUESTION_MARK) {
        return None;
    }
    let entity = words[..start].join(" ");
    let verb = words[start..end].join(" ");
    let middle = &words[end..words.len() - 1];

    if middle.is_empty() {
        return Some(Question::ByVerb {
            entity,
            verb,
            direction: Direction::Outgoing,
        });
    }
    let descriptor = shortest_descriptor(graph, middle, middle.len())?;
    Some(Question::ByVerbAndDescriptor {
        entity,
        verb,
        descriptor: descriptor.1,
        direction: Direction::Outgoing,
    })
}

/// `? <verb> [descriptor] <noun phrase>`
fn recognize_incoming(graph: &Graph, words: &[&str]) -> Option<Question> {
    let len = longest_verb_at(graph, words, 0)?;
    let verb = words[..len].join(" ");
    let rest = &words[len..];
    if rest.is_empty() || rest.contains(&QUESTION_MARK) {
        return None;
    }

    // Leave at least one word for the noun phrase.
    match shortest_descriptor(graph, rest, rest.len() - 1) {
        Some((used, descriptor)) => Some(Question::ByVerbAndDescriptor {
            entity: rest[used..].join(" "),
            verb,
            descriptor,
            direction: Direction::Incoming,
        }),
        None => Some(Question::ByVerb {
            entity: rest.join(" "),
            verb,
            direction: Direction::Incoming,
        }),
    }
}

/// First position holding a registered verb, as a word range.
fn find_verb(graph: &Graph, words: &[&str]) -> Option<(usize, usize)> {
    (0..words.len()).find_map(|start| longest_verb_at(graph, words, start).map(|len| (start, start + len)))
}

/// Length of the longest registered verb starting at `start`.
fn longest_verb_at(graph: &Graph, words: &[&str], start: usize) -> Option<usize> {
    let available = words[start..]
        .iter()
        .take_while(|w| **w != QUESTION_MARK)
        .count();
    (1..=available)
        .rev()
        .find(|len| graph.verbs().contains(&words[start..start + len].join(" ")))
}

/// Shortest leading run of at most `max` words that is a registered
/// descriptor, with the number of words it used.
fn shortest_descriptor(graph: &Graph, words: &[&str], max: usize) -> Option<(usize, String)> {
    (1..=max.min(words.len())).find_map(|len| {
        let candidate = words[..len].join(" ");
        graph.descriptors().contains(&candidate).then_some((len, candidate))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::Fact;

    fn graph() -> Graph {
        Graph::from_facts(&[
            Fact::new("cat", "is", "mammal").with_descriptor("a"),
            Fact::new("new york", "is", "city").with_descriptor("one of the"),
            Fact::new("bob", "lives in", "paris"),
            Fact::new("paris", "is", "france").with_descriptor("in"),
        ])
        .unwrap()
    }

    #[test]
    fn test_everything_about() {
        let g = graph();
        assert_eq!(
            recognize(&g, "new york"),
            Some(Question::EverythingAbout {
                entity: "new york".to_string()
            })
        );
        assert_eq!(recognize(&g, "   "), None);
        assert_eq!(recognize(&g, "cat ?"), None);
    }

    #[test]
    fn test_outgoing_by_verb() {
        let g = graph();
        assert_eq!(
            recognize(&g, "cat is ?"),
            Some(Question::ByVerb {
                entity: "cat".to_string(),
                verb: "is".to_string(),
                direction: Direction::Outgoing,
            })
        );
        assert_eq!(
            recognize(&g, "bob lives in ?"),
            Some(Question::ByVerb {
                entity: "bob".to_string(),
                verb: "lives in".to_string(),
                direction: Direction::Outgoing,
            })
        );
    }

    #[test]
    fn test_outgoing_with_descriptor() {
        let g = graph();
        assert_eq!(
            recognize(&g, "new york is one of the ?"),
            Some(Question::ByVerbAndDescriptor {
                entity: "new york".to_string(),
                verb: "is".to_string(),
                descriptor: "one of the".to_string(),
                direction: Direction::Outgoing,
            })
        );
        assert_eq!(recognize(&g, "cat is furry ?"), None);
    }

    #[test]
    fn test_incoming() {
        let g = graph();
        assert_eq!(
            recognize(&g, "? is mammal"),
            Some(Question::ByVerb {
                entity: "mammal".to_string(),
                verb: "is".to_string(),
                direction: Direction::Incoming,
            })
        );
        assert_eq!(
            recognize(&g, "? is in france"),
            Some(Question::ByVerbAndDescriptor {
                entity: "france".to_string(),
                verb: "is".to_string(),
                descriptor: "in".to_string(),
                direction: Direction::Incoming,
            })
        );
    }

    #[test]
    fn test_leading_question_mark_needs_a_verb() {
        let g = graph();
        assert_eq!(recognize(&g, "? cat mammal"), None);
        assert_eq!(recognize(&g, "? is"), None);
    }

    #[test]
    fn test_statement_without_question_mark() {
        let g = graph();
        assert_eq!(recognize(&g, "cat is mammal"), None);
    }

    #[test]
    fn test_attached_question_mark() {
        let g = graph();
        assert_eq!(recognize(&g, "cat is?"), recognize(&g, "cat is ?"));
        assert!(recognize(&g, "?is mammal").is_some());
    }

    #[test]
    fn test_to_query() {
        let q = Question::ByVerb {
            entity: "cat".to_string(),
            verb: "is".to_string(),
            direction: Direction::Incoming,
        }
        .to_query(7);
        assert_eq!(q.entity_id, UNSPECIFIED_ID);
        assert_eq!(q.budget, 7);
        assert_eq!(q.direction, Direction::Incoming);
        assert!(q.allow_disambiguation);
        assert_eq!(q.verb.as_deref(), Some("is"));
    }
}
