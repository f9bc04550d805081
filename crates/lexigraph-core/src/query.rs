//! Weighted, budgeted answering over the fact graph
//!
//! Every query works against a line budget. Direct answers come first in
//! weight order; whatever budget is left is split between the answers'
//! target entities and then between the queried entity's subclasses, each
//! share proportional to weight. Live heaps are never drained: each level
//! clones the heap it walks.

use crate::disambiguation::{Candidate, Disambiguator, Selection};
use crate::entity::EntityId;
use crate::graph::Graph;
use crate::limits::{
    validate_depth, validate_threshold, DEFAULT_LINE_BUDGET, DEFAULT_MAX_DEPTH,
    DEFAULT_SIMILARITY_THRESHOLD, UNSPECIFIED_ID,
};
use crate::registry::Symbol;
use crate::relation::{Direction, Edge, SubclassEntry, SubclassHeap};
use crate::text::display_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One emitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLine {
    pub subject: String,
    pub verb: String,
    pub negated: bool,
    pub descriptor: String,
    pub object: String,
    pub weight: i64,
}

impl std::fmt::Display for AnswerLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.subject, self.verb)?;
        if self.negated {
            write!(f, " not")?;
        }
        if !self.descriptor.is_empty() {
            write!(f, " {}", self.descriptor)?;
        }
        write!(f, " {}", self.object)
    }
}

/// Receives answer lines as a query produces them
pub trait LineSink {
    fn emit(&mut self, line: AnswerLine);
}

impl LineSink for Vec<AnswerLine> {
    fn emit(&mut self, line: AnswerLine) {
        self.push(line);
    }
}

/// Rounds fractional line shares
///
/// Below one half rounds down, above rounds up. Exact halves alternate,
/// starting with down, so repeated ties do not all favour one side.
#[derive(Debug, Clone, Default)]
pub struct LineRounder {
    halves: u64,
}

impl LineRounder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round(&mut self, value: f64) -> usize {
        if value <= 0.0 {
            return 0;
        }
        let floor = value.floor();
        let frac = value - floor;
        let whole = floor as usize;
        if frac < 0.5 {
            whole
        } else if frac > 0.5 {
            whole.saturating_add(1)
        } else {
            let up = self.halves % 2 == 1;
            self.halves += 1;
            if up {
                whole.saturating_add(1)
            } else {
                whole
            }
        }
    }

    /// `round(weight / total * pool)`, zero when there is nothing to share.
    pub fn share(&mut self, weight: i64, total: i64, pool: usize) -> usize {
        if total <= 0 || weight <= 0 || pool == 0 {
            return 0;
        }
        self.round(weight as f64 / total as f64 * pool as f64)
    }
}

/// Per-session query state and tuning knobs
#[derive(Debug, Clone)]
pub struct QueryContext {
    rounder: LineRounder,
    lines_emitted: usize,

    /// Minimum percent similarity for a fuzzy candidate
    pub similarity_threshold: u32,

    /// Recursion levels below the starting entity that may still emit
    pub max_depth: usize,

    /// When set, edges that expired before this instant are skipped
    pub as_of: Option<DateTime<Utc>>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self {
            rounder: LineRounder::new(),
            lines_emitted: 0,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
            as_of: None,
        }
    }
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: u32) -> crate::Result<Self> {
        validate_threshold(threshold)?;
        self.similarity_threshold = threshold;
        Ok(self)
    }

    pub fn with_max_depth(mut self, depth: usize) -> crate::Result<Self> {
        validate_depth(depth)?;
        self.max_depth = depth;
        Ok(self)
    }

    pub fn as_of(mut self, instant: DateTime<Utc>) -> Self {
        self.as_of = Some(instant);
        self
    }

    /// Lines emitted through this context across all queries.
    pub fn lines_emitted(&self) -> usize {
        self.lines_emitted
    }
}

/// Structured query (builder style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerQuery {
    /// Entity name to start from
    pub entity: String,

    /// Entity id, `UNSPECIFIED_ID` for any
    #[serde(default = "default_entity_id")]
    pub entity_id: i64,

    /// Verb to follow; `None` asks for everything about the entity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,

    /// Only edges with this descriptor (needs a verb)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,

    #[serde(default)]
    pub direction: Direction,

    /// Maximum number of lines to emit
    #[serde(default = "default_budget")]
    pub budget: usize,

    /// Ask which subclass to follow when several could answer
    #[serde(default)]
    pub allow_disambiguation: bool,
}

fn default_entity_id() -> i64 {
    UNSPECIFIED_ID
}

fn default_budget() -> usize {
    DEFAULT_LINE_BUDGET
}

impl AnswerQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            entity_id: default_entity_id(),
            verb: None,
            descriptor: None,
            direction: Direction::Outgoing,
            budget: default_budget(),
            allow_disambiguation: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.entity_id = id;
        self
    }

    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    pub fn descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    pub fn incoming(mut self) -> Self {
        self.direction = Direction::Incoming;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.allow_disambiguation = true;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct VerbPattern {
    verb: Symbol,
    descriptor: Option<Symbol>,
    direction: Direction,
}

/// Runs queries against one graph, emitting into a sink
pub struct QueryEngine<'a> {
    graph: &'a Graph,
    ctx: &'a mut QueryContext,
    disambiguator: &'a mut dyn Disambiguator,
    sink: &'a mut dyn LineSink,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        graph: &'a Graph,
        ctx: &'a mut QueryContext,
        disambiguator: &'a mut dyn Disambiguator,
        sink: &'a mut dyn LineSink,
    ) -> Self {
        Self {
            graph,
            ctx,
            disambiguator,
            sink,
        }
    }

    /// Execute a structured query, returning the number of lines emitted.
    pub fn execute(&mut self, query: &AnswerQuery) -> usize {
        tracing::debug!(
            "Executing query: entity={}, id={}, verb={:?}, descriptor={:?}, direction={}, budget={}",
            query.entity,
            query.entity_id,
            query.verb,
            query.descriptor,
            query.direction,
            query.budget
        );

        match (&query.verb, &query.descriptor) {
            (None, _) => {
                if query.descriptor.is_some() {
                    tracing::debug!("Descriptor without a verb is ignored");
                }
                self.query_everything_about(&query.entity, query.entity_id, query.budget)
            }
            (Some(verb), None) => self.query_by_verb(
                &query.entity,
                query.entity_id,
                verb,
                query.direction,
                query.budget,
                query.allow_disambiguation,
            ),
            (Some(verb), Some(descriptor)) => self.query_by_verb_and_descriptor(
                &query.entity,
                query.entity_id,
                verb,
                descriptor,
                query.direction,
                query.budget,
                query.allow_disambiguation,
            ),
        }
    }

    /// Everything known about an entity, heaviest relations first.
    pub fn query_everything_about(&mut self, name: &str, id: i64, budget: usize) -> usize {
        if budget == 0 {
            return 0;
        }
        let graph = self.graph;
        match graph.entity(name, id) {
            Some(entity) => self.everything_about(entity, budget, 0),
            None => {
                let candidates = graph.fuzzy_candidates(name, id, self.ctx.similarity_threshold);
                self.resolve_fuzzy(name, candidates, budget, |engine, entity, lines| {
                    engine.everything_about(entity, lines, 0)
                })
            }
        }
    }

    /// Answers for `name verb ?` (outgoing) or `? verb name` (incoming).
    pub fn query_by_verb(
        &mut self,
        name: &str,
        id: i64,
        verb: &str,
        direction: Direction,
        budget: usize,
        allow_disambiguation: bool,
    ) -> usize {
        self.query_pattern(name, id, verb, None, direction, budget, allow_disambiguation)
    }

    /// Like [`QueryEngine::query_by_verb`], restricted to one descriptor.
    #[allow(clippy::too_many_arguments)]
    pub fn query_by_verb_and_descriptor(
        &mut self,
        name: &str,
        id: i64,
        verb: &str,
        descriptor: &str,
        direction: Direction,
        budget: usize,
        allow_disambiguation: bool,
    ) -> usize {
        self.query_pattern(
            name,
            id,
            verb,
            Some(descriptor),
            direction,
            budget,
            allow_disambiguation,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn query_pattern(
        &mut self,
        name: &str,
        id: i64,
        verb: &str,
        descriptor: Option<&str>,
        direction: Direction,
        budget: usize,
        allow_disambiguation: bool,
    ) -> usize {
        if budget == 0 {
            return 0;
        }
        let graph = self.graph;

        // Unknown verb or descriptor text cannot match any edge anywhere.
        let Some(verb) = graph.verbs().lookup(verb) else {
            tracing::debug!("Verb {:?} is not registered", verb);
            return 0;
        };
        let descriptor = match descriptor {
            Some(text) => match graph.descriptors().lookup(text) {
                Some(symbol) => Some(symbol),
                None => {
                    tracing::debug!("Descriptor {:?} is not registered", text);
                    return 0;
                }
            },
            None => None,
        };
        let pattern = VerbPattern {
            verb,
            descriptor,
            direction,
        };

        match graph.entity(name, id) {
            Some(entity) => self.verb_query(entity, pattern, budget, allow_disambiguation, 0),
            None => {
                let candidates: Vec<EntityId> = graph
                    .fuzzy_candidates(name, id, self.ctx.similarity_threshold)
                    .into_iter()
                    .filter(|c| graph.reaches_verb(*c, direction, verb, descriptor))
                    .collect();
                self.resolve_fuzzy(name, candidates, budget, |engine, entity, lines| {
                    engine.verb_query(entity, pattern, lines, allow_disambiguation, 0)
                })
            }
        }
    }

    /// Hand an unresolved name to the fuzzy candidates.
    fn resolve_fuzzy<F>(
        &mut self,
        query: &str,
        candidates: Vec<EntityId>,
        budget: usize,
        mut run: F,
    ) -> usize
    where
        F: FnMut(&mut Self, EntityId, usize) -> usize,
    {
        match candidates.len() {
            0 => {
                tracing::debug!("No entity resembles {:?}", query);
                0
            }
            1 => run(self, candidates[0], budget),
            n => {
                let offered: Vec<Candidate> = candidates
                    .iter()
                    .map(|c| Candidate::of(self.graph, *c))
                    .collect();
                match self.disambiguator.choose_entity(query, &offered) {
                    Selection::One(i) if i < n => run(self, candidates[i], budget),
                    Selection::One(i) => {
                        tracing::warn!(
                            "Choice {} is out of range (1-{}), nothing to show",
                            i.saturating_add(1),
                            n
                        );
                        0
                    }
                    Selection::All => {
                        // Even share of what is still left, rounded up.
                        let mut remaining = budget;
                        let mut emitted = 0;
                        for (k, candidate) in candidates.into_iter().enumerate() {
                            if remaining == 0 {
                                break;
                            }
                            let lines = remaining.div_ceil(n - k);
                            let used = run(self, candidate, lines).min(lines);
                            remaining -= used;
                            emitted += used;
                        }
                        emitted
                    }
                    Selection::Skip => 0,
                }
            }
        }
    }

    fn verb_query(
        &mut self,
        entity: EntityId,
        pattern: VerbPattern,
        budget: usize,
        allow_disambiguation: bool,
        depth: usize,
    ) -> usize {
        if budget == 0 {
            return 0;
        }
        if depth > self.ctx.max_depth {
            tracing::debug!("Depth limit reached at {}", self.graph.name(entity));
            return 0;
        }

        let graph = self.graph;
        let noun = graph.noun(entity);
        let mut emitted = 0;
        let mut remaining = budget;

        if let Some(entry) = noun.relations(pattern.direction).get(graph.verbs(), pattern.verb) {
            let as_of = self.ctx.as_of;
            let working = entry.heap.filtered(|e| {
                e.is_live(as_of) && pattern.descriptor.map_or(true, |d| e.descriptor == d)
            });

            if working.len() >= budget {
                for edge in working.into_sorted().take(budget) {
                    self.emit_verb_line(entity, pattern, &edge);
                }
                return budget;
            }

            let total = working.sum_of_weights();
            let edges: Vec<Edge> = working.into_sorted().collect();
            for edge in &edges {
                self.emit_verb_line(entity, pattern, edge);
            }
            emitted += edges.len();
            remaining -= edges.len();

            let targets: Vec<(EntityId, i64)> = edges.iter().map(|e| (e.target, e.weight)).collect();
            let used = self.distribute(&targets, total, remaining, |engine, target, lines| {
                engine.everything_about(target, lines, depth + 1)
            });
            emitted += used;
            remaining -= used;
        }

        if remaining > 0 && !noun.subclasses.is_empty() {
            let cascade = if allow_disambiguation {
                self.subclasses_of_interest(entity, pattern)
            } else {
                noun.subclasses.clone()
            };
            let total = cascade.sum_of_weights();
            let subclasses: Vec<(EntityId, i64)> =
                cascade.into_sorted().map(|s| (s.entity, s.weight)).collect();
            // Disambiguation is only offered at the top level.
            emitted += self.distribute(&subclasses, total, remaining, |engine, sub, lines| {
                engine.verb_query(sub, pattern, lines, false, depth + 1)
            });
        }

        emitted
    }

    /// Subclasses to cascade into when the caller may be asked.
    fn subclasses_of_interest(&mut self, entity: EntityId, pattern: VerbPattern) -> SubclassHeap {
        let graph = self.graph;
        let all = &graph.noun(entity).subclasses;
        let matching = all.filtered(|s| {
            graph
                .noun(s.entity)
                .has_verb(graph.verbs(), pattern.direction, pattern.verb, pattern.descriptor)
        });
        if matching.len() <= 1 {
            return matching;
        }

        let ordered: Vec<SubclassEntry> = matching.into_sorted().collect();
        let offered: Vec<Candidate> = ordered
            .iter()
            .map(|s| Candidate::of(graph, s.entity))
            .collect();
        match self.disambiguator.choose_interest(&offered) {
            Selection::One(i) if i < ordered.len() => {
                let mut only = SubclassHeap::new();
                only.insert(ordered[i]);
                only
            }
            _ => all.clone(),
        }
    }

    fn everything_about(&mut self, entity: EntityId, budget: usize, depth: usize) -> usize {
        if budget == 0 {
            return 0;
        }
        if depth > self.ctx.max_depth {
            tracing::debug!("Depth limit reached at {}", self.graph.name(entity));
            return 0;
        }

        let graph = self.graph;
        let noun = graph.noun(entity);
        let as_of = self.ctx.as_of;
        let working = noun.search_heap.filtered(|s| s.edge.is_live(as_of));

        if working.len() >= budget {
            for entry in working.into_sorted().take(budget) {
                self.emit_search_line(entity, entry.verb, &entry.edge);
            }
            return budget;
        }

        let total = working.sum_of_weights();
        let entries: Vec<_> = working.into_sorted().collect();
        for entry in &entries {
            self.emit_search_line(entity, entry.verb, &entry.edge);
        }
        let mut emitted = entries.len();
        let mut remaining = budget - entries.len();

        let targets: Vec<(EntityId, i64)> = entries
            .iter()
            .map(|e| (e.edge.target, e.edge.weight))
            .collect();
        let used = self.distribute(&targets, total, remaining, |engine, target, lines| {
            engine.everything_about(target, lines, depth + 1)
        });
        emitted += used;
        remaining -= used;

        if remaining > 0 && !noun.subclasses.is_empty() {
            let total = noun.subclasses.sum_of_weights();
            let subclasses: Vec<(EntityId, i64)> = noun
                .subclasses
                .clone()
                .into_sorted()
                .map(|s| (s.entity, s.weight))
                .collect();
            emitted += self.distribute(&subclasses, total, remaining, |engine, sub, lines| {
                engine.everything_about(sub, lines, depth + 1)
            });
        }

        emitted
    }

    /// Split `pool` lines across weighted entities in order.
    ///
    /// Shares are all rounded before any child runs. Lines a child leaves
    /// unused roll into the next share, and no share exceeds what is left.
    fn distribute<F>(&mut self, weighted: &[(EntityId, i64)], total: i64, pool: usize, mut run: F) -> usize
    where
        F: FnMut(&mut Self, EntityId, usize) -> usize,
    {
        let shares: Vec<usize> = weighted
            .iter()
            .map(|(_, w)| self.ctx.rounder.share(*w, total, pool))
            .collect();

        let mut remaining = pool;
        let mut carry = 0;
        let mut emitted = 0;
        for ((entity, _), share) in weighted.iter().zip(shares) {
            if remaining == 0 {
                break;
            }
            let lines = share.saturating_add(carry).min(remaining);
            let used = run(self, *entity, lines).min(lines);
            carry = lines - used;
            remaining -= used;
            emitted += used;
        }
        emitted
    }

    fn emit_verb_line(&mut self, entity: EntityId, pattern: VerbPattern, edge: &Edge) {
        let graph = self.graph;
        let here = display_name(graph.name(entity));
        let there = display_name(graph.name(edge.target));
        let (subject, object) = match pattern.direction {
            Direction::Outgoing => (here, there),
            Direction::Incoming => (there, here),
        };
        self.emit(AnswerLine {
            subject: subject.to_string(),
            verb: graph.verbs().resolve(pattern.verb).to_string(),
            negated: !edge.truth,
            descriptor: graph.descriptors().resolve(edge.descriptor).to_string(),
            object: object.to_string(),
            weight: edge.weight,
        });
    }

    fn emit_search_line(&mut self, entity: EntityId, verb: Symbol, edge: &Edge) {
        let graph = self.graph;
        self.emit(AnswerLine {
            subject: display_name(graph.name(entity)).to_string(),
            verb: graph.verbs().resolve(verb).to_string(),
            negated: !edge.truth,
            descriptor: graph.descriptors().resolve(edge.descriptor).to_string(),
            object: display_name(graph.name(edge.target)).to_string(),
            weight: edge.weight,
        });
    }

    fn emit(&mut self, line: AnswerLine) {
        tracing::trace!("Emitting: {}", line);
        self.ctx.lines_emitted += 1;
        self.sink.emit(line);
    }
}
