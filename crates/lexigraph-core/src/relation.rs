//! Relation (edge) types and the per-entity relation index

use crate::entity::EntityId;
use crate::heap::{MaxHeap, Weighted};
use crate::registry::{Registry, Symbol};
use crate::text::compare_ignore_case;
use crate::tree::OrderedTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which relation index a query walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Facts where the entity is the subject
    #[default]
    Outgoing,
    /// Facts where the entity is the object (compound side)
    Incoming,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Outgoing => write!(f, "outgoing"),
            Direction::Incoming => write!(f, "incoming"),
        }
    }
}

/// A weighted connection to a target entity
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: EntityId,
    pub weight: i64,
    /// `false` for a negated relation
    pub truth: bool,
    pub descriptor: Symbol,
    pub end_time: Option<DateTime<Utc>>,
}

impl Edge {
    /// Two edges are the same connection when target, truth and descriptor
    /// all match. Weight and expiry do not take part.
    pub fn same_connection(&self, other: &Edge) -> bool {
        self.target == other.target
            && self.truth == other.truth
            && self.descriptor == other.descriptor
    }

    /// Whether the edge is still valid at `as_of` (always, when unset).
    pub fn is_live(&self, as_of: Option<DateTime<Utc>>) -> bool {
        match (as_of, self.end_time) {
            (Some(now), Some(end)) => end >= now,
            _ => true,
        }
    }

    /// Keep the later of the stored and incoming expiry.
    pub fn refresh_expiry(&mut self, end_time: Option<DateTime<Utc>>) {
        self.end_time = self.end_time.max(end_time);
    }
}

impl Weighted for Edge {
    fn weight(&self) -> i64 {
        self.weight
    }

    fn add_weight(&mut self, delta: i64) {
        self.weight = self.weight.saturating_add(delta);
    }
}

/// Relation-search heap entry: an outgoing edge tagged with its verb
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub verb: Symbol,
    pub edge: Edge,
}

impl SearchEntry {
    pub fn same_connection(&self, verb: Symbol, edge: &Edge) -> bool {
        self.verb == verb && self.edge.same_connection(edge)
    }
}

impl Weighted for SearchEntry {
    fn weight(&self) -> i64 {
        self.edge.weight
    }

    fn add_weight(&mut self, delta: i64) {
        self.edge.add_weight(delta);
    }
}

/// Subclass heap entry: a compound entity built on top of this one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubclassEntry {
    pub entity: EntityId,
    pub weight: i64,
}

impl Weighted for SubclassEntry {
    fn weight(&self) -> i64 {
        self.weight
    }

    fn add_weight(&mut self, delta: i64) {
        self.weight = self.weight.saturating_add(delta);
    }
}

/// Per-verb edges of one entity
pub type QueryHeap = MaxHeap<Edge>;
/// All outgoing edges of one entity regardless of verb
pub type RelationSearchHeap = MaxHeap<SearchEntry>;
/// Compound entities formed with one entity as the object
pub type SubclassHeap = MaxHeap<SubclassEntry>;

/// One verb under a relation index
#[derive(Debug, Clone)]
pub struct VerbEntry {
    pub verb: Symbol,
    pub heap: QueryHeap,
}

impl VerbEntry {
    fn new(verb: Symbol) -> Self {
        Self {
            verb,
            heap: QueryHeap::new(),
        }
    }

    /// Whether any edge carries `descriptor`.
    pub fn has_descriptor(&self, descriptor: Symbol) -> bool {
        self.heap.find(|e| e.descriptor == descriptor).is_some()
    }
}

/// Balanced tree of verbs seen by one entity in one role
///
/// Keys are verb symbols ordered by their registry text, so every lookup
/// needs the verb registry.
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    tree: OrderedTree<Symbol, VerbEntry>,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn height(&self) -> u32 {
        self.tree.height()
    }

    pub fn get(&self, verbs: &Registry, verb: Symbol) -> Option<&VerbEntry> {
        self.tree
            .find_by(|k| verbs.compare(*k, verb))
            .map(|id| self.tree.get(id))
    }

    /// Lookup by verb text.
    pub fn lookup(&self, verbs: &Registry, verb: &str) -> Option<&VerbEntry> {
        self.tree
            .find_by(|k| compare_ignore_case(verbs.resolve(*k), verb))
            .map(|id| self.tree.get(id))
    }

    /// Find or lazily create the entry for `verb`.
    pub fn entry(&mut self, verbs: &Registry, verb: Symbol) -> &mut VerbEntry {
        let (id, _) = self
            .tree
            .insert_by(verb, || VerbEntry::new(verb), |a, b| verbs.compare(*a, *b));
        self.tree.get_mut(id)
    }

    /// Whether `verb` is present, optionally with an edge carrying
    /// `descriptor`.
    pub fn has(&self, verbs: &Registry, verb: Symbol, descriptor: Option<Symbol>) -> bool {
        match (self.get(verbs, verb), descriptor) {
            (Some(entry), Some(d)) => entry.has_descriptor(d),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Entries in verb order.
    pub fn iter(&self) -> impl Iterator<Item = &VerbEntry> + '_ {
        self.tree.iter().map(|(_, _, entry)| entry)
    }

    pub fn is_ordered(&self, verbs: &Registry) -> bool {
        self.tree.is_ordered_by(|a, b| verbs.compare(*a, *b)) && self.tree.is_balanced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::tree::NodeId;
    use chrono::TimeZone;

    fn target(n: usize) -> EntityId {
        EntityId::from_node(NodeId::from_index(n))
    }

    fn edge(registry: &mut Registry, to: usize, desc: &str, weight: i64) -> Edge {
        Edge {
            target: target(to),
            weight,
            truth: true,
            descriptor: registry.intern(desc),
            end_time: None,
        }
    }

    #[test]
    fn test_same_connection_ignores_weight() {
        let mut descs = Registry::new();
        let a = edge(&mut descs, 1, "a", 5);
        let b = edge(&mut descs, 1, "A", 9);
        assert!(a.same_connection(&b));

        let mut negated = a.clone();
        negated.truth = false;
        assert!(!a.same_connection(&negated));

        let other_target = edge(&mut descs, 2, "a", 5);
        assert!(!a.same_connection(&other_target));
    }

    #[test]
    fn test_expiry() {
        let mut descs = Registry::new();
        let mut e = edge(&mut descs, 1, "", 1);
        let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(e.is_live(Some(late)));
        e.refresh_expiry(Some(early));
        assert!(!e.is_live(Some(late)));
        assert!(e.is_live(None));

        e.refresh_expiry(Some(late));
        assert_eq!(e.end_time, Some(late));
        e.refresh_expiry(Some(early));
        assert_eq!(e.end_time, Some(late));
    }

    #[test]
    fn test_relation_index_entries_are_lazy_and_unique() {
        let mut verbs = Registry::new();
        let is = verbs.intern("is");
        let has = verbs.intern("has");
        let mut index = RelationIndex::new();
        assert!(index.get(&verbs, is).is_none());

        index.entry(&verbs, is);
        index.entry(&verbs, has);
        index.entry(&verbs, is);
        assert_eq!(index.len(), 2);
        assert!(index.lookup(&verbs, "IS").is_some());
        assert!(index.is_ordered(&verbs));

        let order: Vec<&str> = index.iter().map(|e| verbs.resolve(e.verb)).collect();
        assert_eq!(order, vec!["has", "is"]);
    }

    #[test]
    fn test_has_with_descriptor() {
        let mut verbs = Registry::new();
        let mut descs = Registry::new();
        let is = verbs.intern("is");
        let mut index = RelationIndex::new();
        let e = edge(&mut descs, 3, "a", 1);
        index.entry(&verbs, is).heap.insert(e);

        let a = descs.intern("a");
        let an = descs.intern("an");
        assert!(index.has(&verbs, is, None));
        assert!(index.has(&verbs, is, Some(a)));
        assert!(!index.has(&verbs, is, Some(an)));
    }
}
