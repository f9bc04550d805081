//! Entity (noun) types

use crate::limits::UNSPECIFIED_ID;
use crate::registry::{Registry, Symbol};
use crate::relation::{Direction, RelationIndex, RelationSearchHeap, SubclassHeap};
use crate::text::compare_ignore_case;
use crate::tree::{NodeId, TreeKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Handle to an entity, stable for the lifetime of its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(NodeId);

impl EntityId {
    pub(crate) fn from_node(node: NodeId) -> Self {
        Self(node)
    }

    pub(crate) fn node(self) -> NodeId {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Noun tree key: case-insensitive name, then numeric id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounKey {
    pub name: String,
    pub id: i64,
}

impl NounKey {
    pub fn new(name: impl Into<String>, id: i64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// Whether `id` selects this key, treating the sentinel as a wildcard.
    pub fn id_matches(&self, id: i64) -> bool {
        id == UNSPECIFIED_ID || self.id == id
    }
}

impl TreeKey for NounKey {
    fn compare(&self, other: &Self) -> Ordering {
        compare_ignore_case(&self.name, &other.name).then(self.id.cmp(&other.id))
    }
}

impl std::fmt::Display for NounKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Payload of a noun tree node
#[derive(Debug, Clone, Default)]
pub struct Noun {
    /// Free-text definition, empty when none was given
    pub definition: String,

    /// Verbs seen with this entity as the subject
    pub outgoing: RelationIndex,

    /// Verbs seen with this (compound) entity as the object
    pub incoming: RelationIndex,

    /// Every outgoing edge, ranked regardless of verb
    pub search_heap: RelationSearchHeap,

    /// Compound entities built with this entity as the object
    pub subclasses: SubclassHeap,
}

impl Noun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relations(&self, direction: Direction) -> &RelationIndex {
        match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
        }
    }

    /// Whether this noun carries `verb` (and `descriptor`) in `direction`.
    pub fn has_verb(
        &self,
        verbs: &Registry,
        direction: Direction,
        verb: Symbol,
        descriptor: Option<Symbol>,
    ) -> bool {
        self.relations(direction).has(verbs, verb, descriptor)
    }

    pub fn has_definition(&self) -> bool {
        !self.definition.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noun_key_order() {
        let a = NounKey::new("Cat", 2);
        let b = NounKey::new("cat", 7);
        let c = NounKey::new("cow", -5);

        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&NounKey::new("CAT", 2)), Ordering::Equal);
        assert_eq!(b.compare(&c), Ordering::Less);
    }

    #[test]
    fn test_sentinel_matches_any_id() {
        let key = NounKey::new("elephant", 4);
        assert!(key.id_matches(4));
        assert!(key.id_matches(UNSPECIFIED_ID));
        assert!(!key.id_matches(5));
    }

    #[test]
    fn test_new_noun_is_empty() {
        let noun = Noun::new();
        assert!(!noun.has_definition());
        assert!(noun.outgoing.is_empty());
        assert!(noun.incoming.is_empty());
        assert!(noun.search_heap.is_empty());
        assert!(noun.subclasses.is_empty());
    }

    #[test]
    fn test_has_verb_by_direction() {
        let mut verbs = Registry::new();
        let is = verbs.intern("is");
        let mut noun = Noun::new();
        noun.outgoing.entry(&verbs, is);

        assert!(noun.has_verb(&verbs, Direction::Outgoing, is, None));
        assert!(!noun.has_verb(&verbs, Direction::Incoming, is, None));
    }
}
