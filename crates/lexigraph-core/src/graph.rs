//! The fact graph and its insertion engine

use crate::entity::{EntityId, Noun, NounKey};
use crate::error::{Error, Result};
use crate::fact::Fact;
use crate::limits::{validate_name, UNSPECIFIED_ID};
use crate::registry::{Registry, Symbol};
use crate::relation::{Direction, Edge, SearchEntry, SubclassEntry};
use crate::text::{compare_ignore_case, compound_name, similarity_percent};
use crate::tree::{OrderedTree, TreeKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Entities, verbs and descriptors with every relation between them
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nouns: OrderedTree<NounKey, Noun>,
    verbs: Registry,
    descriptors: Registry,
    facts: usize,
}

/// Inspection view of one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySummary {
    pub name: String,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    pub outgoing_verbs: Vec<String>,
    pub incoming_verbs: Vec<String>,
    pub relation_count: usize,
    pub subclass_count: usize,
}

/// Size of each index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub entities: usize,
    pub verbs: usize,
    pub descriptors: usize,
    pub facts: usize,
    pub noun_tree_height: u32,
    pub verb_tree_height: u32,
    pub descriptor_tree_height: u32,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a sequence of facts.
    pub fn from_facts<'a, I>(facts: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Fact>,
    {
        let mut graph = Self::new();
        for fact in facts {
            graph.insert_fact(fact)?;
        }
        Ok(graph)
    }

    /// Ingest one fact.
    ///
    /// Repeating a fact only adds weight: the structural shape after the
    /// first insertion never changes.
    pub fn insert_fact(&mut self, fact: &Fact) -> Result<()> {
        validate_name("subject", &fact.subject)?;
        validate_name("verb", &fact.verb)?;
        validate_name("object", &fact.object)?;

        let subject = self.intern_entity(&fact.subject, fact.subject_id);
        let object = self.intern_entity(&fact.object, fact.object_id);
        let compound = self.intern_entity(&compound_name(&fact.subject, &fact.object), UNSPECIFIED_ID);
        let verb = self.verbs.intern(&fact.verb);
        let descriptor = self.descriptors.intern(&fact.descriptor);

        tracing::debug!(
            "Inserting fact: {} {} {} (compound {}, weights {}/{})",
            fact.subject,
            fact.verb,
            fact.object,
            compound,
            fact.front_weight,
            fact.back_weight
        );

        let outgoing = Edge {
            target: compound,
            weight: fact.front_weight,
            truth: fact.truth,
            descriptor,
            end_time: fact.end_time,
        };
        self.upsert_outgoing(subject, verb, outgoing);

        let subclasses = &mut self.nouns.get_mut(object.node()).subclasses;
        match subclasses.find(|s| s.entity == compound) {
            Some(pos) => {
                subclasses.add_weight(pos, fact.front_weight);
            }
            None => subclasses.insert(SubclassEntry {
                entity: compound,
                weight: fact.front_weight,
            }),
        }

        let incoming = Edge {
            target: subject,
            weight: fact.back_weight,
            truth: fact.truth,
            descriptor,
            end_time: fact.end_time,
        };
        let verbs = &self.verbs;
        let noun = self.nouns.get_mut(compound.node());
        let heap = &mut noun.incoming.entry(verbs, verb).heap;
        match heap.find(|e| e.same_connection(&incoming)) {
            Some(pos) => {
                heap.modify(pos, |e| {
                    e.weight = e.weight.saturating_add(incoming.weight);
                    e.refresh_expiry(incoming.end_time);
                });
            }
            None => heap.insert(incoming),
        }

        if !fact.definition.is_empty() {
            noun.definition = fact.definition.clone();
        }

        self.facts += 1;
        Ok(())
    }

    /// Edge upsert under the subject's outgoing index and search heap.
    fn upsert_outgoing(&mut self, subject: EntityId, verb: Symbol, edge: Edge) {
        let verbs = &self.verbs;
        let noun = self.nouns.get_mut(subject.node());
        let heap = &mut noun.outgoing.entry(verbs, verb).heap;
        let in_query = heap.find(|e| e.same_connection(&edge));
        let in_search = noun.search_heap.find(|s| s.same_connection(verb, &edge));

        match (in_query, in_search) {
            (Some(q), Some(s)) => {
                heap.modify(q, |e| {
                    e.weight = e.weight.saturating_add(edge.weight);
                    e.refresh_expiry(edge.end_time);
                });
                noun.search_heap.modify(s, |entry| {
                    entry.edge.weight = entry.edge.weight.saturating_add(edge.weight);
                    entry.edge.refresh_expiry(edge.end_time);
                });
            }
            _ => {
                heap.insert(edge.clone());
                noun.search_heap.insert(SearchEntry { verb, edge });
            }
        }
    }

    /// Look up `(name, id)` exactly, creating an empty entity if absent.
    fn intern_entity(&mut self, name: &str, id: i64) -> EntityId {
        let (node, created) = self.nouns.insert(NounKey::new(name, id), Noun::new());
        if created {
            tracing::trace!("Created entity {} ({}) as {}", name, id, node);
        }
        EntityId::from_node(node)
    }

    /// Resolve an entity by name and id.
    ///
    /// With the sentinel id this first tries `(name, UNSPECIFIED_ID)` and
    /// then the first entity in key order with that name.
    pub fn entity(&self, name: &str, id: i64) -> Option<EntityId> {
        let probe = NounKey::new(name, id);
        if let Some(node) = self.nouns.search(&probe) {
            return Some(EntityId::from_node(node));
        }
        if id == UNSPECIFIED_ID {
            return self.first_named(name);
        }
        None
    }

    /// Like [`Graph::entity`] but failing with `EntityNotFound`.
    pub fn require_entity(&self, name: &str, id: i64) -> Result<EntityId> {
        self.entity(name, id)
            .ok_or_else(|| Error::EntityNotFound(NounKey::new(name, id).to_string()))
    }

    /// Leftmost node whose name equals `name`.
    fn first_named(&self, name: &str) -> Option<EntityId> {
        let mut cursor = self.nouns.root();
        let mut found = None;
        while let Some(node) = cursor {
            cursor = match compare_ignore_case(&self.nouns.key(node).name, name) {
                Ordering::Less => self.nouns.right(node),
                Ordering::Greater => self.nouns.left(node),
                Ordering::Equal => {
                    found = Some(node);
                    self.nouns.left(node)
                }
            };
        }
        found.map(EntityId::from_node)
    }

    pub fn noun(&self, id: EntityId) -> &Noun {
        self.nouns.get(id.node())
    }

    pub fn key(&self, id: EntityId) -> &NounKey {
        self.nouns.key(id.node())
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.key(id).name
    }

    /// Entities in key order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.nouns.in_order().map(EntityId::from_node)
    }

    pub fn verbs(&self) -> &Registry {
        &self.verbs
    }

    pub fn descriptors(&self) -> &Registry {
        &self.descriptors
    }

    pub fn entity_count(&self) -> usize {
        self.nouns.len()
    }

    pub fn fact_count(&self) -> usize {
        self.facts
    }

    /// Entities whose name is at least `threshold` percent similar to
    /// `name`, in preorder.
    ///
    /// The sentinel id matches any entity id. Each entity appears once.
    pub fn fuzzy_candidates(&self, name: &str, id: i64, threshold: u32) -> Vec<EntityId> {
        self.nouns
            .preorder()
            .filter(|node| {
                let key = self.nouns.key(*node);
                key.id_matches(id) && similarity_percent(&key.name, name) >= threshold
            })
            .map(EntityId::from_node)
            .collect()
    }

    /// Whether `entity` or one of its subclasses carries `verb` (and
    /// `descriptor`) in `direction`.
    pub fn reaches_verb(
        &self,
        entity: EntityId,
        direction: Direction,
        verb: Symbol,
        descriptor: Option<Symbol>,
    ) -> bool {
        let noun = self.noun(entity);
        noun.has_verb(&self.verbs, direction, verb, descriptor)
            || noun
                .subclasses
                .iter()
                .any(|s| self.noun(s.entity).has_verb(&self.verbs, direction, verb, descriptor))
    }

    pub fn summary(&self, id: EntityId) -> EntitySummary {
        let key = self.key(id);
        let noun = self.noun(id);
        let verb_names = |direction: Direction| -> Vec<String> {
            noun.relations(direction)
                .iter()
                .map(|entry| self.verbs.resolve(entry.verb).to_string())
                .collect()
        };

        EntitySummary {
            name: key.name.clone(),
            id: key.id,
            definition: noun.has_definition().then(|| noun.definition.clone()),
            outgoing_verbs: verb_names(Direction::Outgoing),
            incoming_verbs: verb_names(Direction::Incoming),
            relation_count: noun.search_heap.len(),
            subclass_count: noun.subclasses.len(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            entities: self.nouns.len(),
            verbs: self.verbs.len(),
            descriptors: self.descriptors.len(),
            facts: self.facts,
            noun_tree_height: self.nouns.height(),
            verb_tree_height: self.verbs.height(),
            descriptor_tree_height: self.descriptors.height(),
        }
    }

    /// Check the ordering and balance of every tree and the heap property
    /// of every heap.
    pub fn check_invariants(&self) -> bool {
        if !self.nouns.is_balanced() || !self.nouns.is_ordered_by(|a, b| a.compare(b)) {
            return false;
        }
        self.nouns.iter().all(|(_, _, noun)| {
            noun.search_heap.is_heap()
                && noun.subclasses.is_heap()
                && [&noun.outgoing, &noun.incoming].iter().all(|index| {
                    index.is_ordered(&self.verbs) && index.iter().all(|entry| entry.heap.is_heap())
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat_fact() -> Fact {
        Fact::new("cat", "is", "mammal")
            .with_ids(1, 2)
            .with_weights(5, 3)
            .with_descriptor("a")
            .with_definition("a small feline")
    }

    #[test]
    fn test_insert_creates_three_entities() {
        let mut graph = Graph::new();
        graph.insert_fact(&cat_fact()).unwrap();

        let stats = graph.stats();
        assert_eq!(stats.entities, 3);
        assert_eq!(stats.verbs, 1);
        assert_eq!(stats.descriptors, 1);
        assert_eq!(stats.facts, 1);

        let compound = graph.entity("cat_mammal", UNSPECIFIED_ID).unwrap();
        assert_eq!(graph.noun(compound).definition, "a small feline");
        assert!(graph.entity("cat", 1).is_some());
        assert!(graph.entity("cat", 2).is_none());
    }

    #[test]
    fn test_outgoing_edge_targets_compound() {
        let mut graph = Graph::new();
        graph.insert_fact(&cat_fact()).unwrap();

        let cat = graph.entity("cat", 1).unwrap();
        let compound = graph.entity("cat_mammal", UNSPECIFIED_ID).unwrap();
        let entry = graph.noun(cat).outgoing.lookup(graph.verbs(), "is").unwrap();
        let edge = entry.heap.peek().unwrap();

        assert_eq!(edge.target, compound);
        assert_eq!(edge.weight, 5);
        assert!(edge.truth);
        assert_eq!(graph.descriptors().resolve(edge.descriptor), "a");
        assert_eq!(graph.noun(cat).search_heap.len(), 1);
    }

    #[test]
    fn test_incoming_and_subclass_links() {
        let mut graph = Graph::new();
        graph.insert_fact(&cat_fact()).unwrap();

        let cat = graph.entity("cat", 1).unwrap();
        let mammal = graph.entity("mammal", 2).unwrap();
        let compound = graph.entity("cat_mammal", UNSPECIFIED_ID).unwrap();

        let back = graph.noun(compound).incoming.lookup(graph.verbs(), "is").unwrap();
        assert_eq!(back.heap.peek().unwrap().target, cat);
        assert_eq!(back.heap.peek().unwrap().weight, 3);
        assert!(graph.noun(compound).search_heap.is_empty());

        let sub = graph.noun(mammal).subclasses.peek().unwrap();
        assert_eq!(sub.entity, compound);
        assert_eq!(sub.weight, 5);
    }

    #[test]
    fn test_repeated_fact_accumulates_weight() {
        let mut graph = Graph::new();
        let fact = cat_fact();
        graph.insert_fact(&fact).unwrap();
        let shape = graph.stats();

        for _ in 0..9 {
            graph.insert_fact(&fact).unwrap();
        }

        let after = graph.stats();
        assert_eq!(after.entities, shape.entities);
        assert_eq!(after.verbs, shape.verbs);
        assert_eq!(after.descriptors, shape.descriptors);
        assert_eq!(after.facts, 10);

        let cat = graph.entity("cat", 1).unwrap();
        let noun = graph.noun(cat);
        let entry = noun.outgoing.lookup(graph.verbs(), "is").unwrap();
        assert_eq!(entry.heap.len(), 1);
        assert_eq!(entry.heap.peek().unwrap().weight, 50);
        assert_eq!(noun.search_heap.len(), 1);
        assert_eq!(noun.search_heap.peek().unwrap().edge.weight, 50);

        let mammal = graph.entity("mammal", 2).unwrap();
        assert_eq!(graph.noun(mammal).subclasses.peek().unwrap().weight, 50);
        let compound = graph.entity("cat_mammal", UNSPECIFIED_ID).unwrap();
        let back = graph.noun(compound).incoming.lookup(graph.verbs(), "is").unwrap();
        assert_eq!(back.heap.peek().unwrap().weight, 30);
    }

    #[test]
    fn test_negation_is_a_distinct_connection() {
        let mut graph = Graph::new();
        graph.insert_fact(&cat_fact()).unwrap();
        graph.insert_fact(&cat_fact().negated()).unwrap();

        let cat = graph.entity("cat", 1).unwrap();
        let entry = graph.noun(cat).outgoing.lookup(graph.verbs(), "is").unwrap();
        assert_eq!(entry.heap.len(), 2);
        assert_eq!(graph.noun(cat).search_heap.len(), 2);
    }

    #[test]
    fn test_empty_definition_keeps_existing() {
        let mut graph = Graph::new();
        graph.insert_fact(&cat_fact()).unwrap();
        graph.insert_fact(&cat_fact().with_definition("")).unwrap();

        let compound = graph.entity("cat_mammal", UNSPECIFIED_ID).unwrap();
        assert_eq!(graph.noun(compound).definition, "a small feline");

        graph.insert_fact(&cat_fact().with_definition("a pet")).unwrap();
        assert_eq!(graph.noun(compound).definition, "a pet");
    }

    #[test]
    fn test_same_name_different_ids_coexist() {
        let mut graph = Graph::new();
        graph
            .insert_fact(&Fact::new("bank", "is", "river edge").with_ids(2, 1))
            .unwrap();
        graph
            .insert_fact(&Fact::new("bank", "is", "institution").with_ids(1, 1))
            .unwrap();

        let first = graph.entity("bank", 1).unwrap();
        let second = graph.entity("bank", 2).unwrap();
        assert_ne!(first, second);
        // The sentinel falls back to the smallest id in key order.
        assert_eq!(graph.entity("bank", UNSPECIFIED_ID), Some(first));
        assert!(graph.require_entity("bank", 3).is_err());
    }

    #[test]
    fn test_fuzzy_candidates() {
        let mut graph = Graph::new();
        graph
            .insert_fact(&Fact::new("elephant", "is", "animal").with_ids(4, 1))
            .unwrap();

        let found = graph.fuzzy_candidates("elephnt", 4, 60);
        let names: Vec<&str> = found.iter().map(|id| graph.name(*id)).collect();
        assert_eq!(names, vec!["elephant"]);

        assert!(graph.fuzzy_candidates("elephnt", 5, 60).is_empty());
        assert_eq!(graph.fuzzy_candidates("elephnt", UNSPECIFIED_ID, 60).len(), 1);
    }

    #[test]
    fn test_rejects_empty_names() {
        let mut graph = Graph::new();
        let err = graph.insert_fact(&Fact::new("cat", " ", "mammal")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(graph.entity_count(), 0);
    }

    #[test]
    fn test_invariants_hold_across_many_facts() {
        let mut graph = Graph::new();
        let verbs = ["is", "has", "eats", "lives in"];
        for step in 0..300usize {
            let subject = format!("s{}", (step * 37) % 61);
            let object = format!("o{}", (step * 11) % 23);
            let fact = Fact::new(subject, verbs[step % verbs.len()], object)
                .with_weights((step % 7) as i64 + 1, (step % 3) as i64 + 1)
                .with_descriptor(if step % 2 == 0 { "a" } else { "" });
            graph.insert_fact(&fact).unwrap();
            assert!(graph.check_invariants(), "invariant broken at step {}", step);
        }
        assert_eq!(graph.stats().verbs, 4);
    }

    #[test]
    fn test_summary() {
        let mut graph = Graph::new();
        graph.insert_fact(&cat_fact()).unwrap();
        graph
            .insert_fact(&Fact::new("cat", "eats", "fish").with_ids(1, 3))
            .unwrap();

        let cat = graph.entity("cat", 1).unwrap();
        let summary = graph.summary(cat);
        assert_eq!(summary.outgoing_verbs, vec!["eats", "is"]);
        assert!(summary.incoming_verbs.is_empty());
        assert_eq!(summary.relation_count, 2);
        assert!(summary.definition.is_none());
    }
}
