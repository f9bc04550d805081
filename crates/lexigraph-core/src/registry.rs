//! Interned verb and descriptor strings
//!
//! Each registry is an [`OrderedTree`] whose node ids double as symbols, so
//! a given text has exactly one entry and edges compare symbols instead of
//! strings.

use crate::text::compare_ignore_case;
use crate::tree::{NodeId, OrderedTree};

/// Handle to an interned string inside one [`Registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(NodeId);

/// Case-insensitive string interner backed by a balanced tree
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tree: OrderedTree<String, ()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the entry for `text`.
    ///
    /// The first spelling seen is the one kept.
    pub fn intern(&mut self, text: &str) -> Symbol {
        let (id, created) = self.tree.insert(text.to_string(), ());
        if created {
            tracing::trace!("Interned {:?} as {}", text, id);
        }
        Symbol(id)
    }

    /// Existing entry for `text`, if any.
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.tree
            .find_by(|key| compare_ignore_case(key, text))
            .map(Symbol)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lookup(text).is_some()
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.tree.key(symbol.0)
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

    /// Entries in case-insensitive order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> + '_ {
        self.tree.iter().map(|(id, key, _)| (Symbol(id), key.as_str()))
    }

    /// Order two symbols by their text.
    pub fn compare(&self, a: Symbol, b: Symbol) -> std::cmp::Ordering {
        compare_ignore_case(self.resolve(a), self.resolve(b))
    }
}
