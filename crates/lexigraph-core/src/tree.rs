//! Append-only AVL tree stored in an index arena
//!
//! Nodes live in a `Vec` and are never moved or removed, so a [`NodeId`]
//! stays valid for the lifetime of the tree. Rotations only relink child
//! indices. This lets the noun tree double as the entity arena and the verb
//! and descriptor trees double as string interners.
//!
//! Height of an empty subtree is 0 and of a leaf is 1. The balance factor
//! of a node is `height(left) - height(right)`; insertion keeps it within
//! `-1..=1` everywhere by applying LL, RR, LR or RL rotations on the way
//! back up from the new leaf.

use std::cmp::Ordering;

use crate::text::compare_ignore_case;

/// Stable index of a node inside one [`OrderedTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Keys that know their own order.
///
/// Trees whose keys need outside context to compare (for example interned
/// symbols) use the `*_by` methods instead.
pub trait TreeKey {
    fn compare(&self, other: &Self) -> Ordering;
}

impl TreeKey for String {
    fn compare(&self, other: &Self) -> Ordering {
        compare_ignore_case(self, other)
    }
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    left: Option<NodeId>,
    right: Option<NodeId>,
    height: u32,
}

/// Self-balancing binary search tree with arena storage
#[derive(Debug, Clone)]
pub struct OrderedTree<K, V> {
    nodes: Vec<Node<K, V>>,
    root: Option<NodeId>,
}

impl<K, V> Default for OrderedTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OrderedTree<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn key(&self, id: NodeId) -> &K {
        &self.node(id).key
    }

    pub fn get(&self, id: NodeId) -> &V {
        &self.node(id).value
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut V {
        &mut self.nodes[id.0].value
    }

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    /// Height of the whole tree (0 when empty).
    pub fn height(&self) -> u32 {
        self.subtree_height(self.root)
    }

    /// Height of the subtree rooted at `id`.
    pub fn node_height(&self, id: NodeId) -> u32 {
        self.node(id).height
    }

    /// `height(left) - height(right)` for the node `id`.
    pub fn balance_factor(&self, id: NodeId) -> i64 {
        let node = self.node(id);
        i64::from(self.subtree_height(node.left)) - i64::from(self.subtree_height(node.right))
    }

    /// Binary search guided by `probe`, which must return how a node's key
    /// orders relative to the sought key.
    pub fn find_by<F>(&self, mut probe: F) -> Option<NodeId>
    where
        F: FnMut(&K) -> Ordering,
    {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = self.node(id);
            cursor = match probe(&node.key) {
                Ordering::Greater => node.left,
                Ordering::Less => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    /// Insert `key` unless an equal key exists.
    ///
    /// Returns the node holding the key and whether it was newly created.
    /// `make` is only called when a node is created.
    pub fn insert_by<F, C>(&mut self, key: K, make: F, mut cmp: C) -> (NodeId, bool)
    where
        F: FnOnce() -> V,
        C: FnMut(&K, &K) -> Ordering,
    {
        if let Some(existing) = self.find_by(|k| cmp(k, &key)) {
            return (existing, false);
        }

        // The arena is append-only, so the new node takes the next slot.
        let id = NodeId(self.nodes.len());
        let value = make();
        let root = self.root;
        let new_root = self.insert_at(root, key, value, &mut cmp);
        self.root = Some(new_root);

        tracing::trace!("Inserted tree node {} (height now {})", id, self.height());
        (id, true)
    }

    /// Node ids in key order.
    pub fn in_order(&self) -> InOrder<'_, K, V> {
        InOrder {
            tree: self,
            stack: Vec::new(),
            next: self.root,
        }
    }

    /// Node ids in root-left-right order.
    pub fn preorder(&self) -> Preorder<'_, K, V> {
        Preorder {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }

    /// `(id, key, value)` triples in key order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &K, &V)> + '_ {
        self.in_order().map(move |id| {
            let node = self.node(id);
            (id, &node.key, &node.value)
        })
    }

    /// Check that every node's balance factor is within `-1..=1` and its
    /// cached height matches its children.
    pub fn is_balanced(&self) -> bool {
        self.nodes.iter().all(|node| {
            let lh = self.subtree_height(node.left);
            let rh = self.subtree_height(node.right);
            let bf = i64::from(lh) - i64::from(rh);
            bf.abs() <= 1 && node.height == 1 + lh.max(rh)
        })
    }

    /// Check that an in-order walk yields strictly increasing keys.
    pub fn is_ordered_by<C>(&self, mut cmp: C) -> bool
    where
        C: FnMut(&K, &K) -> Ordering,
    {
        let ids: Vec<NodeId> = self.in_order().collect();
        ids.len() == self.nodes.len()
            && ids
                .windows(2)
                .all(|w| cmp(self.key(w[0]), self.key(w[1])) == Ordering::Less)
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.0]
    }

    fn subtree_height(&self, id: Option<NodeId>) -> u32 {
        id.map_or(0, |id| self.node(id).height)
    }

    fn update_height(&mut self, id: NodeId) {
        let node = self.node(id);
        let height = 1 + self
            .subtree_height(node.left)
            .max(self.subtree_height(node.right));
        self.node_mut(id).height = height;
    }

    fn push(&mut self, key: K, value: V) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            key,
            value,
            left: None,
            right: None,
            height: 1,
        });
        id
    }

    /// Recursive insert returning the (possibly new) root of the subtree.
    fn insert_at<C>(&mut self, at: Option<NodeId>, key: K, value: V, cmp: &mut C) -> NodeId
    where
        C: FnMut(&K, &K) -> Ordering,
    {
        let p = match at {
            None => return self.push(key, value),
            Some(p) => p,
        };

        match cmp(&self.node(p).key, &key) {
            Ordering::Greater => {
                let left = self.node(p).left;
                let child = self.insert_at(left, key, value, cmp);
                self.node_mut(p).left = Some(child);
            }
            Ordering::Less => {
                let right = self.node(p).right;
                let child = self.insert_at(right, key, value, cmp);
                self.node_mut(p).right = Some(child);
            }
            Ordering::Equal => return p,
        }

        self.update_height(p);
        self.rebalance(p)
    }

    fn rebalance(&mut self, p: NodeId) -> NodeId {
        let node = self.node(p);
        match (self.balance_factor(p), node.left, node.right) {
            (2, Some(left), _) => {
                if self.balance_factor(left) == -1 {
                    tracing::trace!("LR rotation at {}", p);
                    self.rotate_lr(p, left)
                } else {
                    tracing::trace!("LL rotation at {}", p);
                    self.rotate_ll(p, left)
                }
            }
            (-2, _, Some(right)) => {
                if self.balance_factor(right) == 1 {
                    tracing::trace!("RL rotation at {}", p);
                    self.rotate_rl(p, right)
                } else {
                    tracing::trace!("RR rotation at {}", p);
                    self.rotate_rr(p, right)
                }
            }
            _ => p,
        }
    }

    /// Single right rotation for a left-left imbalance.
    fn rotate_ll(&mut self, p: NodeId, left: NodeId) -> NodeId {
        let moved = self.node(left).right;
        self.node_mut(p).left = moved;
        self.node_mut(left).right = Some(p);
        self.update_height(p);
        self.update_height(left);
        left
    }

    /// Single left rotation for a right-right imbalance.
    fn rotate_rr(&mut self, p: NodeId, right: NodeId) -> NodeId {
        let moved = self.node(right).left;
        self.node_mut(p).right = moved;
        self.node_mut(right).left = Some(p);
        self.update_height(p);
        self.update_height(right);
        right
    }

    fn rotate_lr(&mut self, p: NodeId, left: NodeId) -> NodeId {
        let pivot = match self.node(left).right {
            Some(pivot) => pivot,
            None => return self.rotate_ll(p, left),
        };
        let new_left = self.rotate_rr(left, pivot);
        self.node_mut(p).left = Some(new_left);
        self.rotate_ll(p, new_left)
    }

    fn rotate_rl(&mut self, p: NodeId, right: NodeId) -> NodeId {
        let pivot = match self.node(right).left {
            Some(pivot) => pivot,
            None => return self.rotate_rr(p, right),
        };
        let new_right = self.rotate_ll(right, pivot);
        self.node_mut(p).right = Some(new_right);
        self.rotate_rr(p, new_right)
    }
}

impl<K: TreeKey, V> OrderedTree<K, V> {
    /// Insert using the key's own order. See [`OrderedTree::insert_by`].
    pub fn insert(&mut self, key: K, value: V) -> (NodeId, bool) {
        self.insert_by(key, || value, |a, b| a.compare(b))
    }

    /// Exact lookup using the key's own order.
    pub fn search(&self, key: &K) -> Option<NodeId> {
        self.find_by(|k| k.compare(key))
    }

    pub fn is_ordered(&self) -> bool {
        self.is_ordered_by(|a, b| a.compare(b))
    }
}

/// In-order iterator over node ids
pub struct InOrder<'a, K, V> {
    tree: &'a OrderedTree<K, V>,
    stack: Vec<NodeId>,
    next: Option<NodeId>,
}

impl<K, V> Iterator for InOrder<'_, K, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.next {
            self.stack.push(id);
            self.next = self.tree.node(id).left;
        }
        let id = self.stack.pop()?;
        self.next = self.tree.node(id).right;
        Some(id)
    }
}

/// Preorder iterator over node ids
pub struct Preorder<'a, K, V> {
    tree: &'a OrderedTree<K, V>,
    stack: Vec<NodeId>,
}

impl<K, V> Iterator for Preorder<'_, K, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        if let Some(right) = node.right {
            self.stack.push(right);
        }
        if let Some(left) = node.left {
            self.stack.push(left);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tree: &OrderedTree<String, ()>) -> Vec<String> {
        tree.iter().map(|(_, k, _)| k.clone()).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree: OrderedTree<String, ()> = OrderedTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert!(tree.search(&"x".to_string()).is_none());
        assert_eq!(tree.in_order().count(), 0);
    }

    #[test]
    fn test_leaf_height_is_one() {
        let mut tree = OrderedTree::new();
        let (id, created) = tree.insert("cat".to_string(), ());
        assert!(created);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_height(id), 1);
        assert_eq!(tree.balance_factor(id), 0);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut tree = OrderedTree::new();
        let (first, _) = tree.insert("Cat".to_string(), 1);
        let (second, created) = tree.insert("cAT".to_string(), 2);

        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(tree.len(), 1);
        assert_eq!(*tree.get(first), 1);
        assert_eq!(tree.key(first), "Cat");
    }

    #[test]
    fn test_ll_rotation() {
        let mut tree = OrderedTree::new();
        for w in ["c", "b", "a"] {
            tree.insert(w.to_string(), ());
        }
        let root = tree.root().unwrap();
        assert_eq!(tree.key(root), "b");
        assert_eq!(tree.height(), 2);
        assert!(tree.is_balanced());
    }

    #[test]
    fn test_rr_rotation() {
        let mut tree = OrderedTree::new();
        for w in ["a", "b", "c"] {
            tree.insert(w.to_string(), ());
        }
        assert_eq!(tree.key(tree.root().unwrap()), "b");
        assert!(tree.is_balanced());
    }

    #[test]
    fn test_lr_rotation() {
        let mut tree = OrderedTree::new();
        for w in ["c", "a", "b"] {
            tree.insert(w.to_string(), ());
        }
        let root = tree.root().unwrap();
        assert_eq!(tree.key(root), "b");
        assert_eq!(tree.key(tree.left(root).unwrap()), "a");
        assert_eq!(tree.key(tree.right(root).unwrap()), "c");
    }

    #[test]
    fn test_rl_rotation() {
        let mut tree = OrderedTree::new();
        for w in ["a", "c", "b"] {
            tree.insert(w.to_string(), ());
        }
        assert_eq!(tree.key(tree.root().unwrap()), "b");
        assert!(tree.is_balanced());
    }

    #[test]
    fn test_node_ids_are_stable_across_rotations() {
        let mut tree = OrderedTree::new();
        let mut ids = Vec::new();
        for i in 0..100u32 {
            let (id, _) = tree.insert(format!("key{:03}", i), i);
            ids.push(id);
        }
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(*tree.get(*id), i as u32);
            assert_eq!(tree.key(*id), &format!("key{:03}", i));
        }
    }

    #[test]
    fn test_invariants_hold_after_every_insert() {
        let mut tree = OrderedTree::new();
        // Deterministic scramble of 0..500 with a stride coprime to 500.
        for step in 0..500u64 {
            let n = (step * 263 + 17) % 500;
            tree.insert(format!("w{}", n), ());
            assert!(tree.is_balanced(), "unbalanced after inserting w{}", n);
            assert!(tree.is_ordered(), "out of order after inserting w{}", n);
        }
        assert_eq!(tree.len(), 500);
        // AVL height bound: h < 1.45 log2(n + 2)
        assert!(tree.height() <= 13);
    }

    #[test]
    fn test_in_order_is_case_insensitive_sorted() {
        let mut tree = OrderedTree::new();
        for w in ["pear", "Apple", "banana", "Cherry"] {
            tree.insert(w.to_string(), ());
        }
        assert_eq!(words(&tree), vec!["Apple", "banana", "Cherry", "pear"]);
    }

    #[test]
    fn test_preorder_starts_at_root() {
        let mut tree = OrderedTree::new();
        for w in ["d", "b", "f", "a", "c", "e", "g"] {
            tree.insert(w.to_string(), ());
        }
        let order: Vec<&str> = tree.preorder().map(|id| tree.key(id).as_str()).collect();
        assert_eq!(order, vec!["d", "b", "a", "c", "f", "e", "g"]);
    }

    #[test]
    fn test_insert_by_with_external_order() {
        // Keys are indices into a side table, ordered by the table's text.
        let table = ["zeta", "alpha", "mu"];
        let mut tree: OrderedTree<usize, ()> = OrderedTree::new();
        for i in 0..table.len() {
            tree.insert_by(i, || (), |a, b| table[*a].cmp(table[*b]));
        }
        let sorted: Vec<&str> = tree.in_order().map(|id| table[*tree.key(id)]).collect();
        assert_eq!(sorted, vec!["alpha", "mu", "zeta"]);

        let found = tree.find_by(|k| table[*k].cmp("mu")).unwrap();
        assert_eq!(*tree.key(found), 2);
    }
}
