//! Array-backed binary max-heap keyed by an integer weight
//!
//! The relation-search, subclass and query heaps are all instances of
//! [`MaxHeap`]. Lookup is a linear scan: the heaps are small per entity and
//! exist for weight-ordered extraction.
//!
//! Queries never drain a live heap. They clone it (entries hold indices,
//! so the clone shares every target) and drain the clone.

/// Items ordered by an integer weight
pub trait Weighted {
    fn weight(&self) -> i64;
    fn add_weight(&mut self, delta: i64);
}

/// Binary max-heap: `weight(parent) >= weight(child)` for every slot
#[derive(Debug, Clone)]
pub struct MaxHeap<T> {
    items: Vec<T>,
}

impl<T> Default for MaxHeap<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Weighted> MaxHeap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Heaviest item without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Item at an array slot (as returned by [`MaxHeap::find`]).
    pub fn get(&self, pos: usize) -> Option<&T> {
        self.items.get(pos)
    }

    /// Items in array order (not weight order).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Append and sift up toward the root.
    pub fn insert(&mut self, item: T) {
        self.items.push(item);
        let last = self.items.len() - 1;
        self.sift_up(last);
    }

    /// Remove and return the heaviest item.
    pub fn extract_max(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        self.sift_down(0);
        top
    }

    /// Linear scan for the first slot whose item satisfies `pred`.
    pub fn find<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().position(pred)
    }

    /// Adjust the weight of the item at `pos` and restore the heap property.
    ///
    /// Returns the item's new slot.
    pub fn add_weight(&mut self, pos: usize, delta: i64) -> usize {
        self.modify(pos, |item| item.add_weight(delta))
    }

    /// Mutate the item at `pos` in place, then re-sift it.
    pub fn modify<F>(&mut self, pos: usize, f: F) -> usize
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.items[pos]);
        let pos = self.sift_up(pos);
        self.sift_down(pos)
    }

    /// Sum of all weights, the denominator for proportional line shares.
    pub fn sum_of_weights(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.weight()))
    }

    /// Consume the heap, yielding items heaviest first.
    pub fn into_sorted(self) -> IntoSorted<T> {
        IntoSorted { heap: self }
    }

    /// Whether the max-heap property holds at every slot.
    pub fn is_heap(&self) -> bool {
        (1..self.items.len()).all(|i| self.items[(i - 1) / 2].weight() >= self.items[i].weight())
    }

    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.items[i].weight() <= self.items[parent].weight() {
                break;
            }
            self.items.swap(i, parent);
            i = parent;
        }
        i
    }

    fn sift_down(&mut self, mut i: usize) -> usize {
        let len = self.items.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let larger = if right < len && self.items[right].weight() > self.items[left].weight() {
                right
            } else {
                left
            };
            if self.items[i].weight() >= self.items[larger].weight() {
                break;
            }
            self.items.swap(i, larger);
            i = larger;
        }
        i
    }
}

impl<T: Weighted + Clone> MaxHeap<T> {
    /// Independent heap holding clones of the items that satisfy `keep`.
    pub fn filtered<P>(&self, mut keep: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let mut out = Self::new();
        for item in self.items.iter().filter(|item| keep(item)) {
            out.insert(item.clone());
        }
        out
    }
}

/// Draining iterator returned by [`MaxHeap::into_sorted`]
pub struct IntoSorted<T> {
    heap: MaxHeap<T>,
}

impl<T: Weighted> Iterator for IntoSorted<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.heap.extract_max()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}

impl<T: Weighted> ExactSizeIterator for IntoSorted<T> {}
