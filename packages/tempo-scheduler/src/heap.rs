use std::cmp::Ordering;

/// An entry that can live in a [`MinHeap`].
pub trait HeapEntry {
    /// Primary ordering key, ascending. Must never be NaN.
    fn sort_index(&self) -> f64;

    /// Secondary ordering key, ascending. Unique across live entries, which
    /// makes the order total and preserves creation order on ties.
    fn id(&self) -> u64;
}

/// Array-backed binary min-heap ordered by `(sort_index, id)` ascending.
///
/// There is deliberately no removal-by-key operation: an array heap only
/// supports root removal in O(log n), so consumers cancel entries by marking
/// them dead and skipping them when they surface at the root. Heap length is
/// therefore not a tight bound on the number of live entries.
pub struct MinHeap<T: HeapEntry> {
    nodes: Vec<T>,
}

impl<T: HeapEntry> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HeapEntry> MinHeap<T> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts an entry in O(log n).
    pub fn push(&mut self, node: T) {
        self.nodes.push(node);
        self.sift_up(self.nodes.len() - 1);
    }

    /// Returns the minimum entry without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.nodes.first()
    }

    /// Removes and returns the minimum entry in O(log n).
    pub fn pop(&mut self) -> Option<T> {
        if self.nodes.is_empty() {
            return None;
        }
        let last = self.nodes.len() - 1;
        self.nodes.swap(0, last);
        let min = self.nodes.pop();
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        min
    }

    fn less(a: &T, b: &T) -> bool {
        // Sort indices are plain time values, never NaN.
        match a
            .sort_index()
            .partial_cmp(&b.sort_index())
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a.id() < b.id(),
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if Self::less(&self.nodes[index], &self.nodes[parent]) {
                self.nodes.swap(index, parent);
                index = parent;
            } else {
                return;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.nodes.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && Self::less(&self.nodes[left], &self.nodes[smallest]) {
                smallest = left;
            }
            if right < len && Self::less(&self.nodes[right], &self.nodes[smallest]) {
                smallest = right;
            }
            if smallest == index {
                return;
            }
            self.nodes.swap(index, smallest);
            index = smallest;
        }
    }
}
