use tempo_scheduler::heap::{HeapEntry, MinHeap};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    sort_index: f64,
    id: u64,
}

impl Entry {
    fn new(sort_index: f64, id: u64) -> Self {
        Self { sort_index, id }
    }
}

impl HeapEntry for Entry {
    fn sort_index(&self) -> f64 {
        self.sort_index
    }

    fn id(&self) -> u64 {
        self.id
    }
}

fn drain(heap: &mut MinHeap<Entry>) -> Vec<u64> {
    let mut ids = Vec::new();
    while let Some(entry) = heap.pop() {
        ids.push(entry.id);
    }
    ids
}

#[test]
fn test_pop_returns_entries_in_sort_index_order() {
    let mut heap = MinHeap::new();
    for (sort_index, id) in [(30.0, 1), (10.0, 2), (50.0, 3), (20.0, 4), (40.0, 5)] {
        heap.push(Entry::new(sort_index, id));
    }

    assert_eq!(drain(&mut heap), vec![2, 4, 1, 5, 3]);
}

#[test]
fn test_equal_sort_index_ties_break_on_id() {
    let mut heap = MinHeap::new();
    heap.push(Entry::new(7.0, 3));
    heap.push(Entry::new(7.0, 1));
    heap.push(Entry::new(7.0, 2));

    assert_eq!(drain(&mut heap), vec![1, 2, 3]);
}

#[test]
fn test_peek_is_non_destructive() {
    let mut heap = MinHeap::new();
    assert!(heap.peek().is_none());

    heap.push(Entry::new(2.0, 1));
    heap.push(Entry::new(1.0, 2));

    assert_eq!(heap.peek().map(|e| e.id), Some(2));
    assert_eq!(heap.peek().map(|e| e.id), Some(2));
    assert_eq!(heap.len(), 2);
}

#[test]
fn test_pop_on_empty_heap_returns_none() {
    let mut heap: MinHeap<Entry> = MinHeap::new();
    assert!(heap.pop().is_none());
    assert!(heap.is_empty());
}

#[test]
fn test_interleaved_push_and_pop_keeps_order() {
    let mut heap = MinHeap::new();
    heap.push(Entry::new(5.0, 1));
    heap.push(Entry::new(3.0, 2));

    assert_eq!(heap.pop().map(|e| e.id), Some(2));

    heap.push(Entry::new(1.0, 3));
    heap.push(Entry::new(4.0, 4));

    assert_eq!(heap.pop().map(|e| e.id), Some(3));
    assert_eq!(heap.pop().map(|e| e.id), Some(4));
    assert_eq!(heap.pop().map(|e| e.id), Some(1));
    assert!(heap.is_empty());
}

#[test]
fn test_large_descending_insertion() {
    let mut heap = MinHeap::new();
    for i in 0..256u64 {
        heap.push(Entry::new((256 - i) as f64, i));
    }

    let ids = drain(&mut heap);
    // Sort index descends with id, so pop order is exactly reversed.
    let expected: Vec<u64> = (0..256u64).rev().collect();
    assert_eq!(ids, expected);
}
