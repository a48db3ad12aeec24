//! Binary min-heap addressable by item key.

use std::{cmp::Ordering, collections::HashMap, hash::Hash};

/// An element that can live in a [`PriorityQueue`].
pub trait PriorityItem {
    type Key: Eq + Hash + Clone + std::fmt::Debug;

    /// Unique key of the item inside one queue.
    fn key(&self) -> Self::Key;

    /// `Less` means `self` is dequeued before `other`.
    fn compare(&self, other: &Self) -> Ordering;
}

#[derive(Debug, Clone)]
pub struct PriorityQueue<T: PriorityItem> {
    heap: Vec<T>,
    positions: HashMap<T::Key, usize>,
}

impl<T: PriorityItem> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PriorityItem> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// # Panics
    /// If an item with the same key is already queued.
    pub fn enqueue(&mut self, item: T) {
        let key = item.key();
        assert!(
            !self.positions.contains_key(&key),
            "item with key {key:?} already exists in the queue"
        );
        self.heap.push(item);
        let idx = self.heap.len() - 1;
        self.positions.insert(key, idx);
        self.sift_up(idx);
    }

    pub fn dequeue(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            None
        } else {
            Some(self.remove_at(0))
        }
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.positions.contains_key(key)
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.positions.get(key).map(|&idx| &self.heap[idx])
    }

    /// Mutates the item stored under `key` and restores the heap order.
    /// Returns `false` when no such item is queued.
    pub fn update<F>(&mut self, key: &T::Key, change: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(&idx) = self.positions.get(key) else {
            return false;
        };
        change(&mut self.heap[idx]);
        self.restore(idx);
        true
    }

    /// Re-sifts the item under `key` after its priority changed.
    pub fn update_priority(&mut self, key: &T::Key) {
        if let Some(&idx) = self.positions.get(key) {
            self.restore(idx);
        }
    }

    /// # Panics
    /// If no item with `key` is queued.
    pub fn remove(&mut self, key: &T::Key) -> T {
        let idx = match self.positions.get(key) {
            Some(&idx) => idx,
            None => panic!("item with key {key:?} is not in the queue"),
        };
        self.remove_at(idx)
    }

    pub fn remove_where<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&T) -> bool,
    {
        let keys: Vec<T::Key> = self
            .heap
            .iter()
            .filter(|item| predicate(*item))
            .map(PriorityItem::key)
            .collect();
        for key in keys {
            self.remove(&key);
        }
    }

    fn remove_at(&mut self, idx: usize) -> T {
        let item = self.heap.swap_remove(idx);
        self.positions.remove(&item.key());
        if idx < self.heap.len() {
            self.positions.insert(self.heap[idx].key(), idx);
            self.restore(idx);
        }
        item
    }

    fn restore(&mut self, idx: usize) {
        let idx = self.sift_up(idx);
        self.sift_down(idx);
    }

    fn sift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[parent].compare(&self.heap[idx]) == Ordering::Greater {
                self.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
        idx
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            if left >= self.heap.len() {
                return;
            }
            let right = left + 1;
            let child = if right < self.heap.len()
                && self.heap[right].compare(&self.heap[left]) == Ordering::Less
            {
                right
            } else {
                left
            };
            if self.heap[idx].compare(&self.heap[child]) == Ordering::Greater {
                self.swap(idx, child);
                idx = child;
            } else {
                return;
            }
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.heap.swap(i, j);
        self.positions.insert(self.heap[i].key(), i);
        self.positions.insert(self.heap[j].key(), j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Job {
        id: u32,
        priority: i32,
    }

    impl PriorityItem for Job {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }

        fn compare(&self, other: &Self) -> Ordering {
            self.priority.cmp(&other.priority)
        }
    }

    fn job(id: u32, priority: i32) -> Job {
        Job { id, priority }
    }

    fn drain(queue: &mut PriorityQueue<Job>) -> Vec<u32> {
        std::iter::from_fn(|| queue.dequeue()).map(|j| j.id).collect()
    }

    #[test]
    fn test_dequeues_in_priority_order() {
        let mut queue = PriorityQueue::new();
        for (id, priority) in [(1, 5), (2, 1), (3, 9), (4, 3), (5, 7)] {
            queue.enqueue(job(id, priority));
        }
        assert_eq!(queue.peek().map(|j| j.id), Some(2));
        assert_eq!(drain(&mut queue), vec![2, 4, 1, 5, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_update_priority_reorders() {
        let mut queue = PriorityQueue::new();
        for (id, priority) in [(1, 5), (2, 6), (3, 7)] {
            queue.enqueue(job(id, priority));
        }
        assert!(queue.update(&3, |j| j.priority = 0));
        assert!(queue.update(&1, |j| j.priority = 10));
        assert!(!queue.update(&42, |j| j.priority = 0));
        assert_eq!(drain(&mut queue), vec![3, 2, 1]);
    }

    #[test]
    fn test_lookup_and_remove() {
        let mut queue = PriorityQueue::new();
        for (id, priority) in [(1, 4), (2, 2), (3, 8), (4, 6)] {
            queue.enqueue(job(id, priority));
        }
        assert!(queue.contains(&3));
        assert_eq!(queue.get(&3).map(|j| j.priority), Some(8));
        assert_eq!(queue.remove(&2).id, 2);
        assert!(!queue.contains(&2));
        queue.remove_where(|j| j.priority > 5);
        assert_eq!(queue.len(), 1);
        assert_eq!(drain(&mut queue), vec![1]);
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn test_duplicate_key_panics() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(job(1, 1));
        queue.enqueue(job(1, 2));
    }

    #[test]
    #[should_panic(expected = "not in the queue")]
    fn test_remove_absent_panics() {
        let mut queue: PriorityQueue<Job> = PriorityQueue::new();
        queue.remove(&7);
    }
}
