//! FIFO of pending entries.
//!
//! A singly-linked list stored in an arena: nodes live in a `Vec` and link to
//! each other by index, vacated slots are recycled through a free list. This
//! keeps enqueue and dequeue O(1) and allows removing an arbitrary element
//! without shifting the rest of the queue.

/// First-in, first-out queue.
#[derive(Debug, Clone)]
pub struct Queue<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    next: Option<usize>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` at the tail.
    pub fn add(&mut self, value: T) {
        let node = Node { value, next: None };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail.and_then(|t| self.slots[t].as_mut()) {
            Some(tail) => tail.next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    /// Removes and returns the head, or `None` when empty.
    pub fn take(&mut self) -> Option<T> {
        let idx = self.head?;
        let node = self.slots[idx].take()?;
        self.free.push(idx);

        self.head = node.next;
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(node.value)
    }

    /// Removes the first element matching `pred` and returns it.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        let mut prev: Option<usize> = None;
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            let node = self.slots[idx].as_ref()?;
            let next = node.next;

            if pred(&node.value) {
                let node = self.slots[idx].take()?;
                match prev.and_then(|p| self.slots[p].as_mut()) {
                    Some(prev_node) => prev_node.next = next,
                    None => self.head = next,
                }
                if self.tail == Some(idx) {
                    self.tail = prev;
                }
                self.free.push(idx);
                self.len -= 1;
                return Some(node.value);
            }

            prev = Some(idx);
            cursor = next;
        }
        None
    }

    /// Removes the first element equal to `value`.
    ///
    /// Returns `false` (and leaves the queue untouched) when nothing matches.
    pub fn remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.remove_where(|v| v == value).is_some()
    }

    /// Drains every element, head first.
    pub fn clear(&mut self) {
        while self.take().is_some() {}
        self.slots.clear();
        self.free.clear();
    }

    /// Iterates head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            cursor: self.head,
        }
    }

    /// Snapshot of the elements, head to tail.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

/// Borrowing iterator over a [`Queue`].
pub struct Iter<'a, T> {
    queue: &'a Queue<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.slots[self.cursor?].as_ref()?;
        self.cursor = node.next;
        Some(&node.value)
    }
}

impl<'a, T> IntoIterator for &'a Queue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    impl<T> Queue<T> {
        /// Checks the link structure against the cached bookkeeping.
        fn assert_consistent(&self) {
            let mut reachable = 0;
            let mut last = None;
            let mut cursor = self.head;
            while let Some(idx) = cursor {
                reachable += 1;
                last = Some(idx);
                cursor = self.slots[idx].as_ref().expect("link to vacant slot").next;
                assert!(reachable <= self.slots.len(), "cycle in queue links");
            }
            assert_eq!(reachable, self.len);
            assert_eq!(last, self.tail);
            assert_eq!(self.head.is_none(), self.tail.is_none());
        }
    }

    #[test]
    fn empty_queue() {
        let mut q: Queue<u32> = Queue::new();
        assert!(q.is_empty());
        assert_eq!(q.take(), None);
        assert!(q.to_vec().is_empty());
        q.assert_consistent();
    }

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        q.add("a");
        q.add("b");
        q.add("c");
        assert_eq!(q.len(), 3);
        assert_eq!(q.take(), Some("a"));
        assert_eq!(q.take(), Some("b"));
        q.add("d");
        assert_eq!(q.to_vec(), vec!["c", "d"]);
        q.assert_consistent();
    }

    #[test]
    fn take_last_resets_tail() {
        let mut q = Queue::new();
        q.add(1);
        assert_eq!(q.take(), Some(1));
        q.assert_consistent();
        q.add(2);
        assert_eq!(q.to_vec(), vec![2]);
        q.assert_consistent();
    }

    #[test]
    fn remove_head_middle_tail() {
        let mut q = Queue::new();
        for i in 1..=5 {
            q.add(i);
        }

        assert!(q.remove(&1));
        q.assert_consistent();
        assert!(q.remove(&3));
        q.assert_consistent();
        assert!(q.remove(&5));
        q.assert_consistent();

        assert_eq!(q.to_vec(), vec![2, 4]);
        q.add(6);
        assert_eq!(q.to_vec(), vec![2, 4, 6]);
        q.assert_consistent();
    }

    #[test]
    fn remove_only_element() {
        let mut q = Queue::new();
        q.add('x');
        assert!(q.remove(&'x'));
        assert!(q.is_empty());
        q.assert_consistent();
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut q = Queue::new();
        q.add(1);
        q.add(2);
        assert!(!q.remove(&9));
        assert_eq!(q.to_vec(), vec![1, 2]);
    }

    #[test]
    fn remove_first_of_duplicates() {
        let mut q = Queue::new();
        q.add((1, 'a'));
        q.add((2, 'b'));
        q.add((1, 'c'));
        assert_eq!(q.remove_where(|v| v.0 == 1), Some((1, 'a')));
        assert_eq!(q.to_vec(), vec![(2, 'b'), (1, 'c')]);
    }

    #[test]
    fn clear_empties_queue() {
        let mut q = Queue::new();
        q.add(1);
        q.add(2);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.take(), None);
        q.add(3);
        assert_eq!(q.to_vec(), vec![3]);
        q.assert_consistent();
    }

    #[test]
    fn slots_are_reused() {
        let mut q = Queue::new();
        for round in 0..10 {
            q.add(round);
            q.add(round + 100);
            q.take();
            q.take();
        }
        assert!(q.slots.len() <= 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8),
        Take,
        Remove(u8),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<u8>().prop_map(Op::Add),
            2 => Just(Op::Take),
            2 => (0u8..16).prop_map(Op::Remove),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_vecdeque(ops in proptest::collection::vec(op(), 0..200)) {
            let mut q = Queue::new();
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Op::Add(v) => {
                        let v = v % 16;
                        q.add(v);
                        model.push_back(v);
                    }
                    Op::Take => prop_assert_eq!(q.take(), model.pop_front()),
                    Op::Remove(v) => {
                        let pos = model.iter().position(|m| *m == v);
                        if let Some(pos) = pos {
                            model.remove(pos);
                        }
                        prop_assert_eq!(q.remove(&v), pos.is_some());
                    }
                    Op::Clear => {
                        q.clear();
                        model.clear();
                    }
                }
                q.assert_consistent();
                prop_assert_eq!(q.len(), model.len());
                prop_assert_eq!(q.to_vec(), model.iter().copied().collect::<Vec<_>>());
            }
        }
    }
}
