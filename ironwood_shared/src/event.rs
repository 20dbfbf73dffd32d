//! Event queue.
//!
//! Producers push events while handling messages; the consumer drains them
//! once per frame in push order. Nothing is delivered re-entrantly.

use std::collections::VecDeque;

/// FIFO queue of typed events.
#[derive(Debug)]
pub struct EventQueue<E> {
    queue: VecDeque<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an event into the queue.
    pub fn push(&mut self, e: E) {
        self.queue.push_back(e);
    }

    /// Drains all queued events, oldest first.
    pub fn drain(&mut self) -> Vec<E> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut q = EventQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.len(), 3);
        assert_eq!(q.drain(), vec![1, 2, 3]);
        assert!(q.is_empty());
        assert!(q.drain().is_empty());
    }
}
