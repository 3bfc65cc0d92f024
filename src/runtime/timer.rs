//! Deadline queue for bubble auto-clear timers
//!
//! Deadlines are measured on the store's virtual clock. Cancelling removes
//! the entry outright, so a cancelled timer can never fire; firing is still
//! guarded by the store against handles an actor no longer holds.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use super::actor::{ActorId, BubbleKind};

/// Identity of one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerHandle(pub u64);

/// Armed auto-clear for one actor's bubble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BubbleTimer {
    /// Handle stored on the bubble
    pub handle: TimerHandle,
    /// Virtual time at which the bubble clears
    pub deadline: Duration,
    /// Owner of the bubble
    pub actor: ActorId,
    /// Bubble the timer clears
    pub kind: BubbleKind,
}

impl PartialOrd for BubbleTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BubbleTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline, then oldest handle)
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

/// Pending bubble timers ordered by deadline
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<BubbleTimer>,
    next_handle: u64,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer and return its handle
    pub fn arm(&mut self, actor: ActorId, kind: BubbleKind, deadline: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.heap.push(BubbleTimer {
            handle,
            deadline,
            actor,
            kind,
        });
        handle
    }

    /// Cancel a timer; returns whether it was still pending
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.heap.len();
        self.heap.retain(|t| t.handle != handle);
        self.heap.len() != before
    }

    /// Cancel every timer owned by `actor`
    pub fn cancel_actor(&mut self, actor: ActorId) {
        self.heap.retain(|t| t.actor != actor);
    }

    /// Cancel every pending timer
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.heap.peek().map(|t| t.deadline)
    }

    /// Pop the earliest timer if it is due at `now`
    pub fn pop_due(&mut self, now: Duration) -> Option<BubbleTimer> {
        if self.heap.peek()?.deadline <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Whether `handle` is still pending
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.heap.iter().any(|t| t.handle == handle)
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no timers are pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut queue = TimerQueue::new();
        let late = queue.arm(ActorId(1), BubbleKind::Speech, Duration::from_secs(3));
        let early = queue.arm(ActorId(2), BubbleKind::Thought, Duration::from_secs(1));

        assert_eq!(queue.next_deadline(), Some(Duration::from_secs(1)));
        assert!(queue.pop_due(Duration::from_millis(999)).is_none());
        assert_eq!(queue.pop_due(Duration::from_secs(5)).unwrap().handle, early);
        assert_eq!(queue.pop_due(Duration::from_secs(5)).unwrap().handle, late);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_removes_entry() {
        let mut queue = TimerQueue::new();
        let a = queue.arm(ActorId(1), BubbleKind::Speech, Duration::from_secs(1));
        let b = queue.arm(ActorId(1), BubbleKind::Speech, Duration::from_secs(2));
        let c = queue.arm(ActorId(2), BubbleKind::Speech, Duration::from_secs(2));

        assert!(queue.cancel(a));
        assert!(!queue.cancel(a));
        assert!(queue.is_pending(b));

        queue.cancel_actor(ActorId(1));
        assert!(!queue.is_pending(b));
        assert!(queue.is_pending(c));
        assert_eq!(queue.len(), 1);
    }
}
