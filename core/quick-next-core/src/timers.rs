//! Single-slot deadline timers.
//!
//! Each timer kind holds at most one pending deadline. Scheduling a kind that
//! is already pending replaces it, which is what makes the watcher's debounce
//! coalesce bursts. Time is host-supplied milliseconds, so everything here is
//! deterministic.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    deadline: u64,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct TimerSlots<K> {
    pending: HashMap<K, Pending>,
    next_seq: u64,
}

impl<K> Default for TimerSlots<K> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Copy + Eq + Hash> TimerSlots<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` to fire at `now + delay`, replacing any earlier schedule.
    /// Returns true if a pending timer of this kind was cancelled.
    pub fn schedule(&mut self, kind: K, now: u64, delay: u64) -> bool {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending
            .insert(
                kind,
                Pending {
                    deadline: now.saturating_add(delay),
                    seq,
                },
            )
            .is_some()
    }

    pub fn cancel(&mut self, kind: K) -> bool {
        self.pending.remove(&kind).is_some()
    }

    pub fn is_pending(&self, kind: K) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn deadline(&self, kind: K) -> Option<u64> {
        self.pending.get(&kind).map(|pending| pending.deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline that is due at `now`, without removing it.
    pub fn peek_due(&self, now: u64) -> Option<u64> {
        self.earliest()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(_, pending)| pending.deadline)
    }

    /// Removes and returns the earliest due kind. Ties fire in schedule order.
    pub fn pop_due(&mut self, now: u64) -> Option<K> {
        let (kind, pending) = self.earliest()?;
        if pending.deadline > now {
            return None;
        }
        self.pending.remove(&kind);
        Some(kind)
    }

    fn earliest(&self) -> Option<(K, Pending)> {
        self.pending
            .iter()
            .min_by_key(|(_, pending)| (pending.deadline, pending.seq))
            .map(|(kind, pending)| (*kind, *pending))
    }
}
