//! Time-ordered queue of pending net writes.
//!
//! Events are kept in a binary min-heap keyed by `(time, sequence)`, so
//! events for the same timestamp pop in issuance order. Each (net, driver) pair
//! also keeps an index of its live events by time. Scheduling a write cancels
//! every pending write from the same driver to the same net at the same or a
//! later time; cancelled heap entries are skipped when they reach the top.
//! Writes from different drivers never cancel each other.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use nlsim_common::Logic;

use crate::ids::NetId;
use crate::net::Driver;
use crate::time::SimTime;

/// A write waiting to be committed to a net.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// When the level is committed.
    pub time: SimTime,
    /// Issuance order; unique per queue.
    pub seq: u64,
    /// The target net.
    pub net: NetId,
    /// Who issued the write.
    pub driver: Driver,
    /// The level to commit.
    pub level: Logic,
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Pending-event queue with last-write-wins per net and driver.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    /// Live events per net and driver: commit time -> sequence number.
    pending: HashMap<(NetId, Driver), BTreeMap<SimTime, u64>>,
    next_seq: u64,
    live: usize,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `level` from `driver` for `net` at `time` and returns the
    /// event's sequence number.
    ///
    /// Any live event from the same driver for the same net at `time` or later
    /// is cancelled.
    pub fn schedule(&mut self, time: SimTime, net: NetId, driver: Driver, level: Logic) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let per_source = self.pending.entry((net, driver)).or_default();
        let superseded = per_source.split_off(&time);
        self.live -= superseded.len();
        per_source.insert(time, seq);
        self.live += 1;

        self.heap.push(Reverse(ScheduledEvent {
            time,
            seq,
            net,
            driver,
            level,
        }));
        seq
    }

    /// Returns the time of the earliest live event.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.discard_stale();
        self.heap.peek().map(|Reverse(evt)| evt.time)
    }

    /// Removes and returns every live event at exactly `time`, in issuance order.
    pub fn pop_at(&mut self, time: SimTime) -> Vec<ScheduledEvent> {
        let mut events = Vec::new();
        loop {
            self.discard_stale();
            match self.heap.peek() {
                Some(Reverse(evt)) if evt.time == time => {}
                _ => break,
            }
            let Some(Reverse(evt)) = self.heap.pop() else {
                break;
            };
            let key = (evt.net, evt.driver);
            if let Some(per_source) = self.pending.get_mut(&key) {
                per_source.remove(&evt.time);
                if per_source.is_empty() {
                    self.pending.remove(&key);
                }
            }
            self.live -= 1;
            events.push(evt);
        }
        events
    }

    /// Returns the number of live (not superseded) events.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no live events remain.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drops every pending event.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
        self.live = 0;
    }

    fn is_live(&self, evt: &ScheduledEvent) -> bool {
        self.pending
            .get(&(evt.net, evt.driver))
            .and_then(|per_source| per_source.get(&evt.time))
            == Some(&evt.seq)
    }

    fn discard_stale(&mut self) {
        while let Some(Reverse(evt)) = self.heap.peek() {
            if self.is_live(evt) {
                break;
            }
            self.heap.pop();
        }
    }
}
