//! In-memory ring of recent samples
//!
//! The only retention this system has: a bounded ring the hub appends to on
//! every successful sample. Oldest entries are evicted when full.

use std::collections::VecDeque;

use crate::SystemSnapshot;

/// Default number of samples kept (5 minutes at the 1s broadcast interval).
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

#[derive(Debug)]
pub struct SampleHistory {
    samples: VecDeque<SystemSnapshot>,
    capacity: usize,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: SystemSnapshot) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
    }

    /// Most recent samples, newest first.
    pub fn recent(&self, limit: usize) -> Vec<SystemSnapshot> {
        self.samples.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
