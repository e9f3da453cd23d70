//! Pending-debt accumulator flushed to storage in bulk

use debtfeed_common::db::PendingDebt;
use std::collections::HashSet;
use uuid::Uuid;

/// Debts waiting for the next flush
///
/// Consumed and returned by value as rows are processed; [`Batch::take`]
/// hands out the contents and an empty batch of the same capacity.
#[derive(Debug)]
pub struct Batch {
    pending: Vec<PendingDebt>,
    external_ids: HashSet<Uuid>,
    capacity: usize,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            external_ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, external_id: &Uuid) -> bool {
        self.external_ids.contains(external_id)
    }

    pub fn push(mut self, debt: PendingDebt) -> Self {
        self.external_ids.insert(debt.external_id);
        self.pending.push(debt);
        self
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn take(self) -> (Vec<PendingDebt>, Batch) {
        let next = Batch::new(self.capacity);
        (self.pending, next)
    }
}
