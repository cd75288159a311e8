use super::config::TimeoutScope;
use crate::domain::BlockId;
use std::collections::HashMap;
use std::time::Instant;

/// Deadlines of blocks handed to the transport and not yet resolved.
#[derive(Debug, Default)]
pub struct TimeoutTracker {
    deadlines: HashMap<BlockId, Instant>,
}

impl TimeoutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, block_id: BlockId, deadline: Instant) {
        self.deadlines.insert(block_id, deadline);
    }

    /// Returns true if the block was being tracked.
    pub fn remove(&mut self, block_id: BlockId) -> bool {
        self.deadlines.remove(&block_id).is_some()
    }

    pub fn contains(&self, block_id: BlockId) -> bool {
        self.deadlines.contains_key(&block_id)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Tracked block ids, earliest deadline first.
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut entries: Vec<(BlockId, Instant)> =
            self.deadlines.iter().map(|(id, at)| (*id, *at)).collect();
        entries.sort_by_key(|(id, at)| (*at, *id));
        entries.into_iter().map(|(id, _)| id).collect()
    }

    /// Detects a delivery timeout at `now`.
    ///
    /// Returns the blocks declared lost, earliest deadline first, and stops
    /// tracking them. Empty when no deadline has passed.
    pub fn sweep(&mut self, now: Instant, scope: TimeoutScope) -> Vec<BlockId> {
        if !self.deadlines.values().any(|deadline| now >= *deadline) {
            return Vec::new();
        }

        let expired: Vec<BlockId> = match scope {
            TimeoutScope::AllInFlight => self.block_ids(),
            TimeoutScope::OverdueOnly => self
                .block_ids()
                .into_iter()
                .filter(|id| self.deadlines.get(id).is_some_and(|deadline| now >= *deadline))
                .collect(),
        };

        for block_id in &expired {
            self.deadlines.remove(block_id);
        }

        expired
    }
}
