//! The block inventory collaborator consulted when placing and erasing.
//!
//! The simulation treats the inventory as optional: without one, placement
//! is unlimited and refunds are discarded.

use std::collections::BTreeMap;

use crate::id::DefinitionId;

/// Counts of placeable blocks the player holds.
pub trait Inventory: std::fmt::Debug {
    /// Whether at least `count` units of `definition` are held.
    fn has_block(&self, definition: DefinitionId, count: u32) -> bool;

    /// Remove `count` units if all are available. All-or-nothing.
    fn try_consume(&mut self, definition: DefinitionId, count: u32) -> bool;

    /// Add `count` units if they fit. All-or-nothing.
    fn try_add_block(&mut self, definition: DefinitionId, count: u32) -> bool;
}

/// A simple per-definition counter with an optional per-definition cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockInventory {
    counts: BTreeMap<DefinitionId, u32>,
    stack_limit: Option<u32>,
}

impl BlockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// An inventory that refuses additions beyond `limit` per definition.
    pub fn with_stack_limit(limit: u32) -> Self {
        Self {
            counts: BTreeMap::new(),
            stack_limit: Some(limit),
        }
    }

    /// Builder-style seeding, ignoring the stack limit.
    pub fn with_blocks(mut self, definition: DefinitionId, count: u32) -> Self {
        *self.counts.entry(definition).or_insert(0) += count;
        self
    }

    pub fn count(&self, definition: DefinitionId) -> u32 {
        self.counts.get(&definition).copied().unwrap_or(0)
    }
}

impl Inventory for BlockInventory {
    fn has_block(&self, definition: DefinitionId, count: u32) -> bool {
        self.count(definition) >= count
    }

    fn try_consume(&mut self, definition: DefinitionId, count: u32) -> bool {
        match self.counts.get_mut(&definition) {
            Some(held) if *held >= count => {
                *held -= count;
                if *held == 0 {
                    self.counts.remove(&definition);
                }
                true
            }
            _ => count == 0,
        }
    }

    fn try_add_block(&mut self, definition: DefinitionId, count: u32) -> bool {
        let held = self.count(definition);
        let Some(total) = held.checked_add(count) else {
            return false;
        };
        if self.stack_limit.is_some_and(|limit| total > limit) {
            return false;
        }
        if total > 0 {
            self.counts.insert(definition, total);
        }
        true
    }
}
