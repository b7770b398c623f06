use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// A stack of fungible items of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }

    /// A stack holding exactly one item.
    pub fn one(item_type: ItemTypeId) -> Self {
        Self::new(item_type, 1)
    }
}

/// A single-slot item buffer (machine input or output). Holds at most one
/// item type at a time, up to `capacity` units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub stack: Option<ItemStack>,
    pub capacity: u32,
}

impl ItemSlot {
    pub fn new(capacity: u32) -> Self {
        Self {
            stack: None,
            capacity,
        }
    }

    /// Units currently held.
    pub fn quantity(&self) -> u32 {
        self.stack.as_ref().map(|s| s.quantity).unwrap_or(0)
    }

    /// Units of `item_type` currently held.
    pub fn quantity_of(&self, item_type: ItemTypeId) -> u32 {
        match &self.stack {
            Some(s) if s.item_type == item_type => s.quantity,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity() == 0
    }

    /// Whether `quantity` units of `item_type` would fit.
    pub fn can_accept(&self, item_type: ItemTypeId, quantity: u32) -> bool {
        match &self.stack {
            None => quantity <= self.capacity,
            Some(s) => s.item_type == item_type && s.quantity + quantity <= self.capacity,
        }
    }

    /// Insert a whole stack. On refusal the stack is handed back untouched.
    pub fn insert(&mut self, stack: ItemStack) -> Result<(), ItemStack> {
        if stack.quantity == 0 {
            return Ok(());
        }
        if !self.can_accept(stack.item_type, stack.quantity) {
            return Err(stack);
        }
        match &mut self.stack {
            Some(existing) => existing.quantity += stack.quantity,
            None => self.stack = Some(stack),
        }
        Ok(())
    }

    /// Remove up to `quantity` units. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, quantity: u32) -> u32 {
        let Some(stack) = &mut self.stack else {
            return 0;
        };
        let removed = quantity.min(stack.quantity);
        stack.quantity -= removed;
        if stack.quantity == 0 {
            self.stack = None;
        }
        removed
    }

    /// Split a single unit off the slot.
    pub fn take_one(&mut self) -> Option<ItemStack> {
        let item_type = self.stack.as_ref()?.item_type;
        (self.remove(1) == 1).then(|| ItemStack::one(item_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_insert_and_take() {
        let mut slot = ItemSlot::new(5);
        let iron = ItemTypeId(0);
        slot.insert(ItemStack::new(iron, 3)).unwrap();
        assert_eq!(slot.quantity_of(iron), 3);

        let one = slot.take_one().unwrap();
        assert_eq!(one, ItemStack::one(iron));
        assert_eq!(slot.quantity(), 2);
    }

    #[test]
    fn slot_rejects_other_item_type() {
        let mut slot = ItemSlot::new(5);
        slot.insert(ItemStack::one(ItemTypeId(0))).unwrap();
        let refused = slot.insert(ItemStack::one(ItemTypeId(1))).unwrap_err();
        assert_eq!(refused.item_type, ItemTypeId(1));
        assert_eq!(slot.quantity(), 1);
    }

    #[test]
    fn slot_rejects_overflow_whole() {
        let mut slot = ItemSlot::new(2);
        let iron = ItemTypeId(0);
        slot.insert(ItemStack::new(iron, 2)).unwrap();
        assert!(!slot.can_accept(iron, 1));
        assert!(slot.insert(ItemStack::one(iron)).is_err());
        assert_eq!(slot.quantity(), 2);
    }

    #[test]
    fn slot_empties_when_drained() {
        let mut slot = ItemSlot::new(4);
        slot.insert(ItemStack::new(ItemTypeId(7), 2)).unwrap();
        assert_eq!(slot.remove(10), 2);
        assert!(slot.is_empty());
        assert!(slot.stack.is_none());
        assert!(slot.take_one().is_none());
        // Empty slot accepts any type again.
        assert!(slot.can_accept(ItemTypeId(1), 4));
    }
}
