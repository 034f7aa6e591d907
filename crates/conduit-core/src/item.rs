use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// A stack of fungible resource units of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}

/// Capacity-bounded storage of typed stacks.
///
/// Stacks keep the order in which their kinds first arrived, which is the
/// enumeration order extraction sees. Empty stacks are dropped eagerly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    stacks: Vec<ItemStack>,
    pub capacity: u32,
}

impl InventorySlot {
    pub fn new(capacity: u32) -> Self {
        Self {
            stacks: Vec::new(),
            capacity,
        }
    }

    /// Add fungible items. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn add(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let to_add = quantity.min(self.free_space());
        let overflow = quantity - to_add;

        if to_add > 0 {
            if let Some(stack) = self.stacks.iter_mut().find(|s| s.item_type == item_type) {
                stack.quantity += to_add;
            } else {
                self.stacks.push(ItemStack::new(item_type, to_add));
            }
        }

        overflow
    }

    /// Remove fungible items. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let Some(stack) = self.stacks.iter_mut().find(|s| s.item_type == item_type) else {
            return 0;
        };
        let to_remove = quantity.min(stack.quantity);
        stack.quantity -= to_remove;
        if stack.quantity == 0 {
            self.stacks.retain(|s| s.quantity > 0);
        }
        to_remove
    }

    /// Quantity of a specific item type.
    pub fn quantity(&self, item_type: ItemTypeId) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.item_type == item_type)
            .map(|s| s.quantity)
            .unwrap_or(0)
    }

    /// Total items across all types.
    pub fn total(&self) -> u32 {
        self.stacks.iter().map(|s| s.quantity).sum()
    }

    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    pub fn has_space(&self) -> bool {
        self.free_space() > 0
    }

    /// Non-empty stacks in enumeration order.
    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
