//! Storage endpoint capability and the seams that resolve it.
//!
//! The engine never sees concrete container types. It asks a
//! [`CapabilityProvider`] for the [`EndpointResolver`] of a position once,
//! then asks that resolver for the [`StorageEndpoint`] behind one face every
//! time it needs it. Absence is a normal answer: the caller skips the
//! candidate.

use crate::id::{Direction, ItemTypeId, Position};
use crate::item::{InventorySlot, ItemStack};
use crate::transaction::Transaction;
use std::cell::RefCell;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Transactional access to one face of a container.
///
/// `extract` and `insert` return the amount actually moved, which the
/// endpoint clamps to `max_amount` and to what it can hold or supply. Every
/// change is registered with `tx` so that aborting restores it.
pub trait StorageEndpoint {
    fn supports_extraction(&self) -> bool;

    fn supports_insertion(&self) -> bool;

    /// Non-empty contents in this endpoint's own enumeration order.
    fn contents(&self) -> Vec<ItemStack>;

    fn extract(&self, item: ItemTypeId, max_amount: u32, tx: &mut Transaction) -> u32;

    fn insert(&self, item: ItemTypeId, max_amount: u32, tx: &mut Transaction) -> u32;
}

/// Shared handle to an endpoint owned outside the engine.
pub type EndpointHandle = Rc<dyn StorageEndpoint>;

/// Per-position lookup of directional faces.
///
/// Implementations must answer for the current state of the world on every
/// call: a container that disappears is reported as `None`, not left to
/// cache eviction.
pub trait EndpointResolver {
    fn find(&self, direction: Direction) -> Option<EndpointHandle>;
}

/// Creates the per-position resolver. Called at most once per position per
/// interface node; the result is memoized by [`EndpointCache`](crate::cache::EndpointCache).
pub trait CapabilityProvider {
    fn resolver(&self, pos: Position) -> Rc<dyn EndpointResolver>;
}

// ---------------------------------------------------------------------------
// Inventory-backed endpoint
// ---------------------------------------------------------------------------

/// Which operations a face permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Access {
    pub extract: bool,
    pub insert: bool,
}

impl Access {
    pub const BOTH: Access = Access {
        extract: true,
        insert: true,
    };
    pub const EXTRACT_ONLY: Access = Access {
        extract: true,
        insert: false,
    };
    pub const INSERT_ONLY: Access = Access {
        extract: false,
        insert: true,
    };
}

pub type SharedInventory = Rc<RefCell<InventorySlot>>;

/// A [`StorageEndpoint`] over a shared [`InventorySlot`].
///
/// Before each mutation the endpoint captures the slot's full state and
/// registers its restoration, so an abort also restores enumeration order.
#[derive(Debug, Clone)]
pub struct InventoryEndpoint {
    inventory: SharedInventory,
    access: Access,
}

impl InventoryEndpoint {
    pub fn new(inventory: SharedInventory, access: Access) -> Self {
        Self { inventory, access }
    }

    fn stage(&self, tx: &mut Transaction) {
        let before = self.inventory.borrow().clone();
        let inventory = Rc::clone(&self.inventory);
        tx.on_abort(move || {
            *inventory.borrow_mut() = before;
        });
    }
}

impl StorageEndpoint for InventoryEndpoint {
    fn supports_extraction(&self) -> bool {
        self.access.extract
    }

    fn supports_insertion(&self) -> bool {
        self.access.insert
    }

    fn contents(&self) -> Vec<ItemStack> {
        self.inventory.borrow().stacks().to_vec()
    }

    fn extract(&self, item: ItemTypeId, max_amount: u32, tx: &mut Transaction) -> u32 {
        if !self.access.extract || max_amount == 0 || self.inventory.borrow().quantity(item) == 0 {
            return 0;
        }
        self.stage(tx);
        self.inventory.borrow_mut().remove(item, max_amount)
    }

    fn insert(&self, item: ItemTypeId, max_amount: u32, tx: &mut Transaction) -> u32 {
        if !self.access.insert || max_amount == 0 || !self.inventory.borrow().has_space() {
            return 0;
        }
        self.stage(tx);
        let overflow = self.inventory.borrow_mut().add(item, max_amount);
        max_amount - overflow
    }
}
