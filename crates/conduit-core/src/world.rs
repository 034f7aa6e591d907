//! In-memory container world implementing [`CapabilityProvider`].
//!
//! Containers live in a slotmap arena and are placed at positions. Each
//! placement chooses which faces are exposed and what access they allow.
//! Resolvers look the placement up on every `find`, so removing a container
//! is observed by cached resolvers at once.

use crate::endpoint::{
    Access, CapabilityProvider, EndpointHandle, EndpointResolver, InventoryEndpoint,
    SharedInventory,
};
use crate::id::{ContainerId, Direction, ItemTypeId, Position};
use crate::item::InventorySlot;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct Placement {
    container: ContainerId,
    faces: [Option<Access>; 6],
}

#[derive(Debug, Default)]
struct WorldState {
    containers: SlotMap<ContainerId, SharedInventory>,
    placements: BTreeMap<Position, Placement>,
}

/// Owns containers and answers capability lookups for them.
#[derive(Debug, Default)]
pub struct ContainerWorld {
    state: Rc<RefCell<WorldState>>,
    resolvers_created: Cell<u64>,
}

impl ContainerWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a container with the same access on all six faces.
    pub fn place(&mut self, pos: Position, capacity: u32, access: Access) -> ContainerId {
        self.place_sided(pos, capacity, [Some(access); 6])
    }

    /// Place a container with per-face access, indexed by
    /// [`Direction::ordinal`]. `None` hides the face.
    pub fn place_sided(
        &mut self,
        pos: Position,
        capacity: u32,
        faces: [Option<Access>; 6],
    ) -> ContainerId {
        let mut state = self.state.borrow_mut();
        let container = state
            .containers
            .insert(Rc::new(RefCell::new(InventorySlot::new(capacity))));
        if let Some(old) = state.placements.insert(pos, Placement { container, faces }) {
            state.containers.remove(old.container);
        }
        container
    }

    /// Remove whatever container sits at `pos`.
    pub fn remove(&mut self, pos: Position) -> bool {
        let mut state = self.state.borrow_mut();
        match state.placements.remove(&pos) {
            Some(placement) => {
                state.containers.remove(placement.container);
                true
            }
            None => false,
        }
    }

    /// Shared handle to the inventory at `pos`.
    pub fn inventory(&self, pos: Position) -> Option<SharedInventory> {
        let state = self.state.borrow();
        let placement = state.placements.get(&pos)?;
        state.containers.get(placement.container).cloned()
    }

    /// Directly seed contents (outside any transaction). Returns overflow.
    pub fn fill(&mut self, pos: Position, item: ItemTypeId, quantity: u32) -> u32 {
        let Some(inv) = self.inventory(pos) else {
            return quantity;
        };
        inv.borrow_mut().add(item, quantity)
    }

    pub fn quantity(&self, pos: Position, item: ItemTypeId) -> u32 {
        let Some(inv) = self.inventory(pos) else {
            return 0;
        };
        inv.borrow().quantity(item)
    }

    pub fn total(&self, pos: Position) -> u32 {
        let Some(inv) = self.inventory(pos) else {
            return 0;
        };
        inv.borrow().total()
    }

    /// Copy of every placed inventory, keyed by position.
    pub fn snapshot(&self) -> BTreeMap<Position, InventorySlot> {
        let state = self.state.borrow();
        state
            .placements
            .iter()
            .filter_map(|(pos, p)| {
                let inv = state.containers.get(p.container)?;
                Some((*pos, inv.borrow().clone()))
            })
            .collect()
    }

    /// How many resolvers have been handed out.
    pub fn resolvers_created(&self) -> u64 {
        self.resolvers_created.get()
    }
}

impl CapabilityProvider for ContainerWorld {
    fn resolver(&self, pos: Position) -> Rc<dyn EndpointResolver> {
        self.resolvers_created.set(self.resolvers_created.get() + 1);
        Rc::new(PositionResolver {
            state: Rc::clone(&self.state),
            pos,
        })
    }
}

struct PositionResolver {
    state: Rc<RefCell<WorldState>>,
    pos: Position,
}

impl EndpointResolver for PositionResolver {
    fn find(&self, direction: Direction) -> Option<EndpointHandle> {
        let state = self.state.borrow();
        let placement = state.placements.get(&self.pos)?;
        let access = placement.faces[direction.ordinal() as usize]?;
        let inventory = state.containers.get(placement.container)?;
        Some(Rc::new(InventoryEndpoint::new(Rc::clone(inventory), access)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;

    #[test]
    fn place_and_fill() {
        let mut world = ContainerWorld::new();
        let pos = Position::new(0, 0, 0);
        world.place(pos, 20, Access::BOTH);
        assert_eq!(world.fill(pos, ItemTypeId(1), 25), 5);
        assert_eq!(world.quantity(pos, ItemTypeId(1)), 20);
        assert_eq!(world.fill(Position::new(9, 9, 9), ItemTypeId(1), 3), 3);
    }

    #[test]
    fn hidden_faces_resolve_to_none() {
        let mut world = ContainerWorld::new();
        let pos = Position::new(0, 0, 0);
        let mut faces = [None; 6];
        faces[Direction::Up.ordinal() as usize] = Some(Access::INSERT_ONLY);
        world.place_sided(pos, 10, faces);

        let resolver = world.resolver(pos);
        assert!(resolver.find(Direction::Down).is_none());
        let up = resolver.find(Direction::Up).expect("up face exposed");
        assert!(up.supports_insertion());
        assert!(!up.supports_extraction());
    }

    #[test]
    fn removal_is_seen_by_existing_resolver() {
        let mut world = ContainerWorld::new();
        let pos = Position::new(1, 2, 3);
        world.place(pos, 10, Access::BOTH);
        let resolver = world.resolver(pos);
        assert!(resolver.find(Direction::North).is_some());

        assert!(world.remove(pos));
        assert!(resolver.find(Direction::North).is_none());
        assert!(!world.remove(pos));
    }

    #[test]
    fn endpoint_mutates_world_inventory() {
        let mut world = ContainerWorld::new();
        let pos = Position::new(0, 0, 0);
        world.place(pos, 10, Access::BOTH);
        let ep = world.resolver(pos).find(Direction::Up).unwrap();

        let mut tx = Transaction::open();
        assert_eq!(ep.insert(ItemTypeId(3), 4, &mut tx), 4);
        tx.commit();
        assert_eq!(world.quantity(pos, ItemTypeId(3)), 4);
        assert_eq!(world.resolvers_created(), 1);
    }

    #[test]
    fn replacing_a_placement_frees_old_container() {
        let mut world = ContainerWorld::new();
        let pos = Position::new(0, 0, 0);
        let first = world.place(pos, 10, Access::BOTH);
        let second = world.place(pos, 10, Access::BOTH);
        assert_ne!(first, second);
        assert_eq!(world.snapshot().len(), 1);
        assert_eq!(world.state.borrow().containers.len(), 1);
    }
}
