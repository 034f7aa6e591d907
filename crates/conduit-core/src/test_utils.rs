//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::PipeConfig;
use crate::dirty::DirtyTracker;
use crate::endpoint::{
    Access, CapabilityProvider, EndpointHandle, EndpointResolver, StorageEndpoint,
};
use crate::id::*;
use crate::item::ItemStack;
use crate::network::{PipeNetwork, StepReport};
use crate::topology::{LinkFaces, LinkMode, StaticTopology, TargetCandidate, TopologyView};
use crate::transaction::Transaction;
use crate::world::ContainerWorld;
use std::cell::Cell;
use std::rc::Rc;

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn copper_ore() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn coal() -> ItemTypeId {
    ItemTypeId(2)
}

// ===========================================================================
// Config and wiring helpers
// ===========================================================================

pub fn config(transfer_amount: u32, period: Ticks) -> PipeConfig {
    PipeConfig {
        transfer_amount,
        period,
        ..PipeConfig::default()
    }
}

/// Link faces with only `face` extracting.
pub fn extract_link(face: Direction) -> LinkFaces {
    LinkFaces::new().with(face, LinkMode::Extract)
}

/// Wire `source` as a pulled neighbour of `node`: the node's face towards
/// it is set to extract, keeping any other faces already configured.
pub fn wire_source(topo: &mut StaticTopology, node: Position, source: Position) {
    let Some(direction) = node.direction_to(source) else {
        panic!("source {source} is not adjacent to {node}");
    };
    let faces = topo
        .link_faces(node)
        .unwrap_or_default()
        .with(direction, LinkMode::Extract);
    topo.set_link(node, faces);
    topo.add_source(node, source);
}

/// Place an inserting container at `pos`, reached through its top face.
pub fn place_target(
    world: &mut ContainerWorld,
    topo: &mut StaticTopology,
    node: Position,
    pos: Position,
    capacity: u32,
) {
    world.place(pos, capacity, Access::BOTH);
    topo.add_target(node, TargetCandidate::new(pos, Direction::Up));
}

// ===========================================================================
// The reference routing scenario
// ===========================================================================

pub const NODE: Position = Position::new(0, 0, 0);
pub const SOURCE: Position = Position::new(-1, 0, 0);
/// Distance 2 from [`NODE`].
pub const NEAR: Position = Position::new(2, 0, 0);
/// Distance 5 from [`NODE`].
pub const FAR: Position = Position::new(5, 0, 0);

/// A single interface with everything it needs to tick.
pub struct Scenario {
    pub topology: StaticTopology,
    pub world: ContainerWorld,
    pub network: PipeNetwork,
    pub dirty: DirtyTracker,
}

impl Scenario {
    pub fn step(&mut self) -> StepReport {
        self.network.step(&self.topology, &self.world, &mut self.dirty)
    }

    pub fn quantity(&self, pos: Position) -> u32 {
        self.world.quantity(pos, iron_ore())
    }
}

/// Interface [`NODE`] pulling from [`SOURCE`] (40 iron ore) into [`NEAR`]
/// and [`FAR`] (capacity 30 each), 16 units per tick, every tick.
///
/// The far target is listed first so resolution has to sort.
pub fn routing_scenario() -> Scenario {
    let mut topology = StaticTopology::new();
    let mut world = ContainerWorld::new();
    world.place(SOURCE, 64, Access::BOTH);
    let _ = world.fill(SOURCE, iron_ore(), 40);
    wire_source(&mut topology, NODE, SOURCE);
    place_target(&mut world, &mut topology, NODE, FAR, 30);
    place_target(&mut world, &mut topology, NODE, NEAR, 30);

    let mut network = PipeNetwork::new(config(16, 1)).expect("scenario config is valid");
    network.add_interface(NODE).expect("fresh network");
    Scenario {
        topology,
        world,
        network,
        dirty: DirtyTracker::new(),
    }
}

// ===========================================================================
// Wide network (benchmarks)
// ===========================================================================

/// `width` independent interfaces spaced along x, each with one source of
/// `stock` iron ore and `targets` targets at increasing distance.
pub fn wide_network(width: usize, targets: usize, stock: u32) -> Scenario {
    let mut topology = StaticTopology::new();
    let mut world = ContainerWorld::new();
    let mut network = PipeNetwork::new(config(8, 1)).expect("bench config is valid");
    let spacing = targets as i32 + 3;

    for i in 0..width {
        let node = Position::new(i as i32 * spacing, 0, 0);
        let source = node.offset(Direction::Down);
        world.place(source, stock.max(1), Access::BOTH);
        let _ = world.fill(source, iron_ore(), stock);
        wire_source(&mut topology, node, source);
        for t in 0..targets {
            let pos = Position::new(node.x + t as i32 + 1, 0, 0);
            place_target(&mut world, &mut topology, node, pos, u32::MAX / 2);
        }
        network.add_interface(node).expect("positions are distinct");
    }

    Scenario {
        topology,
        world,
        network,
        dirty: DirtyTracker::new(),
    }
}

// ===========================================================================
// Fault injection
// ===========================================================================

/// Wraps a [`ContainerWorld`] so that endpoints at one position under-deliver.
///
/// The first `honest_calls` extractions through that position behave; every
/// later one yields half of what was asked.
pub struct FaultyProvider<'a> {
    world: &'a ContainerWorld,
    pos: Position,
    honest_calls: usize,
    calls: Rc<Cell<usize>>,
}

impl<'a> FaultyProvider<'a> {
    pub fn new(world: &'a ContainerWorld, pos: Position, honest_calls: usize) -> Self {
        Self {
            world,
            pos,
            honest_calls,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn extract_calls(&self) -> usize {
        self.calls.get()
    }
}

impl CapabilityProvider for FaultyProvider<'_> {
    fn resolver(&self, pos: Position) -> Rc<dyn EndpointResolver> {
        let inner = self.world.resolver(pos);
        if pos != self.pos {
            return inner;
        }
        Rc::new(FaultyResolver {
            inner,
            honest_calls: self.honest_calls,
            calls: Rc::clone(&self.calls),
        })
    }
}

struct FaultyResolver {
    inner: Rc<dyn EndpointResolver>,
    honest_calls: usize,
    calls: Rc<Cell<usize>>,
}

impl EndpointResolver for FaultyResolver {
    fn find(&self, direction: Direction) -> Option<EndpointHandle> {
        let inner = self.inner.find(direction)?;
        Some(Rc::new(FaultyEndpoint {
            inner,
            honest_calls: self.honest_calls,
            calls: Rc::clone(&self.calls),
        }))
    }
}

struct FaultyEndpoint {
    inner: EndpointHandle,
    honest_calls: usize,
    calls: Rc<Cell<usize>>,
}

impl StorageEndpoint for FaultyEndpoint {
    fn supports_extraction(&self) -> bool {
        self.inner.supports_extraction()
    }

    fn supports_insertion(&self) -> bool {
        self.inner.supports_insertion()
    }

    fn contents(&self) -> Vec<ItemStack> {
        self.inner.contents()
    }

    fn extract(&self, item: ItemTypeId, max_amount: u32, tx: &mut Transaction) -> u32 {
        let call = self.calls.get();
        self.calls.set(call + 1);
        let asked = if call < self.honest_calls {
            max_amount
        } else {
            max_amount / 2
        };
        self.inner.extract(item, asked, tx)
    }

    fn insert(&self, item: ItemTypeId, max_amount: u32, tx: &mut Transaction) -> u32 {
        self.inner.insert(item, max_amount, tx)
    }
}
