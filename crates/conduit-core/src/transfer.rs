//! The per-tick transfer engine: source scan, then distribution.
//!
//! A tick moves through [`TransferPhase`]s. The scan is a read-ahead inside
//! a [`probe`] transaction, which always aborts; only distribution opens a
//! transaction that may commit.

use crate::cache::EndpointCache;
use crate::endpoint::{CapabilityProvider, EndpointHandle, StorageEndpoint};
use crate::id::{ItemTypeId, Position};
use crate::item::ItemStack;
use crate::resolver::ResolvedTarget;
use crate::topology::{LinkFaces, TopologyView};
use crate::transaction::{Transaction, probe};

/// Where a node is within its current tick. Terminal phases reset to
/// `Idle` when the next tick starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferPhase {
    #[default]
    Idle,
    SourceScan,
    Extracted,
    Distributing,
    Committed,
    Aborted,
}

/// What a single node tick achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickOutcome {
    /// Gate closed, or the node's link has no extracting face.
    #[default]
    Idle,
    /// No eligible source yielded content.
    NoSource,
    /// Content was found but no target survived filtering.
    NoTargets,
    Committed {
        source: Position,
        item: ItemTypeId,
        moved: u32,
        boosted: bool,
    },
    /// The source yielded a different amount than was distributed.
    Inconsistent { expected: u32, extracted: u32 },
    /// Every target rejected every extracted stack.
    Blocked,
}

impl TickOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TickOutcome::Committed { .. })
    }

    /// Units moved by this tick; zero unless committed.
    pub fn moved(&self) -> u32 {
        match self {
            TickOutcome::Committed { moved, .. } => *moved,
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Source scan
// ---------------------------------------------------------------------------

/// The read-ahead result of a source scan. Nothing has been removed from
/// the source yet.
#[derive(Clone)]
pub struct TransferAttempt {
    pub source: Position,
    pub endpoint: EndpointHandle,
    pub item_type: ItemTypeId,
    /// Extracted moves, first first. All share `item_type`.
    pub stacks: Vec<ItemStack>,
}

impl TransferAttempt {
    pub fn total(&self) -> u32 {
        self.stacks.iter().map(|s| s.quantity).sum()
    }
}

impl std::fmt::Debug for TransferAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferAttempt")
            .field("source", &self.source)
            .field("item_type", &self.item_type)
            .field("stacks", &self.stacks)
            .finish_non_exhaustive()
    }
}

/// Limits applied while draining a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub move_capacity: u32,
    pub max_stack_size: u32,
}

/// Walk the node's sources in snapshot order and return the first one that
/// yields anything.
///
/// A source is skipped when it is not face-adjacent to the node, when the
/// node's face towards it is not extracting, or when it exposes no
/// extracting endpoint on the face towards the node.
pub fn scan_sources(
    node: Position,
    node_faces: &LinkFaces,
    topology: &dyn TopologyView,
    capabilities: &dyn CapabilityProvider,
    cache: &mut EndpointCache,
    limits: ScanLimits,
) -> Option<TransferAttempt> {
    for &source in topology.sources(node) {
        let Some(direction) = source.direction_to(node) else {
            log::trace!("source {source} is not adjacent to interface {node}, skipped");
            continue;
        };
        if !node_faces.is_side_extractable(direction.opposite()) {
            continue;
        }
        let Some(endpoint) = cache.lookup(capabilities, source, direction) else {
            continue;
        };
        if !endpoint.supports_extraction() {
            continue;
        }

        let stacks = probe(|tx| drain_first_kind(&*endpoint, limits, tx));
        if let Some(first) = stacks.first() {
            return Some(TransferAttempt {
                source,
                item_type: first.item_type,
                endpoint,
                stacks,
            });
        }
    }
    None
}

/// Extract the first non-empty kind in chunks of at most `max_stack_size`
/// until the kind runs out or `move_capacity` is reached.
fn drain_first_kind(
    endpoint: &dyn StorageEndpoint,
    limits: ScanLimits,
    tx: &mut Transaction,
) -> Vec<ItemStack> {
    let Some(kind) = endpoint
        .contents()
        .into_iter()
        .find(|s| !s.is_empty())
        .map(|s| s.item_type)
    else {
        return Vec::new();
    };

    let mut stacks = Vec::new();
    let mut remaining = limits.move_capacity;
    while remaining > 0 {
        let got = endpoint.extract(kind, remaining.min(limits.max_stack_size), tx);
        if got == 0 {
            break;
        }
        stacks.push(ItemStack::new(kind, got));
        remaining = remaining.saturating_sub(got);
    }
    stacks
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Result of [`distribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Committed { moved: u32, targets: u32 },
    Inconsistent { expected: u32, extracted: u32 },
    Blocked,
}

/// Place the attempt's stacks into `targets`, nearest first.
///
/// Each stack gets its own transaction: insert into targets in order, then
/// extract the inserted amount from the source. Targets whose face is gone
/// or no longer inserts are skipped. A mismatch aborts and ends
/// distribution. The first stack that moves anything commits and ends
/// distribution.
pub fn distribute(attempt: &TransferAttempt, targets: &[ResolvedTarget]) -> Distribution {
    for stack in &attempt.stacks {
        let mut tx = Transaction::open();
        let mut moved = 0u32;
        let mut touched = 0u32;
        for target in targets {
            if moved >= stack.quantity {
                break;
            }
            let Some(endpoint) = target.endpoint() else {
                continue;
            };
            let accepted = endpoint.insert(stack.item_type, stack.quantity - moved, &mut tx);
            if accepted > 0 {
                moved += accepted;
                touched += 1;
            }
        }

        if moved == 0 {
            tx.abort();
            continue;
        }

        let extracted = attempt.endpoint.extract(stack.item_type, moved, &mut tx);
        if extracted != moved {
            log::debug!(
                "{} from {} aborted: {moved} inserted, {extracted} extracted",
                tx.id(),
                attempt.source
            );
            tx.abort();
            return Distribution::Inconsistent {
                expected: moved,
                extracted,
            };
        }

        tx.commit();
        return Distribution::Committed {
            moved,
            targets: touched,
        };
    }
    Distribution::Blocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Access;
    use crate::id::Direction;
    use crate::resolver::TargetResolver;
    use crate::topology::{LinkMode, StaticTopology, TargetCandidate};
    use crate::world::ContainerWorld;

    const NODE: Position = Position::new(0, 0, 0);
    const SOURCE: Position = Position::new(-1, 0, 0);
    const ORE: ItemTypeId = ItemTypeId(1);
    const COAL: ItemTypeId = ItemTypeId(2);

    fn limits(move_capacity: u32, max_stack_size: u32) -> ScanLimits {
        ScanLimits {
            move_capacity,
            max_stack_size,
        }
    }

    fn pulling_west() -> LinkFaces {
        LinkFaces::new().with(Direction::West, LinkMode::Extract)
    }

    fn sourced_world() -> (StaticTopology, ContainerWorld) {
        let mut topo = StaticTopology::new();
        let mut world = ContainerWorld::new();
        world.place(SOURCE, 100, Access::BOTH);
        topo.add_source(NODE, SOURCE);
        (topo, world)
    }

    #[test]
    fn scan_takes_first_kind_in_chunks_and_leaves_source_intact() {
        let (topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, COAL, 30);
        let _ = world.fill(SOURCE, ORE, 30);
        let mut cache = EndpointCache::new();

        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(24, 10))
            .expect("source has content");
        assert_eq!(attempt.item_type, COAL);
        let sizes: Vec<u32> = attempt.stacks.iter().map(|s| s.quantity).collect();
        assert_eq!(sizes, vec![10, 10, 4]);
        assert_eq!(attempt.total(), 24);
        assert_eq!(world.quantity(SOURCE, COAL), 30);
    }

    #[test]
    fn scan_stops_when_kind_runs_out() {
        let (topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, ORE, 5);
        let mut cache = EndpointCache::new();
        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(64, 64))
            .expect("source has content");
        assert_eq!(attempt.total(), 5);
    }

    #[test]
    fn scan_skips_face_not_extracting() {
        let (topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, ORE, 5);
        let mut cache = EndpointCache::new();
        let faces = LinkFaces::new().with(Direction::East, LinkMode::Extract);
        assert!(scan_sources(NODE, &faces, &topo, &world, &mut cache, limits(8, 64)).is_none());
    }

    #[test]
    fn scan_skips_non_adjacent_and_empty_sources() {
        let mut topo = StaticTopology::new();
        let mut world = ContainerWorld::new();
        let far = Position::new(-3, 0, 0);
        world.place(far, 10, Access::BOTH);
        let _ = world.fill(far, ORE, 5);
        world.place(SOURCE, 10, Access::BOTH);
        let above = Position::new(0, 1, 0);
        world.place(above, 10, Access::BOTH);
        let _ = world.fill(above, ORE, 3);
        topo.add_source(NODE, far);
        topo.add_source(NODE, SOURCE);
        topo.add_source(NODE, above);

        let faces = pulling_west().with(Direction::Up, LinkMode::Extract);
        let mut cache = EndpointCache::new();
        let attempt = scan_sources(NODE, &faces, &topo, &world, &mut cache, limits(8, 64))
            .expect("third source has content");
        assert_eq!(attempt.source, above);
        assert_eq!(attempt.total(), 3);
    }

    #[test]
    fn scan_skips_insert_only_source() {
        let mut topo = StaticTopology::new();
        let mut world = ContainerWorld::new();
        world.place(SOURCE, 10, Access::INSERT_ONLY);
        let _ = world.fill(SOURCE, ORE, 5);
        topo.add_source(NODE, SOURCE);
        let mut cache = EndpointCache::new();
        assert!(scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(8, 64)).is_none());
    }

    fn resolved(topo: &StaticTopology, world: &ContainerWorld, cache: &mut EndpointCache) -> Vec<ResolvedTarget> {
        TargetResolver::new().resolve(NODE, topo, world, cache).targets.to_vec()
    }

    #[test]
    fn distribute_fills_nearest_then_spills() {
        let (mut topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, ORE, 40);
        let near = Position::new(1, 0, 0);
        let far = Position::new(4, 0, 0);
        world.place(near, 30, Access::BOTH);
        world.place(far, 30, Access::BOTH);
        topo.add_target(NODE, TargetCandidate::new(far, Direction::Up));
        topo.add_target(NODE, TargetCandidate::new(near, Direction::Up));

        let mut cache = EndpointCache::new();
        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(64, 64))
            .expect("source has content");
        let targets = resolved(&topo, &world, &mut cache);

        assert_eq!(
            distribute(&attempt, &targets),
            Distribution::Committed { moved: 40, targets: 2 }
        );
        assert_eq!(world.quantity(near, ORE), 30);
        assert_eq!(world.quantity(far, ORE), 10);
        assert_eq!(world.quantity(SOURCE, ORE), 0);
    }

    #[test]
    fn distribute_blocked_when_targets_are_full() {
        let (mut topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, ORE, 10);
        let full = Position::new(1, 0, 0);
        world.place(full, 5, Access::BOTH);
        let _ = world.fill(full, COAL, 5);
        topo.add_target(NODE, TargetCandidate::new(full, Direction::Up));

        let mut cache = EndpointCache::new();
        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(8, 4))
            .expect("source has content");
        let targets = resolved(&topo, &world, &mut cache);
        let before = world.snapshot();
        assert_eq!(distribute(&attempt, &targets), Distribution::Blocked);
        assert_eq!(world.snapshot(), before);
    }

    #[test]
    fn distribute_skips_targets_removed_after_resolution() {
        let (mut topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, ORE, 10);
        let gone = Position::new(1, 0, 0);
        let kept = Position::new(3, 0, 0);
        world.place(gone, 30, Access::BOTH);
        world.place(kept, 30, Access::BOTH);
        topo.add_target(NODE, TargetCandidate::new(gone, Direction::Up));
        topo.add_target(NODE, TargetCandidate::new(kept, Direction::Up));

        let mut cache = EndpointCache::new();
        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(8, 64))
            .expect("source has content");
        let targets = resolved(&topo, &world, &mut cache);
        assert!(world.remove(gone));

        assert_eq!(
            distribute(&attempt, &targets),
            Distribution::Committed { moved: 8, targets: 1 }
        );
        assert_eq!(world.quantity(kept, ORE), 8);
        assert_eq!(world.quantity(SOURCE, ORE), 2);

        // A replacement that refuses insertion blocks without touching the source.
        world.place(kept, 30, Access::EXTRACT_ONLY);
        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(8, 64))
            .expect("source has content");
        assert_eq!(distribute(&attempt, &targets), Distribution::Blocked);
        assert_eq!(world.quantity(SOURCE, ORE), 2);
    }

    #[test]
    fn distribute_aborts_when_source_shrank() {
        let (mut topo, mut world) = sourced_world();
        let _ = world.fill(SOURCE, ORE, 10);
        let target = Position::new(1, 0, 0);
        world.place(target, 30, Access::BOTH);
        topo.add_target(NODE, TargetCandidate::new(target, Direction::Up));

        let mut cache = EndpointCache::new();
        let attempt = scan_sources(NODE, &pulling_west(), &topo, &world, &mut cache, limits(8, 64))
            .expect("source has content");
        let targets = resolved(&topo, &world, &mut cache);

        // Something else drains the source between probe and distribution.
        let inv = world.inventory(SOURCE).expect("source placed");
        let _ = inv.borrow_mut().remove(ORE, 7);
        let before = world.snapshot();

        assert_eq!(
            distribute(&attempt, &targets),
            Distribution::Inconsistent { expected: 8, extracted: 3 }
        );
        assert_eq!(world.snapshot(), before);
    }

    #[test]
    fn outcome_helpers() {
        let committed = TickOutcome::Committed {
            source: SOURCE,
            item: ORE,
            moved: 7,
            boosted: false,
        };
        assert!(committed.is_committed());
        assert_eq!(committed.moved(), 7);
        assert_eq!(TickOutcome::Blocked.moved(), 0);
        assert_eq!(TickOutcome::default(), TickOutcome::Idle);
    }
}
