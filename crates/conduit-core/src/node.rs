//! A single interface node and its per-tick state machine.

use crate::cache::EndpointCache;
use crate::dirty::DirtySink;
use crate::endpoint::CapabilityProvider;
use crate::event::{AbortReason, EventBus, RoutingEvent};
use crate::id::{Position, Ticks};
use crate::rate::{BoostSource, RateController};
use crate::resolver::TargetResolver;
use crate::topology::{TopologyFingerprint, TopologyView};
use crate::transfer::{
    Distribution, ScanLimits, TickOutcome, TransferPhase, distribute, scan_sources,
};

/// Everything a node reads or notifies during one tick.
pub struct TickContext<'a> {
    pub tick: Ticks,
    pub topology: &'a dyn TopologyView,
    pub capabilities: &'a dyn CapabilityProvider,
    pub dirty: &'a mut dyn DirtySink,
    pub events: &'a mut EventBus,
    pub rate: &'a RateController,
    pub max_stack_size: u32,
}

/// A routing endpoint that periodically pulls from one source and pushes
/// to its targets, nearest first.
///
/// The node owns its endpoint cache and target memo; both live exactly as
/// long as the node.
#[derive(Debug)]
pub struct InterfaceNode {
    pos: Position,
    cache: EndpointCache,
    resolver: TargetResolver,
    phase: TransferPhase,
    last_outcome: TickOutcome,
}

impl InterfaceNode {
    pub fn new(pos: Position) -> Self {
        Self {
            pos,
            cache: EndpointCache::new(),
            resolver: TargetResolver::new(),
            phase: TransferPhase::Idle,
            last_outcome: TickOutcome::Idle,
        }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    /// Phase reached by the most recent tick.
    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    pub fn last_outcome(&self) -> TickOutcome {
        self.last_outcome
    }

    pub fn cache(&self) -> &EndpointCache {
        &self.cache
    }

    pub fn fingerprint(&self) -> Option<TopologyFingerprint> {
        self.resolver.fingerprint()
    }

    /// Run one tick. Never fails; anything that goes wrong leaves the
    /// world unchanged and is reported through the outcome.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, boost: &mut dyn BoostSource) -> TickOutcome {
        self.phase = TransferPhase::Idle;
        let outcome = self.run(ctx, boost);
        self.last_outcome = outcome;
        outcome
    }

    fn run(&mut self, ctx: &mut TickContext<'_>, boost: &mut dyn BoostSource) -> TickOutcome {
        let pos = self.pos;
        let node_faces = match ctx.topology.link_faces(pos) {
            Some(faces) if faces.is_extractable() => faces,
            _ => {
                log::trace!("interface {pos} has no extracting face");
                return TickOutcome::Idle;
            }
        };

        let gate = ctx.rate.gate(ctx.tick, boost);
        if !gate.open {
            log::trace!("interface {pos} gate closed at tick {}", ctx.tick);
            return TickOutcome::Idle;
        }

        self.phase = TransferPhase::SourceScan;
        let limits = ScanLimits {
            move_capacity: gate.move_capacity,
            max_stack_size: ctx.max_stack_size,
        };
        let Some(attempt) = scan_sources(
            pos,
            &node_faces,
            ctx.topology,
            ctx.capabilities,
            &mut self.cache,
            limits,
        ) else {
            log::trace!("interface {pos} found no source content");
            self.phase = TransferPhase::Idle;
            return TickOutcome::NoSource;
        };

        self.phase = TransferPhase::Extracted;
        let resolution = self
            .resolver
            .resolve(pos, ctx.topology, ctx.capabilities, &mut self.cache);
        if resolution.rebuilt {
            log::debug!(
                "interface {pos} rebuilt targets: fingerprint {:#018x}, {} targets",
                resolution.fingerprint.0,
                resolution.targets.len()
            );
            ctx.events.emit(RoutingEvent::TargetsRebuilt {
                node: pos,
                fingerprint: resolution.fingerprint.0,
                count: resolution.targets.len(),
                tick: ctx.tick,
            });
        }
        if resolution.targets.is_empty() {
            log::trace!("interface {pos} has no targets");
            self.phase = TransferPhase::Idle;
            return TickOutcome::NoTargets;
        }

        self.phase = TransferPhase::Distributing;
        match distribute(&attempt, &resolution.targets) {
            Distribution::Committed { moved, targets } => {
                self.phase = TransferPhase::Committed;
                ctx.dirty.mark_dirty(pos);
                ctx.events.emit(RoutingEvent::TransferCommitted {
                    node: pos,
                    source: attempt.source,
                    item_type: attempt.item_type,
                    quantity: moved,
                    targets,
                    boosted: gate.boosted,
                    tick: ctx.tick,
                });
                if gate.boosted {
                    boost.on_boost_used();
                    log::debug!("interface {pos} consumed its boost at tick {}", ctx.tick);
                    ctx.events.emit(RoutingEvent::BoostConsumed {
                        node: pos,
                        tick: ctx.tick,
                    });
                }
                TickOutcome::Committed {
                    source: attempt.source,
                    item: attempt.item_type,
                    moved,
                    boosted: gate.boosted,
                }
            }
            Distribution::Inconsistent {
                expected,
                extracted,
            } => {
                self.phase = TransferPhase::Aborted;
                log::warn!(
                    "interface {pos}: source {} yielded {extracted} of {expected} distributed units, transfer aborted",
                    attempt.source
                );
                ctx.events.emit(RoutingEvent::TransferAborted {
                    node: pos,
                    source: attempt.source,
                    reason: AbortReason::Inconsistent {
                        expected,
                        extracted,
                    },
                    tick: ctx.tick,
                });
                TickOutcome::Inconsistent {
                    expected,
                    extracted,
                }
            }
            Distribution::Blocked => {
                self.phase = TransferPhase::Aborted;
                ctx.events.emit(RoutingEvent::TransferAborted {
                    node: pos,
                    source: attempt.source,
                    reason: AbortReason::Rejected,
                    tick: ctx.tick,
                });
                TickOutcome::Blocked
            }
        }
    }
}
