//! Derives the ordered, filtered insertion targets of an interface node.
//!
//! Rebuilding resolves a capability per candidate and sorts by distance, so
//! the result is memoized against the [`TopologyFingerprint`] of the raw
//! candidate list. While the fingerprint is unchanged the same shared list
//! is handed out again. The list holds resolvers, not endpoints: each use
//! asks the resolver for the face again, so a container removed or replaced
//! behind an unchanged candidate list is seen at once.

use crate::cache::EndpointCache;
use crate::endpoint::{CapabilityProvider, EndpointHandle, EndpointResolver};
use crate::id::{Direction, Position};
use crate::topology::{TargetCandidate, TopologyFingerprint, TopologyView};
use std::rc::Rc;

/// An insertion target that passed filtering.
#[derive(Clone)]
pub struct ResolvedTarget {
    pub pos: Position,
    pub direction: Direction,
    /// Manhattan distance from the owning interface node.
    pub distance: u32,
    resolver: Rc<dyn EndpointResolver>,
}

impl ResolvedTarget {
    pub fn new(
        pos: Position,
        direction: Direction,
        distance: u32,
        resolver: Rc<dyn EndpointResolver>,
    ) -> Self {
        Self {
            pos,
            direction,
            distance,
            resolver,
        }
    }

    /// The face as it stands now, or `None` if it is gone or no longer
    /// accepts insertion.
    pub fn endpoint(&self) -> Option<EndpointHandle> {
        self.resolver
            .find(self.direction)
            .filter(|ep| ep.supports_insertion())
    }
}

impl std::fmt::Debug for ResolvedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTarget")
            .field("pos", &self.pos)
            .field("direction", &self.direction)
            .field("distance", &self.distance)
            .finish_non_exhaustive()
    }
}

/// Shared, immutable target list. Cache hits return the same allocation.
pub type TargetList = Rc<[ResolvedTarget]>;

/// Result of one [`TargetResolver::resolve`] call.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub targets: TargetList,
    pub fingerprint: TopologyFingerprint,
    /// `true` when the list was recomputed rather than reused.
    pub rebuilt: bool,
}

/// Memoization record owned by an interface node. Not authoritative state.
#[derive(Debug, Default)]
pub struct TargetResolver {
    memo: Option<(TopologyFingerprint, TargetList)>,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of the list currently memoized, if any.
    pub fn fingerprint(&self) -> Option<TopologyFingerprint> {
        self.memo.as_ref().map(|(fp, _)| *fp)
    }

    pub fn resolve(
        &mut self,
        node: Position,
        topology: &dyn TopologyView,
        capabilities: &dyn CapabilityProvider,
        cache: &mut EndpointCache,
    ) -> Resolution {
        let raw = topology.targets(node);
        let fingerprint = TopologyFingerprint::of(raw);

        if let Some((memo_fp, targets)) = &self.memo {
            if *memo_fp == fingerprint {
                return Resolution {
                    targets: Rc::clone(targets),
                    fingerprint,
                    rebuilt: false,
                };
            }
        }

        let targets = filter_targets(node, raw, topology, capabilities, cache);
        self.memo = Some((fingerprint, Rc::clone(&targets)));
        Resolution {
            targets,
            fingerprint,
            rebuilt: true,
        }
    }
}

/// Keep candidates that are wired for insertion and expose an inserting
/// endpoint, nearest first. Equal distances keep snapshot order.
fn filter_targets(
    node: Position,
    raw: &[TargetCandidate],
    topology: &dyn TopologyView,
    capabilities: &dyn CapabilityProvider,
    cache: &mut EndpointCache,
) -> TargetList {
    let mut targets: Vec<ResolvedTarget> = raw
        .iter()
        .filter(|c| !links_back_as_extract(c, topology))
        .filter_map(|c| {
            let target = ResolvedTarget::new(
                c.pos,
                c.direction,
                c.pos.manhattan_distance(node),
                cache.resolver(capabilities, c.pos),
            );
            target.endpoint().is_some().then_some(target)
        })
        .collect();

    targets.sort_by_key(|t| t.distance);
    targets.into()
}

/// A target whose own connection pulls from it must not also receive.
/// Unclassifiable links are kept.
fn links_back_as_extract(candidate: &TargetCandidate, topology: &dyn TopologyView) -> bool {
    let Some(pipe) = candidate.pipe_pos() else {
        return false;
    };
    match topology.link_faces(pipe) {
        Some(faces) => faces.is_side_extractable(candidate.direction.opposite()),
        None => false,
    }
}
