//! Read-only view of the pipe network around each interface node.
//!
//! The topology is built elsewhere and handed to the engine each tick. For
//! an interface position it lists the source positions wired to it and the
//! candidate `(target, approach face)` destinations reachable through the
//! network, plus the per-face link configuration of connection blocks.

use crate::id::{Direction, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Link configuration
// ---------------------------------------------------------------------------

/// How one face of a pipe connection block is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkMode {
    /// Connected; items may be pushed into the neighbour.
    #[default]
    Insert,
    /// Connected; the interface pulls from the neighbour.
    Extract,
    /// Not connected.
    Disabled,
}

/// Per-face link configuration of one connection block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkFaces {
    faces: [LinkMode; 6],
}

impl LinkFaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: set one face.
    pub fn with(mut self, face: Direction, mode: LinkMode) -> Self {
        self.set(face, mode);
        self
    }

    pub fn set(&mut self, face: Direction, mode: LinkMode) {
        self.faces[face.ordinal() as usize] = mode;
    }

    pub fn mode(&self, face: Direction) -> LinkMode {
        self.faces[face.ordinal() as usize]
    }

    pub fn is_side_extractable(&self, face: Direction) -> bool {
        self.mode(face) == LinkMode::Extract
    }

    /// Whether any face extracts. A connection with no extracting face
    /// never pulls.
    pub fn is_extractable(&self) -> bool {
        self.faces.contains(&LinkMode::Extract)
    }
}

// ---------------------------------------------------------------------------
// Candidates and fingerprint
// ---------------------------------------------------------------------------

/// A reachable destination: the container at `pos`, approached through its
/// `direction` face. The connecting pipe sits at `pos.offset(direction)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetCandidate {
    pub pos: Position,
    pub direction: Direction,
}

impl TargetCandidate {
    pub fn new(pos: Position, direction: Direction) -> Self {
        Self { pos, direction }
    }

    /// Position of the pipe block that links this target to the network.
    /// `None` when it would lie past the coordinate range.
    pub fn pipe_pos(&self) -> Option<Position> {
        self.pos.checked_offset(self.direction)
    }
}

/// Structural summary of an ordered candidate list.
///
/// FNV-1a over each entry's coordinates and face ordinal, so equal lists in
/// equal order always agree and the value never depends on allocation
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopologyFingerprint(pub u64);

impl TopologyFingerprint {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn of(candidates: &[TargetCandidate]) -> Self {
        let mut h = Self::FNV_OFFSET;
        let mut write = |bytes: &[u8]| {
            for &b in bytes {
                h ^= b as u64;
                h = h.wrapping_mul(Self::FNV_PRIME);
            }
        };
        write(&(candidates.len() as u64).to_le_bytes());
        for c in candidates {
            write(&c.pos.x.to_le_bytes());
            write(&c.pos.y.to_le_bytes());
            write(&c.pos.z.to_le_bytes());
            write(&[c.direction.ordinal()]);
        }
        Self(h)
    }
}

// ---------------------------------------------------------------------------
// Topology view
// ---------------------------------------------------------------------------

/// Externally supplied, read-only topology snapshot.
pub trait TopologyView {
    /// Source containers wired to the interface at `node`, in snapshot order.
    fn sources(&self, node: Position) -> &[Position];

    /// Raw candidate destinations reachable from `node`, in snapshot order.
    fn targets(&self, node: Position) -> &[TargetCandidate];

    /// Link configuration of the connection block at `pos`, or `None` when
    /// the block there is not a connection (or cannot be classified).
    fn link_faces(&self, pos: Position) -> Option<LinkFaces>;
}

/// Wiring of one interface node in a [`StaticTopology`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NodeWiring {
    sources: Vec<Position>,
    targets: Vec<TargetCandidate>,
}

/// In-memory [`TopologyView`] built by hand or by a topology builder.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    wiring: BTreeMap<Position, NodeWiring>,
    links: BTreeMap<Position, LinkFaces>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_link(&mut self, pos: Position, faces: LinkFaces) {
        self.links.insert(pos, faces);
    }

    pub fn remove_link(&mut self, pos: Position) {
        self.links.remove(&pos);
    }

    pub fn add_source(&mut self, node: Position, source: Position) {
        let sources = &mut self.wiring.entry(node).or_default().sources;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    pub fn add_target(&mut self, node: Position, target: TargetCandidate) {
        self.wiring.entry(node).or_default().targets.push(target);
    }

}

impl TopologyView for StaticTopology {
    fn sources(&self, node: Position) -> &[Position] {
        self.wiring
            .get(&node)
            .map(|w| w.sources.as_slice())
            .unwrap_or(&[])
    }

    fn targets(&self, node: Position) -> &[TargetCandidate] {
        self.wiring
            .get(&node)
            .map(|w| w.targets.as_slice())
            .unwrap_or(&[])
    }

    fn link_faces(&self, pos: Position) -> Option<LinkFaces> {
        self.links.get(&pos).copied()
    }
}
