use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a container in a [`ContainerWorld`](crate::world::ContainerWorld).
    pub struct ContainerId;
}

/// Identifies a resource kind. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Identifies a transaction, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId(pub u64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A node in the routing graph. Equality and hashing are by value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position one step along `direction`. Wraps at the
    /// `i32` boundary; see [`checked_offset`](Position::checked_offset).
    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.vector();
        Self::new(
            self.x.wrapping_add(dx),
            self.y.wrapping_add(dy),
            self.z.wrapping_add(dz),
        )
    }

    /// Like [`offset`](Position::offset), but `None` past the `i32` boundary.
    pub fn checked_offset(self, direction: Direction) -> Option<Self> {
        let (dx, dy, dz) = direction.vector();
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }

    /// Sum of absolute per-axis differences, saturating at `u32::MAX`.
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
            .saturating_add(self.z.abs_diff(other.z))
    }

    /// The unit direction pointing from `self` to `other`, or `None` if the
    /// two positions are not face-adjacent.
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        Direction::from_vector(
            other.x.checked_sub(self.x)?,
            other.y.checked_sub(self.y)?,
            other.z.checked_sub(self.z)?,
        )
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the six axis-aligned faces of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Unit vector `(dx, dy, dz)`. North is -z, West is -x.
    pub const fn vector(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Inverse of [`vector`](Direction::vector). Anything that is not a unit
    /// axis vector yields `None`.
    pub fn from_vector(dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.vector() == (dx, dy, dz))
    }

    /// Stable ordinal, used when hashing topology.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }
}
