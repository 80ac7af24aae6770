// Core types shared across the generator.
//
// Defines the integer voxel coordinate (`VoxelCoord`), the three world axes,
// the six unit `Direction`s and the compact ids used to refer to plots and
// registered builders. All types derive `Serialize`/`Deserialize` so a
// finished layout can be dumped as JSON.
//
// See also: `geometry.rs` for the box type built on these coordinates,
// `plot.rs` for the plot arena indexed by `PlotId`, `auction.rs` for the
// registry indexed by `BuilderId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position (or extent) in the voxel grid. Each component is in voxel units.
///
/// - X: east  (positive) / west  (negative)
/// - Y: up    (positive) / down  (negative)
/// - Z: south (positive) / north (negative)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component along `axis`.
    pub fn get(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Copy of `self` with the component along `axis` replaced.
    pub fn with(self, axis: Axis, value: i32) -> Self {
        let mut out = self;
        match axis {
            Axis::X => out.x = value,
            Axis::Y => out.y = value,
            Axis::Z => out.z = value,
        }
        out
    }

    /// Manhattan distance between two coordinates.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        ((self.x - other.x).unsigned_abs())
            + ((self.y - other.y).unsigned_abs())
            + ((self.z - other.z).unsigned_abs())
    }

    /// Euclidean length of the vector from the origin to `self`.
    pub fn length(self) -> f64 {
        let (x, y, z) = (self.x as f64, self.y as f64, self.z as f64);
        (x * x + y * y + z * z).sqrt()
    }
}

impl Add for VoxelCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for VoxelCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Add<Direction> for VoxelCoord {
    type Output = Self;

    fn add(self, rhs: Direction) -> Self {
        self + rhs.offset()
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the three world axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The two footprint axes plots are split along.
    pub const HORIZONTAL: [Axis; 2] = [Axis::X, Axis::Z];

    /// The other two axes, in cyclic order (X -> Y, Z; Y -> Z, X; Z -> X, Y).
    pub fn others(self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::Z, Axis::X],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }
}

/// A unit step along one axis. Doubles as a face selector on a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Direction {
    /// The four horizontal directions, clockwise from north.
    pub const COMPASS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// Unit vector for this direction.
    pub fn offset(self) -> VoxelCoord {
        match self {
            Direction::North => VoxelCoord::new(0, 0, -1),
            Direction::East => VoxelCoord::new(1, 0, 0),
            Direction::South => VoxelCoord::new(0, 0, 1),
            Direction::West => VoxelCoord::new(-1, 0, 0),
            Direction::Up => VoxelCoord::new(0, 1, 0),
            Direction::Down => VoxelCoord::new(0, -1, 0),
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::X,
            Direction::Up | Direction::Down => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
        }
    }

    /// True for the directions pointing along +x, +y or +z.
    pub fn is_positive(self) -> bool {
        matches!(self, Direction::East | Direction::Up | Direction::South)
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// The direction along `axis`, toward +axis if `positive`.
    pub fn along(axis: Axis, positive: bool) -> Self {
        match (axis, positive) {
            (Axis::X, true) => Direction::East,
            (Axis::X, false) => Direction::West,
            (Axis::Y, true) => Direction::Up,
            (Axis::Y, false) => Direction::Down,
            (Axis::Z, true) => Direction::South,
            (Axis::Z, false) => Direction::North,
        }
    }
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Index of a plot in its `PlotSet`. Dense, assigned in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlotId(pub u32);

impl PlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plot#{}", self.0)
    }
}

/// Index of a builder policy in a `BuilderRegistry`, in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuilderId(pub u32);

impl BuilderId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BuilderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builder#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voxel_coord_manhattan_distance() {
        let a = VoxelCoord::new(0, 0, 0);
        let b = VoxelCoord::new(3, 4, 5);
        assert_eq!(a.manhattan_distance(b), 12);
        assert_eq!(b.manhattan_distance(a), 12);
    }

    #[test]
    fn axis_accessors_roundtrip() {
        let c = VoxelCoord::new(1, 2, 3);
        for axis in Axis::ALL {
            assert_eq!(c.with(axis, 9).get(axis), 9);
        }
        assert_eq!(c.with(Axis::Y, 7), VoxelCoord::new(1, 7, 3));
    }

    #[test]
    fn direction_offsets_match_axis_and_sign() {
        for dir in Direction::ALL {
            let off = dir.offset();
            let expected = if dir.is_positive() { 1 } else { -1 };
            assert_eq!(off.get(dir.axis()), expected, "{dir:?}");
            assert_eq!(off.manhattan_distance(VoxelCoord::default()), 1);
            assert_eq!(Direction::along(dir.axis(), dir.is_positive()), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn north_is_negative_z() {
        assert_eq!(Direction::North.offset(), VoxelCoord::new(0, 0, -1));
        assert_eq!(VoxelCoord::new(5, 5, 5) + Direction::Up, VoxelCoord::new(5, 6, 5));
    }

    #[test]
    fn others_excludes_self() {
        for axis in Axis::ALL {
            assert!(!axis.others().contains(&axis));
        }
    }
}
