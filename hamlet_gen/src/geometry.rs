// Axis-aligned integer box geometry.
//
// `VoxelBox` is the spatial primitive everything else is built on: plots are
// boxes, roads are boxes, walls and floors handed to builders are boxes. A
// box is an inclusive minimum corner (`origin`) plus a strictly positive
// `size`; the maximum corner `origin + size` is exclusive. Boxes are
// immutable values and every operation returns new boxes.
//
// Adjacency is defined on the half-open intervals: two boxes *touch* when
// one's maximum equals the other's minimum on some axis and their extents on
// the two remaining axes overlap by at least one voxel. Corner and edge
// contact do not count. *Overlap* means a non-empty intersection volume.
//
// `FlatBox` is the 2D view of a one-voxel-thick box (a wall, floor or
// ceiling slab). It maps the two remaining axes to a local (x, y) frame with
// its origin at the slab's origin, keeping world x -> local x and world
// y -> local y where it can.
//
// A box with a zero or negative extent is a caller bug. The infallible
// constructors assert; the `try_*` variants return `GeometryError` for
// callers that compute sizes at runtime (for example shrinking a plot that
// might already be too thin).
//
// See also: `types.rs` for `VoxelCoord`, `Axis` and `Direction`,
// `partition.rs` for the main consumer of `split_along_axis_at`, `plot.rs`
// for the adjacency post-pass built on `touches`/`overlaps`.

use crate::types::{Axis, Direction, VoxelCoord};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("degenerate box at {origin} with size {size}")]
    Degenerate { origin: VoxelCoord, size: VoxelCoord },
    #[error("box of size {size} has no unit-thickness axis to flatten")]
    NotFlat { size: VoxelCoord },
}

/// Where a split position is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitAnchor {
    /// Offset relative to the box's own origin on the split axis.
    Box,
    /// Absolute world coordinate on the split axis.
    World,
}

/// Result of a split: one box (the input, unsplit) or `[low, high]`.
pub type Split = SmallVec<[VoxelBox; 2]>;

/// An axis-aligned box with an inclusive origin and strictly positive size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BoxRepr", into = "BoxRepr")]
pub struct VoxelBox {
    origin: VoxelCoord,
    size: VoxelCoord,
}

#[derive(Serialize, Deserialize)]
struct BoxRepr {
    origin: VoxelCoord,
    size: VoxelCoord,
}

impl TryFrom<BoxRepr> for VoxelBox {
    type Error = GeometryError;

    fn try_from(repr: BoxRepr) -> Result<Self, GeometryError> {
        VoxelBox::try_new(repr.origin, repr.size)
    }
}

impl From<VoxelBox> for BoxRepr {
    fn from(b: VoxelBox) -> Self {
        BoxRepr {
            origin: b.origin,
            size: b.size,
        }
    }
}

impl VoxelBox {
    /// Create a box. Panics if any size component is below 1.
    pub fn new(origin: VoxelCoord, size: VoxelCoord) -> Self {
        match Self::try_new(origin, size) {
            Ok(b) => b,
            Err(e) => panic!("VoxelBox::new: {e}"),
        }
    }

    pub fn try_new(origin: VoxelCoord, size: VoxelCoord) -> Result<Self, GeometryError> {
        if size.x < 1 || size.y < 1 || size.z < 1 {
            return Err(GeometryError::Degenerate { origin, size });
        }
        Ok(Self { origin, size })
    }

    /// Box spanning `[min, max)` on every axis.
    pub fn try_from_corners(min: VoxelCoord, max: VoxelCoord) -> Result<Self, GeometryError> {
        Self::try_new(min, max - min)
    }

    pub fn origin(&self) -> VoxelCoord {
        self.origin
    }

    pub fn size(&self) -> VoxelCoord {
        self.size
    }

    /// Exclusive maximum corner.
    pub fn maximum(&self) -> VoxelCoord {
        self.origin + self.size
    }

    pub fn min(&self, axis: Axis) -> i32 {
        self.origin.get(axis)
    }

    /// Exclusive maximum along `axis`.
    pub fn max(&self, axis: Axis) -> i32 {
        self.origin.get(axis) + self.size.get(axis)
    }

    pub fn extent(&self, axis: Axis) -> i32 {
        self.size.get(axis)
    }

    /// Extent along x.
    pub fn width(&self) -> i32 {
        self.size.x
    }

    /// Extent along y.
    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Extent along z.
    pub fn length(&self) -> i32 {
        self.size.z
    }

    pub fn volume(&self) -> i64 {
        self.size.x as i64 * self.size.y as i64 * self.size.z as i64
    }

    /// Footprint area (x times z).
    pub fn area(&self) -> i64 {
        self.size.x as i64 * self.size.z as i64
    }

    pub fn contains(&self, point: VoxelCoord) -> bool {
        Axis::ALL
            .iter()
            .all(|&a| point.get(a) >= self.min(a) && point.get(a) < self.max(a))
    }

    /// Every voxel position in the box, x fastest, then z, then y.
    pub fn positions(&self) -> impl Iterator<Item = VoxelCoord> + use<> {
        let (o, m) = (self.origin, self.maximum());
        (o.y..m.y).flat_map(move |y| {
            (o.z..m.z).flat_map(move |z| (o.x..m.x).map(move |x| VoxelCoord::new(x, y, z)))
        })
    }

    /// Every `(x, z)` column of the footprint, x fastest.
    pub fn columns(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (o, m) = (self.origin, self.maximum());
        (o.z..m.z).flat_map(move |z| (o.x..m.x).map(move |x| (x, z)))
    }

    // -----------------------------------------------------------------------
    // Splitting, growing, moving
    // -----------------------------------------------------------------------

    /// Split the box in two along `axis` at `position`.
    ///
    /// If the cut point lies at or before the box's minimum, or at or after
    /// its maximum, the box is returned unsplit as a single element.
    /// Otherwise returns `[low, high]`, where `high` starts exactly where
    /// `low` ends and the two extents sum to the original.
    pub fn split_along_axis_at(&self, axis: Axis, position: i32, anchor: SplitAnchor) -> Split {
        let cut = match anchor {
            SplitAnchor::Box => self.min(axis) + position,
            SplitAnchor::World => position,
        };
        if cut <= self.min(axis) || cut >= self.max(axis) {
            return smallvec![*self];
        }
        let low = VoxelBox {
            origin: self.origin,
            size: self.size.with(axis, cut - self.min(axis)),
        };
        let high = VoxelBox {
            origin: self.origin.with(axis, cut),
            size: self.size.with(axis, self.max(axis) - cut),
        };
        smallvec![low, high]
    }

    /// Grow symmetrically: the origin moves by `-d` and the size grows by
    /// `2d` per axis. Negative deltas shrink. Panics if the result would be
    /// degenerate.
    pub fn expand(&self, dx: i32, dy: i32, dz: i32) -> Self {
        match self.try_expand(dx, dy, dz) {
            Ok(b) => b,
            Err(e) => panic!("VoxelBox::expand: {e}"),
        }
    }

    pub fn try_expand(&self, dx: i32, dy: i32, dz: i32) -> Result<Self, GeometryError> {
        let d = VoxelCoord::new(dx, dy, dz);
        Self::try_new(self.origin - d, self.size + d + d)
    }

    /// Grow only the maximum corner. Panics if the result would be degenerate.
    pub fn expand_max(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.origin, self.size + VoxelCoord::new(dx, dy, dz))
    }

    /// The same box moved by `offset`.
    pub fn translate(&self, offset: VoxelCoord) -> Self {
        Self {
            origin: self.origin + offset,
            size: self.size,
        }
    }

    // -----------------------------------------------------------------------
    // Faces
    // -----------------------------------------------------------------------

    /// The one-voxel-thick slab of the box on side `direction`. `Up` and
    /// `Down` give the ceiling and floor slabs.
    pub fn face(&self, direction: Direction) -> Self {
        let axis = direction.axis();
        let origin = if direction.is_positive() {
            self.origin.with(axis, self.max(axis) - 1)
        } else {
            self.origin
        };
        Self {
            origin,
            size: self.size.with(axis, 1),
        }
    }

    pub fn floor(&self) -> Self {
        self.face(Direction::Down)
    }

    pub fn ceiling(&self) -> Self {
        self.face(Direction::Up)
    }

    /// The four side faces, in `Direction::COMPASS` order.
    pub fn walls(&self) -> [Self; 4] {
        Direction::COMPASS.map(|d| self.face(d))
    }

    /// 2D view of the face on side `direction`.
    pub fn wall_2d(&self, direction: Direction) -> FlatBox {
        FlatBox::from_unit_axis(self.face(direction))
    }

    // -----------------------------------------------------------------------
    // Relations
    // -----------------------------------------------------------------------

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let min = VoxelCoord::new(
            self.min(Axis::X).max(other.min(Axis::X)),
            self.min(Axis::Y).max(other.min(Axis::Y)),
            self.min(Axis::Z).max(other.min(Axis::Z)),
        );
        let max = VoxelCoord::new(
            self.max(Axis::X).min(other.max(Axis::X)),
            self.max(Axis::Y).min(other.max(Axis::Y)),
            self.max(Axis::Z).min(other.max(Axis::Z)),
        );
        Self::try_from_corners(min, max).ok()
    }

    /// True iff the intersection volume is non-zero.
    pub fn overlaps(&self, other: &Self) -> bool {
        Axis::ALL.iter().all(|&a| intervals_overlap(self, other, a))
    }

    /// True iff the boxes share part of a face.
    pub fn touches(&self, other: &Self) -> bool {
        Axis::ALL.iter().any(|&axis| {
            (self.min(axis) == other.max(axis) || self.max(axis) == other.min(axis))
                && axis.others().iter().all(|&a| intervals_overlap(self, other, a))
        })
    }

    /// The direction from `self` toward `other` when the two touch.
    pub fn touch_direction(&self, other: &Self) -> Option<Direction> {
        Axis::ALL.iter().find_map(|&axis| {
            if !axis.others().iter().all(|&a| intervals_overlap(self, other, a)) {
                return None;
            }
            if self.max(axis) == other.min(axis) {
                Some(Direction::along(axis, true))
            } else if self.min(axis) == other.max(axis) {
                Some(Direction::along(axis, false))
            } else {
                None
            }
        })
    }

    // -----------------------------------------------------------------------
    // Metrics
    // -----------------------------------------------------------------------

    /// Geometric center, `origin + size / 2`.
    pub fn center(&self) -> [f64; 3] {
        [
            self.origin.x as f64 + self.size.x as f64 / 2.0,
            self.origin.y as f64 + self.size.y as f64 / 2.0,
            self.origin.z as f64 + self.size.z as f64 / 2.0,
        ]
    }

    pub fn center_distance(&self, other: &Self) -> f64 {
        let (a, b) = (self.center(), other.center());
        let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    /// Clamp `point` into the box (maximum inclusive, so the result is
    /// always a voxel of the box).
    pub fn clip(&self, point: VoxelCoord) -> VoxelCoord {
        let clamp = |a: Axis| point.get(a).clamp(self.min(a), self.max(a) - 1);
        VoxelCoord::new(clamp(Axis::X), clamp(Axis::Y), clamp(Axis::Z))
    }

    /// Distance between the closest voxels of the two boxes.
    ///
    /// Clamps `self`'s (floored) center into `other`, then clamps that point
    /// back into `self`. Touching boxes are one voxel apart.
    pub fn min_distance(&self, other: &Self) -> f64 {
        let c = self.center();
        let center = VoxelCoord::new(c[0].floor() as i32, c[1].floor() as i32, c[2].floor() as i32);
        let in_other = other.clip(center);
        let in_self = self.clip(in_other);
        (in_other - in_self).length()
    }
}

/// Half-open interval overlap of the two boxes along `axis`.
fn intervals_overlap(a: &VoxelBox, b: &VoxelBox, axis: Axis) -> bool {
    a.min(axis) < b.max(axis) && b.min(axis) < a.max(axis)
}

impl fmt::Display for VoxelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} + {}]", self.origin, self.size)
    }
}

// ---------------------------------------------------------------------------
// 2D projection
// ---------------------------------------------------------------------------

/// A one-voxel-thick box seen as a 2D rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlatBox {
    bounds: VoxelBox,
    x_axis: Axis,
    y_axis: Axis,
}

impl FlatBox {
    /// Flatten `bounds` along its first unit-size axis.
    pub fn new(bounds: VoxelBox) -> Result<Self, GeometryError> {
        let flat = Axis::ALL
            .into_iter()
            .find(|&a| bounds.extent(a) == 1)
            .ok_or(GeometryError::NotFlat { size: bounds.size })?;
        let x_axis = if flat != Axis::X { Axis::X } else { Axis::Z };
        let y_axis = if flat != Axis::Y { Axis::Y } else { Axis::Z };
        Ok(Self {
            bounds,
            x_axis,
            y_axis,
        })
    }

    /// For boxes that are known to be flat (faces of other boxes).
    fn from_unit_axis(bounds: VoxelBox) -> Self {
        match Self::new(bounds) {
            Ok(flat) => flat,
            Err(e) => panic!("FlatBox: {e}"),
        }
    }

    pub fn bounds(&self) -> VoxelBox {
        self.bounds
    }

    pub fn width(&self) -> i32 {
        self.bounds.extent(self.x_axis)
    }

    pub fn height(&self) -> i32 {
        self.bounds.extent(self.y_axis)
    }

    /// World position of local coordinate `(x, y)`. Not bounds-checked.
    pub fn at(&self, x: i32, y: i32) -> VoxelCoord {
        let origin = self.bounds.origin();
        origin
            .with(self.x_axis, origin.get(self.x_axis) + x)
            .with(self.y_axis, origin.get(self.y_axis) + y)
    }

    /// Local coordinate of a world position.
    pub fn project(&self, point: VoxelCoord) -> (i32, i32) {
        let origin = self.bounds.origin();
        (
            point.get(self.x_axis) - origin.get(self.x_axis),
            point.get(self.y_axis) - origin.get(self.y_axis),
        )
    }

    /// Grow (or shrink) symmetrically within the plane.
    pub fn expand(&self, dx: i32, dy: i32) -> Result<Self, GeometryError> {
        let d = VoxelCoord::default()
            .with(self.x_axis, dx)
            .with(self.y_axis, dy);
        let bounds = self.bounds.try_expand(d.x, d.y, d.z)?;
        Ok(Self { bounds, ..*self })
    }

    pub fn positions(&self) -> impl Iterator<Item = VoxelCoord> + use<> {
        self.bounds.positions()
    }
}
