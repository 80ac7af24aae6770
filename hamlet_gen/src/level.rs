// The level: read/write voxel storage builders render into.
//
// `Level` is the only surface through which generation touches the world.
// It is generic over its material type so the generator never needs to know
// a block palette; `Material::default()` is the empty (air) material.
// `fill` has a per-voxel default that implementations may override, and
// `mark_dirty` is the hook for lighting or mesh refresh once a region has
// been rewritten.
//
// `VoxelGrid<M>` is a dense in-memory level covering a fixed world-space
// box. The flat `Vec<M>` is indexed by `x + z * size_x + y * size_x *
// size_z` relative to the grid's origin. Out-of-bounds reads return the
// default material; out-of-bounds writes are no-ops. Regions passed to
// `mark_dirty` are recorded so callers can see what a run touched.
//
// See also: `site.rs` for the read-only terrain view, `builders.rs` for the
// policies that write through `Level`, `generate.rs` for the clearing pass
// and the final `mark_dirty` call.

use crate::geometry::VoxelBox;
use crate::types::{Axis, VoxelCoord};
use std::fmt;

/// Read/write voxel storage.
pub trait Level {
    /// `Default` is the empty material.
    type Material: Copy + Ord + Default + fmt::Debug;

    fn material_at(&self, pos: VoxelCoord) -> Self::Material;

    fn set_material_at(&mut self, pos: VoxelCoord, material: Self::Material);

    /// Set every voxel of `region`.
    fn fill(&mut self, region: VoxelBox, material: Self::Material) {
        for pos in region.positions() {
            self.set_material_at(pos, material);
        }
    }

    /// Signal that `region` changed and derived state needs a refresh.
    fn mark_dirty(&mut self, _region: VoxelBox) {}
}

/// Dense voxel storage over a fixed world-space box.
#[derive(Clone, Debug)]
pub struct VoxelGrid<M> {
    bounds: VoxelBox,
    /// Flat storage: index = x + z * size_x + y * size_x * size_z, relative
    /// to `bounds.origin()`.
    voxels: Vec<M>,
    dirty: Vec<VoxelBox>,
}

impl<M: Copy + Default> VoxelGrid<M> {
    /// A grid over `bounds` filled with the default material.
    pub fn new(bounds: VoxelBox) -> Self {
        Self {
            bounds,
            voxels: vec![M::default(); bounds.volume() as usize],
            dirty: Vec::new(),
        }
    }

    pub fn bounds(&self) -> VoxelBox {
        self.bounds
    }

    pub fn in_bounds(&self, pos: VoxelCoord) -> bool {
        self.bounds.contains(pos)
    }

    fn index(&self, pos: VoxelCoord) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        let rel = pos - self.bounds.origin();
        let size = self.bounds.size();
        let (sx, sz) = (size.x as usize, size.z as usize);
        Some(rel.x as usize + rel.z as usize * sx + rel.y as usize * sx * sz)
    }

    /// Regions passed to `mark_dirty`, oldest first.
    pub fn dirty_regions(&self) -> &[VoxelBox] {
        &self.dirty
    }
}

impl<M: Copy + Default + PartialEq> VoxelGrid<M> {
    /// Number of voxels holding `material`.
    pub fn count(&self, material: M) -> usize {
        self.voxels.iter().filter(|&&m| m == material).count()
    }

    /// Highest y in column `(x, z)` that is not the default material.
    pub fn top_at(&self, x: i32, z: i32) -> Option<i32> {
        let empty = M::default();
        (self.bounds.min(Axis::Y)..self.bounds.max(Axis::Y))
            .rev()
            .find(|&y| {
                self.index(VoxelCoord::new(x, y, z))
                    .is_some_and(|i| self.voxels[i] != empty)
            })
    }
}

impl<M: Copy + Ord + Default + fmt::Debug> Level for VoxelGrid<M> {
    type Material = M;

    fn material_at(&self, pos: VoxelCoord) -> M {
        self.index(pos).map(|i| self.voxels[i]).unwrap_or_default()
    }

    fn set_material_at(&mut self, pos: VoxelCoord, material: M) {
        if let Some(i) = self.index(pos) {
            self.voxels[i] = material;
        }
    }

    fn fill(&mut self, region: VoxelBox, material: M) {
        if let Some(clipped) = region.intersection(&self.bounds) {
            for pos in clipped.positions() {
                self.set_material_at(pos, material);
            }
        }
    }

    fn mark_dirty(&mut self, region: VoxelBox) {
        self.dirty.push(region);
    }
}
