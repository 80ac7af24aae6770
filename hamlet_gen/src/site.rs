// The site: a read-only view of the terrain a settlement is laid out on.
//
// Builder policies never inspect raw voxels to decide what to place. They
// ask the `Site` for terrain heights, climate scalars and per-class material
// tables (which stone is most common, which crops grow here). How those
// numbers are gathered is up to the implementation; `FlatSite` is the
// simplest one, a uniform ground level with configured tables, used by the
// `layout` binary and the tests.
//
// Heights are voxel y coordinates of the topmost ground voxel in a column:
// builders replace that voxel (paving, soil) and place things above it.
// `ground_height_at` ignores non-ground cover such as plants or water,
// `surface_height_at` does not; on a `FlatSite` they agree.
//
// See also: `level.rs` for the writable world, `weights.rs` for the tables
// returned by `materials`, `config.rs` which embeds `SiteInfo` in the
// settlement config.

use crate::geometry::VoxelBox;
use crate::types::VoxelCoord;
use crate::weights::WeightedSelector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Climate {
    Cold,
    #[default]
    Medium,
    Hot,
}

/// Material tables a site exposes to builders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialClass {
    Stone,
    Wood,
    Soil,
    Crop,
}

/// Per-run site configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub min_plot_dim: i32,
    pub max_plot_dim: i32,
    pub season: Season,
    pub climate: Climate,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            min_plot_dim: 5,
            max_plot_dim: 20,
            season: Season::Spring,
            climate: Climate::Medium,
        }
    }
}

/// Read-only terrain and material statistics for one generation run.
pub trait Site {
    type Material: Copy + Ord + Default + fmt::Debug;

    /// The settlement region.
    fn bounds(&self) -> VoxelBox;

    fn info(&self) -> &SiteInfo;

    /// y of the topmost ground voxel in column `(x, z)`, ignoring cover.
    fn ground_height_at(&self, x: i32, z: i32) -> i32;

    /// y of the topmost non-empty voxel in column `(x, z)`.
    fn surface_height_at(&self, x: i32, z: i32) -> i32;

    /// Normalized temperature, 0 (frozen) to 1 (scorching).
    fn temperature(&self) -> f64;

    /// Share of the surface that is fertile ground.
    fn fertile_ground_ratio(&self) -> f64;

    /// Share of the surface covered by water.
    fn surface_water_ratio(&self) -> f64;

    fn materials(&self, class: MaterialClass) -> &WeightedSelector<Self::Material>;

    /// The surface voxel of every column in `area`'s footprint.
    fn surface_positions(&self, area: VoxelBox) -> Vec<VoxelCoord> {
        area.columns()
            .map(|(x, z)| VoxelCoord::new(x, self.surface_height_at(x, z), z))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FlatSite
// ---------------------------------------------------------------------------

/// A site with uniform terrain at a fixed ground height.
#[derive(Clone, Debug)]
pub struct FlatSite<M: Ord> {
    bounds: VoxelBox,
    ground_y: i32,
    info: SiteInfo,
    temperature: f64,
    fertile_ground_ratio: f64,
    surface_water_ratio: f64,
    tables: BTreeMap<MaterialClass, WeightedSelector<M>>,
    empty: WeightedSelector<M>,
}

impl<M: Copy + Ord + Default> FlatSite<M> {
    pub fn new(bounds: VoxelBox, ground_y: i32, info: SiteInfo) -> Self {
        Self {
            bounds,
            ground_y,
            info,
            temperature: 0.5,
            fertile_ground_ratio: 1.0,
            surface_water_ratio: 0.0,
            tables: BTreeMap::new(),
            empty: WeightedSelector::new(M::default()),
        }
    }

    pub fn with_materials(mut self, class: MaterialClass, table: WeightedSelector<M>) -> Self {
        self.tables.insert(class, table);
        self
    }

    pub fn with_climate(mut self, temperature: f64, fertile: f64, water: f64) -> Self {
        self.temperature = temperature;
        self.fertile_ground_ratio = fertile;
        self.surface_water_ratio = water;
        self
    }
}

impl<M: Copy + Ord + Default + fmt::Debug> Site for FlatSite<M> {
    type Material = M;

    fn bounds(&self) -> VoxelBox {
        self.bounds
    }

    fn info(&self) -> &SiteInfo {
        &self.info
    }

    fn ground_height_at(&self, _x: i32, _z: i32) -> i32 {
        self.ground_y
    }

    fn surface_height_at(&self, _x: i32, _z: i32) -> i32 {
        self.ground_y
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn fertile_ground_ratio(&self) -> f64 {
        self.fertile_ground_ratio
    }

    fn surface_water_ratio(&self) -> f64 {
        self.surface_water_ratio
    }

    /// Classes without a configured table get an empty one that always
    /// yields the default material.
    fn materials(&self, class: MaterialClass) -> &WeightedSelector<M> {
        self.tables.get(&class).unwrap_or(&self.empty)
    }
}
