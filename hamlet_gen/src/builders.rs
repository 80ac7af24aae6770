// Reference builder policies.
//
// Four small policies that turn a partitioned site into a recognizable
// hamlet. They pick materials from the site's tables and define no palette
// of their own:
//
// - `RoadPaver` paves "road" plots with the most common stone, leaving a
//   one-voxel verge on both sides of the narrow axis.
// - `HouseLot` prefers plots near the center of the site, and much prefers
//   plots with road access. A won plot is tagged "house" and faces its
//   widest neighbouring road (a random compass direction without one). The
//   house is a stone floor slab, four wooden walls with a door gap on the
//   front, and a flat stone roof, on a stone foundation down to the ground.
// - `Acre` prefers the outskirts (excentricity >= 0.5) and lays soil with a
//   crop on top over the plot interior. In winter only the soil is laid.
// - `Fallow` bids like `Acre` but leaves its plots untouched.
//
// `default_registry` registers all four with their standard gates.
//
// See also: `auction.rs` for the policy trait, `gating.rs` for the gates,
// `site.rs` for the material tables.

use crate::auction::{BuildContext, BuildError, BuilderPolicy, BuilderRegistry};
use crate::gating::{Gated, PlotPredicate};
use crate::geometry::VoxelBox;
use crate::level::Level;
use crate::plot::{PlotSet, PlotView, TAG_ACRE, TAG_FALLOW, TAG_HOUSE, TAG_ROAD};
use crate::prng::SiteRng;
use crate::site::{MaterialClass, Season};
use crate::types::{Direction, PlotId, VoxelCoord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Shape parameters for `HouseLot`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseParams {
    /// Height of the walls between floor slab and roof, in voxels.
    pub wall_height: i32,
    /// Smallest footprint extent a house is built on.
    pub min_dimension: i32,
}

impl Default for HouseParams {
    fn default() -> Self {
        Self {
            wall_height: 3,
            min_dimension: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Roads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct RoadPaver;

impl<L: Level> BuilderPolicy<L> for RoadPaver {
    fn name(&self) -> &str {
        TAG_ROAD
    }

    fn interest(&self, plot: PlotView<'_>) -> f64 {
        if plot.has_tag(TAG_ROAD) { 1.0 } else { 0.0 }
    }

    fn build(&mut self, ctx: &mut BuildContext<'_, L>, plot: PlotId) -> Result<(), BuildError> {
        let bounds = ctx.plots[plot].bounds();
        let shrunk = if bounds.width() < bounds.length() {
            bounds.try_expand(-1, 0, 0)
        } else {
            bounds.try_expand(0, 0, -1)
        };
        // Roads too narrow for a verge are paved edge to edge.
        let pave = shrunk.unwrap_or(bounds);
        let stone = *ctx.site.materials(MaterialClass::Stone).most_common();
        for ground in ctx.site.surface_positions(pave) {
            ctx.level.set_material_at(ground, stone);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Houses
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct HouseLot {
    params: HouseParams,
    fronts: BTreeMap<PlotId, Direction>,
}

impl HouseLot {
    pub fn new(params: HouseParams) -> Self {
        Self {
            params,
            fronts: BTreeMap::new(),
        }
    }

    /// A house lot that only bids on non-road plots wide enough for a house.
    pub fn gated(params: HouseParams) -> Gated<Self> {
        let min = params.min_dimension;
        Gated::new(Self::new(params))
            .requires(PlotPredicate::NotARoad)
            .requires(PlotPredicate::MinDimension(min))
    }

    /// The side of `plot` the door faces, once awarded.
    pub fn front(&self, plot: PlotId) -> Option<Direction> {
        self.fronts.get(&plot).copied()
    }
}

impl<L: Level> BuilderPolicy<L> for HouseLot {
    fn name(&self) -> &str {
        TAG_HOUSE
    }

    fn interest(&self, plot: PlotView<'_>) -> f64 {
        let interest = plot.centricity();
        if plot.has_neighbour_with_tag(TAG_ROAD) {
            interest
        } else {
            interest / 10.0
        }
    }

    fn award(&mut self, plots: &mut PlotSet, plot: PlotId, rng: &mut SiteRng) {
        plots.add_tag(plot, TAG_HOUSE);
        let view = plots.view(plot);
        let front = view
            .widest_neighbour_with_tag(TAG_ROAD)
            .and_then(|road| view.bounds().touch_direction(&road.bounds()))
            .or_else(|| rng.choose(&Direction::COMPASS).copied())
            .unwrap_or(Direction::North);
        trace!(%plot, ?front, "house front");
        self.fronts.insert(plot, front);
    }

    fn build(&mut self, ctx: &mut BuildContext<'_, L>, plot: PlotId) -> Result<(), BuildError> {
        let bounds = ctx.plots[plot].bounds();
        let site = ctx.site;
        let stone = *site.materials(MaterialClass::Stone).most_common();
        let wood = *site.materials(MaterialClass::Wood).most_common();

        let heights: Vec<i32> = bounds
            .columns()
            .map(|(x, z)| site.surface_height_at(x, z))
            .collect();
        let mean = heights.iter().map(|&h| h as f64).sum::<f64>() / heights.len() as f64;
        let ground = mean as i32;

        let wall_height = self.params.wall_height;
        let origin = VoxelCoord::new(bounds.origin().x, ground, bounds.origin().z);
        let shell = VoxelBox::try_new(
            origin,
            VoxelCoord::new(bounds.width(), wall_height + 2, bounds.length()),
        )?;
        let storey = VoxelBox::try_new(
            origin + Direction::Up,
            VoxelCoord::new(bounds.width(), wall_height, bounds.length()),
        )?;

        // Foundation: fill from the terrain up to the floor slab.
        for (x, z) in bounds.columns() {
            for y in site.ground_height_at(x, z) + 1..ground {
                ctx.level.set_material_at(VoxelCoord::new(x, y, z), stone);
            }
        }
        ctx.level.fill(shell.floor(), stone);
        for wall in storey.walls() {
            ctx.level.fill(wall, wood);
        }
        ctx.level.fill(shell.ceiling(), stone);

        let front = self.fronts.get(&plot).copied().unwrap_or(Direction::North);
        let door = storey.wall_2d(front);
        let x = door.width() / 2;
        for y in 0..door.height().min(2) {
            ctx.level.set_material_at(door.at(x, y), L::Material::default());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Farmland
// ---------------------------------------------------------------------------

/// Outskirts only: the plot's excentricity from 0.5 upward, else nothing.
fn outskirts_interest(plot: PlotView<'_>) -> f64 {
    let excentricity = plot.excentricity();
    if excentricity < 0.5 { 0.0 } else { excentricity }
}

fn farmland_gate<P>(policy: P) -> Gated<P> {
    Gated::new(policy)
        .requires(PlotPredicate::NotARoad)
        .requires(PlotPredicate::MinDimension(2))
}

#[derive(Clone, Debug, Default)]
pub struct Acre;

impl Acre {
    pub fn gated() -> Gated<Self> {
        farmland_gate(Self)
    }
}

impl<L: Level> BuilderPolicy<L> for Acre {
    fn name(&self) -> &str {
        TAG_ACRE
    }

    fn interest(&self, plot: PlotView<'_>) -> f64 {
        outskirts_interest(plot)
    }

    fn award(&mut self, plots: &mut PlotSet, plot: PlotId, _rng: &mut SiteRng) {
        plots.add_tag(plot, TAG_ACRE);
    }

    fn build(&mut self, ctx: &mut BuildContext<'_, L>, plot: PlotId) -> Result<(), BuildError> {
        let bounds = ctx.plots[plot].bounds();
        let field = bounds.try_expand(-1, 0, -1).unwrap_or(bounds);
        let soil = *ctx.site.materials(MaterialClass::Soil).most_common();
        let crop = match ctx.site.info().season {
            Season::Winter => L::Material::default(),
            _ => *ctx.site.materials(MaterialClass::Crop).random(ctx.rng),
        };
        for ground in ctx.site.surface_positions(field) {
            ctx.level.set_material_at(ground, soil);
            ctx.level.set_material_at(ground + Direction::Up, crop);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Fallow;

impl Fallow {
    pub fn gated() -> Gated<Self> {
        farmland_gate(Self)
    }
}

impl<L: Level> BuilderPolicy<L> for Fallow {
    fn name(&self) -> &str {
        TAG_FALLOW
    }

    fn interest(&self, plot: PlotView<'_>) -> f64 {
        outskirts_interest(plot)
    }

    fn award(&mut self, plots: &mut PlotSet, plot: PlotId, _rng: &mut SiteRng) {
        plots.add_tag(plot, TAG_FALLOW);
    }

    fn build(&mut self, _ctx: &mut BuildContext<'_, L>, _plot: PlotId) -> Result<(), BuildError> {
        Ok(())
    }
}

/// Roads, houses, acres and fallow land, with their standard gates.
pub fn default_registry<L: Level>(house: HouseParams) -> BuilderRegistry<L> {
    let mut registry = BuilderRegistry::new();
    registry.register(RoadPaver);
    registry.register(HouseLot::gated(house));
    registry.register(Acre::gated());
    registry.register(Fallow::gated());
    registry
}
