// End-to-end settlement generation.
//
// `generate` runs one settlement over a region of a level:
//
// 1. Grow the region to `config.minimum_region` if it is smaller (each
//    short axis grows by half the deficit on both sides, rounded down).
// 2. Build the site through the caller's factory.
// 3. Clear everything above the surface inside the region plus
//    `config.site_border`.
// 4. Partition, fill in neighbours, run the auction bid and build phases.
// 5. Mark the bordered region dirty on the level.
//
// The caller owns the level, the registry and the `SiteRng`, so several
// runs can share one generator stream or one set of policies. Runs over
// overlapping regions must not interleave.
//
// See also: `partition.rs`, `auction.rs`, `config.rs`, and the `layout`
// binary which drives this over an in-memory grid.

use crate::auction::{Auction, AuctionError, AuctionReport, BuildContext, BuilderRegistry};
use crate::config::SettlementConfig;
use crate::geometry::VoxelBox;
use crate::level::Level;
use crate::partition::PlotPartitioner;
use crate::plot::PlotSet;
use crate::prng::SiteRng;
use crate::site::{Site, SiteInfo};
use crate::types::{Axis, VoxelCoord};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Auction(#[from] AuctionError),
}

/// The result of one generation run.
#[derive(Clone, Debug, Serialize)]
pub struct Settlement {
    /// The region actually laid out, after any minimum-size growth.
    pub region: VoxelBox,
    pub plots: PlotSet,
    pub report: AuctionReport,
    /// Number of plots whose policy built successfully.
    pub built: usize,
}

/// Grow `region` symmetrically until every axis reaches `minimum`.
pub fn grow_to_minimum(region: VoxelBox, minimum: VoxelCoord) -> VoxelBox {
    let half_deficit = |axis: Axis| ((minimum.get(axis) - region.extent(axis)).max(0)) / 2;
    region.expand(half_deficit(Axis::X), half_deficit(Axis::Y), half_deficit(Axis::Z))
}

/// Replace everything above the site's surface inside `area` with the empty
/// material.
pub fn clear_above_surface<L: Level>(
    level: &mut L,
    site: &dyn Site<Material = L::Material>,
    area: VoxelBox,
) {
    let top = area.max(Axis::Y);
    for ground in site.surface_positions(area) {
        for y in ground.y + 1..top {
            level.set_material_at(VoxelCoord::new(ground.x, y, ground.z), L::Material::default());
        }
    }
}

/// Lay out and build a settlement over `region`.
pub fn generate<L, S, F>(
    level: &mut L,
    region: VoxelBox,
    config: &SettlementConfig,
    registry: &mut BuilderRegistry<L>,
    site_factory: F,
    rng: &mut SiteRng,
) -> Result<Settlement, GenerateError>
where
    L: Level,
    S: Site<Material = L::Material>,
    F: FnOnce(&L, VoxelBox, SiteInfo) -> S,
{
    let started = Instant::now();
    let region = match config.minimum_region {
        Some(minimum) => grow_to_minimum(region, minimum),
        None => region,
    };
    let info = SiteInfo {
        min_plot_dim: config.partition.min_plot_dim,
        max_plot_dim: config.partition.max_plot_dim,
        ..config.site.clone()
    };
    let site = site_factory(level, region, info);
    let border = config.site_border;
    let bordered = region.expand(border.x.max(0), border.y.max(0), border.z.max(0));

    clear_above_surface(level, &site, bordered);

    let mut plots = PlotPartitioner::new(config.partition.clone()).partition(region, rng);
    plots.fill_in_neighbours(config.neighbours);

    let mut auction = Auction::new(registry);
    let report = auction.bid(&mut plots, rng);
    let built = {
        let mut ctx = BuildContext {
            level: &mut *level,
            site: &site,
            plots: &plots,
            rng: &mut *rng,
        };
        auction.build(&mut ctx)?
    };

    level.mark_dirty(bordered);

    info!(
        %region,
        plots = plots.len(),
        assigned = report.assigned,
        unbid = report.unbid.len(),
        built,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "settlement generated"
    );
    Ok(Settlement {
        region,
        plots,
        report,
        built,
    })
}
