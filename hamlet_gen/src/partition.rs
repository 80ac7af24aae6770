// Recursive plot partitioning.
//
// `PlotPartitioner` cuts a settlement region into a flat `PlotSet` of
// non-overlapping plots whose union is exactly the region. It works off an
// explicit backlog of pending boxes instead of recursing, so region size
// never affects stack depth and the traversal order is a parameter
// (`Traversal::Lifo` by default, `Traversal::Fifo` for breadth-first).
//
// For each popped box:
// 1. One `random_bool(leaf_chance)` draw, always consumed. If it hits and
//    both footprint extents are below `max_plot_dim`, the box becomes an
//    untagged leaf.
// 2. The horizontal axes [X, Z] are shuffled (one draw).
// 3. The first axis with `extent - 2 * min_plot_dim > 0` spare voxels is
//    split: the spare space picks a gap tier (pedestrian gap, road, wide
//    road), one offset is drawn in `[min_plot_dim, extent - min_plot_dim -
//    gap]`, and the box is cut into `plot1 | gap | plot2`. Both halves go
//    back on the backlog; the gap is emitted immediately, tagged "gap" for
//    the pedestrian tier and "road" otherwise.
// 4. A box with no splittable axis becomes an untagged leaf.
//
// Neighbour lists are not filled here; callers run
// `PlotSet::fill_in_neighbours` once partitioning is done.
//
// See also: `geometry.rs` for `split_along_axis_at`, `plot.rs` for the
// `PlotSet` this fills, `generate.rs` which drives a full run.
//
// **Critical constraint: determinism.** The draws above happen in exactly
// that order for every popped box. Changing the order (or adding a draw)
// changes every seeded layout.

use crate::geometry::{SplitAnchor, VoxelBox};
use crate::plot::{PlotSet, TAG_GAP, TAG_ROAD};
use crate::prng::SiteRng;
use crate::types::Axis;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Order in which pending boxes are taken off the backlog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Traversal {
    /// Most recently pushed first (depth-first).
    #[default]
    Lifo,
    /// Oldest first (breadth-first).
    Fifo,
}

/// Tunables for `PlotPartitioner`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionParams {
    /// No plot is cut narrower than this on a split axis. Values below 1
    /// are treated as 1.
    pub min_plot_dim: i32,
    /// Boxes with both footprint extents below this may stop splitting
    /// early (see `leaf_chance`).
    pub max_plot_dim: i32,
    /// Probability that a small enough box stops splitting.
    pub leaf_chance: f64,
    /// Gap width when the spare space is under `2 * min_plot_dim`.
    pub pedestrian_gap: i32,
    /// Gap width when the spare space is under `4 * min_plot_dim`.
    pub road_width: i32,
    /// Gap width for anything larger.
    pub wide_road_width: i32,
    pub traversal: Traversal,
}

impl Default for PartitionParams {
    fn default() -> Self {
        Self {
            min_plot_dim: 5,
            max_plot_dim: 20,
            leaf_chance: 0.1,
            pedestrian_gap: 1,
            road_width: 3,
            wide_road_width: 5,
            traversal: Traversal::Lifo,
        }
    }
}

impl PartitionParams {
    /// Gap width and tag for a split with `extra_space` spare voxels.
    pub fn gap_for(&self, extra_space: i32) -> (i32, &'static str) {
        let min_dim = self.min_plot_dim.max(1);
        if extra_space < min_dim.saturating_mul(2) {
            (self.pedestrian_gap, TAG_GAP)
        } else if extra_space < min_dim.saturating_mul(4) {
            (self.road_width, TAG_ROAD)
        } else {
            (self.wide_road_width, TAG_ROAD)
        }
    }
}

/// Cuts a region into plots and road segments.
#[derive(Clone, Debug, Default)]
pub struct PlotPartitioner {
    params: PartitionParams,
}

impl PlotPartitioner {
    pub fn new(params: PartitionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PartitionParams {
        &self.params
    }

    /// Partition `region` into a fresh `PlotSet`.
    pub fn partition(&self, region: VoxelBox, rng: &mut SiteRng) -> PlotSet {
        let params = &self.params;
        let min_dim = params.min_plot_dim.max(1);
        let mut plots = PlotSet::new(region);
        let mut backlog = VecDeque::from([region]);

        while let Some(current) = match params.traversal {
            Traversal::Lifo => backlog.pop_back(),
            Traversal::Fifo => backlog.pop_front(),
        } {
            let stop_early = rng.random_bool(params.leaf_chance);
            if stop_early
                && current.width() < params.max_plot_dim
                && current.length() < params.max_plot_dim
            {
                let id = plots.push(current, None);
                trace!(%id, bounds = %current, "leaf by chance");
                continue;
            }

            let mut axes = Axis::HORIZONTAL;
            rng.shuffle(&mut axes);

            let mut did_split = false;
            for axis in axes {
                let extent = current.extent(axis);
                let extra_space = extent.saturating_sub(min_dim.saturating_mul(2));
                if extra_space <= 0 {
                    continue;
                }
                let (gap, tag) = params.gap_for(extra_space);
                let high = extent.saturating_sub(min_dim).saturating_sub(gap);
                if gap < 1 || high < min_dim {
                    continue;
                }
                let offset = rng.range_i32_inclusive(min_dim, high);

                let halves = current.split_along_axis_at(axis, offset, SplitAnchor::Box);
                let [plot1, rest] = halves[..] else {
                    continue;
                };
                let halves = rest.split_along_axis_at(axis, gap, SplitAnchor::Box);
                let [road, plot2] = halves[..] else {
                    continue;
                };
                backlog.push_back(plot1);
                backlog.push_back(plot2);
                let id = plots.push(road, Some(tag));
                debug!(%id, bounds = %current, ?axis, offset, gap, tag, "split");
                did_split = true;
                break;
            }

            if !did_split {
                let id = plots.push(current, None);
                trace!(%id, bounds = %current, "leaf");
            }
        }

        debug!(%region, plots = plots.len(), "partitioned");
        plots
    }
}
