// Plots: the leaves of a partitioned settlement region.
//
// A `Plot` is a `VoxelBox` annotated with string tags ("road", "gap",
// "house", ...), the ids of its neighbouring plots and, after the auction,
// the id of the builder that won it. Plots are created once by the
// partitioner and never resized; tags, neighbours and the builder are filled
// in by later passes.
//
// All plots of one generation run live in a `PlotSet` arena together with
// the parent region they were cut from. Plots refer to each other by
// `PlotId`, never by reference, so the set can be mutated pass by pass and
// serialized as a whole. `PlotView` is the read-only handle builder policies
// bid through; it bundles a plot with its set so neighbour and
// region-relative queries (`excentricity`, `has_neighbour_with_tag`, ...)
// are one call.
//
// See also: `partition.rs` which fills a `PlotSet`, `auction.rs` which reads
// plots through `PlotView` and records builder assignments,
// `geometry.rs` for the adjacency predicates.
//
// **Critical constraint: determinism.** Plot ids are dense and follow
// emission order; neighbour lists are built in id order.

use crate::geometry::VoxelBox;
use crate::types::{BuilderId, PlotId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::ops::Index;
use thiserror::Error;

/// Tag of road segments (gap width above one).
pub const TAG_ROAD: &str = "road";
/// Tag of one-voxel pedestrian gaps.
pub const TAG_GAP: &str = "gap";
pub const TAG_HOUSE: &str = "house";
pub const TAG_ACRE: &str = "acre";
pub const TAG_FALLOW: &str = "fallow";

/// Which box relations make two plots neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighbourMode {
    /// Face-adjacent plots are neighbours.
    pub touch: bool,
    /// Plots with a non-empty intersection are neighbours.
    pub overlap: bool,
}

impl Default for NeighbourMode {
    fn default() -> Self {
        Self {
            touch: true,
            overlap: false,
        }
    }
}

/// How `PlotSet::filter_by_tag` combines several tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

/// One leaf region of the settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    id: PlotId,
    bounds: VoxelBox,
    tags: BTreeSet<String>,
    neighbours: SmallVec<[PlotId; 8]>,
    builder: Option<BuilderId>,
}

impl Plot {
    pub fn id(&self) -> PlotId {
        self.id
    }

    pub fn bounds(&self) -> VoxelBox {
        self.bounds
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// True for road and gap segments.
    pub fn is_passage(&self) -> bool {
        self.has_tag(TAG_ROAD) || self.has_tag(TAG_GAP)
    }

    pub fn neighbours(&self) -> &[PlotId] {
        &self.neighbours
    }

    /// The builder that won this plot in the auction, if any.
    pub fn builder(&self) -> Option<BuilderId> {
        self.builder
    }

    /// Footprint area.
    pub fn area(&self) -> i64 {
        self.bounds.area()
    }

    /// Smaller of the two footprint extents.
    pub fn min_dimension(&self) -> i32 {
        self.bounds.width().min(self.bounds.length())
    }

    /// Larger of the two footprint extents.
    pub fn max_dimension(&self) -> i32 {
        self.bounds.width().max(self.bounds.length())
    }
}

// ---------------------------------------------------------------------------
// PlotSet
// ---------------------------------------------------------------------------

/// A loaded `PlotSet` whose ids don't line up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlotSetError {
    #[error("plot at index {index} carries id {id}")]
    Misnumbered { index: usize, id: PlotId },
    #[error("{plot} lists {neighbour}, which is not in the set")]
    DanglingNeighbour { plot: PlotId, neighbour: PlotId },
}

/// Every plot of a generation run plus the region they partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlotSetRepr")]
pub struct PlotSet {
    region: VoxelBox,
    plots: Vec<Plot>,
}

#[derive(Deserialize)]
struct PlotSetRepr {
    region: VoxelBox,
    plots: Vec<Plot>,
}

impl TryFrom<PlotSetRepr> for PlotSet {
    type Error = PlotSetError;

    fn try_from(repr: PlotSetRepr) -> Result<Self, PlotSetError> {
        let count = repr.plots.len();
        for (index, plot) in repr.plots.iter().enumerate() {
            if plot.id.index() != index {
                return Err(PlotSetError::Misnumbered { index, id: plot.id });
            }
            if let Some(&neighbour) = plot.neighbours.iter().find(|n| n.index() >= count) {
                return Err(PlotSetError::DanglingNeighbour {
                    plot: plot.id,
                    neighbour,
                });
            }
        }
        Ok(PlotSet {
            region: repr.region,
            plots: repr.plots,
        })
    }
}

impl PlotSet {
    pub fn new(region: VoxelBox) -> Self {
        Self {
            region,
            plots: Vec::new(),
        }
    }

    /// The parent region the plots were cut from.
    pub fn region(&self) -> VoxelBox {
        self.region
    }

    /// Append a plot, optionally tagged, and return its id.
    pub fn push(&mut self, bounds: VoxelBox, tag: Option<&str>) -> PlotId {
        let id = PlotId(self.plots.len() as u32);
        let mut tags = BTreeSet::new();
        if let Some(tag) = tag {
            tags.insert(tag.to_string());
        }
        self.plots.push(Plot {
            id,
            bounds,
            tags,
            neighbours: SmallVec::new(),
            builder: None,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    pub fn get(&self, id: PlotId) -> Option<&Plot> {
        self.plots.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plot> {
        self.plots.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlotId> + use<> {
        (0..self.plots.len() as u32).map(PlotId)
    }

    /// Read-only handle for queries relative to the whole set.
    pub fn view(&self, id: PlotId) -> PlotView<'_> {
        PlotView { set: self, id }
    }

    /// Add `tag` to a plot. Unknown ids are ignored.
    pub fn add_tag(&mut self, id: PlotId, tag: &str) {
        if let Some(plot) = self.plots.get_mut(id.index()) {
            plot.tags.insert(tag.to_string());
        }
    }

    pub(crate) fn assign(&mut self, id: PlotId, builder: BuilderId) {
        if let Some(plot) = self.plots.get_mut(id.index()) {
            plot.builder = Some(builder);
        }
    }

    /// Plots carrying any (or all) of `tags`.
    pub fn filter_by_tag<'a>(
        &'a self,
        tags: &'a [&'a str],
        quantifier: Quantifier,
    ) -> impl Iterator<Item = &'a Plot> + 'a {
        self.plots.iter().filter(move |plot| match quantifier {
            Quantifier::Any => tags.iter().any(|t| plot.has_tag(t)),
            Quantifier::All => tags.iter().all(|t| plot.has_tag(t)),
        })
    }

    /// Rebuild every plot's neighbour list.
    ///
    /// Compares every ordered pair of distinct plots, so each relation is
    /// recorded in both directions. Quadratic in the plot count, which stays
    /// in the hundreds even for large regions.
    pub fn fill_in_neighbours(&mut self, mode: NeighbourMode) {
        let lists: Vec<SmallVec<[PlotId; 8]>> = self
            .plots
            .iter()
            .map(|plot| {
                self.plots
                    .iter()
                    .filter(|other| other.id != plot.id)
                    .filter(|other| {
                        (mode.touch && plot.bounds.touches(&other.bounds))
                            || (mode.overlap && plot.bounds.overlaps(&other.bounds))
                    })
                    .map(|other| other.id)
                    .collect()
            })
            .collect();
        for (plot, list) in self.plots.iter_mut().zip(lists) {
            plot.neighbours = list;
        }
    }
}

impl Index<PlotId> for PlotSet {
    type Output = Plot;

    fn index(&self, id: PlotId) -> &Plot {
        &self.plots[id.index()]
    }
}

// ---------------------------------------------------------------------------
// PlotView
// ---------------------------------------------------------------------------

/// A plot seen together with its set.
#[derive(Clone, Copy, Debug)]
pub struct PlotView<'a> {
    set: &'a PlotSet,
    id: PlotId,
}

impl<'a> PlotView<'a> {
    pub fn id(&self) -> PlotId {
        self.id
    }

    pub fn plot(&self) -> &'a Plot {
        &self.set[self.id]
    }

    pub fn set(&self) -> &'a PlotSet {
        self.set
    }

    pub fn bounds(&self) -> VoxelBox {
        self.plot().bounds
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.plot().has_tag(tag)
    }

    pub fn area(&self) -> i64 {
        self.plot().area()
    }

    /// Distance of the plot's center from the region's center, normalized
    /// by half the region's larger footprint extent and clamped to 1.
    pub fn excentricity(&self) -> f64 {
        let region = self.set.region;
        let extents = (region.width() as f64 / 2.0).max(region.length() as f64 / 2.0);
        (self.bounds().center_distance(&region) / extents).min(1.0)
    }

    pub fn centricity(&self) -> f64 {
        1.0 - self.excentricity()
    }

    pub fn neighbours(&self) -> impl Iterator<Item = &'a Plot> + use<'a> {
        let set = self.set;
        self.plot().neighbours.iter().map(move |&id| &set[id])
    }

    pub fn neighbours_with_tag<'t>(
        &self,
        tag: &'t str,
    ) -> impl Iterator<Item = &'a Plot> + use<'a, 't> {
        self.neighbours().filter(move |p| p.has_tag(tag))
    }

    pub fn has_neighbour_with_tag(&self, tag: &str) -> bool {
        self.neighbours_with_tag(tag).next().is_some()
    }

    /// The tagged neighbour with the largest smaller footprint extent; the
    /// first in neighbour order on ties.
    pub fn widest_neighbour_with_tag(&self, tag: &str) -> Option<&'a Plot> {
        let mut widest: Option<&'a Plot> = None;
        for plot in self.neighbours_with_tag(tag) {
            if widest.is_none_or(|w| plot.min_dimension() > w.min_dimension()) {
                widest = Some(plot);
            }
        }
        widest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoxelCoord;

    fn bx(o: (i32, i32, i32), s: (i32, i32, i32)) -> VoxelBox {
        VoxelBox::new(VoxelCoord::new(o.0, o.1, o.2), VoxelCoord::new(s.0, s.1, s.2))
    }

    /// Two 5x5 lots either side of a 3-wide road, plus a lot far away.
    fn street() -> PlotSet {
        let mut set = PlotSet::new(bx((0, 0, 0), (13, 3, 20)));
        set.push(bx((0, 0, 0), (5, 3, 5)), None);
        set.push(bx((5, 0, 0), (3, 3, 5)), Some(TAG_ROAD));
        set.push(bx((8, 0, 0), (5, 3, 5)), None);
        set.push(bx((0, 0, 15), (5, 3, 5)), None);
        set
    }

    #[test]
    fn neighbours_are_symmetric() {
        let mut set = street();
        set.fill_in_neighbours(NeighbourMode::default());
        assert_eq!(set[PlotId(0)].neighbours(), &[PlotId(1)]);
        assert_eq!(set[PlotId(1)].neighbours(), &[PlotId(0), PlotId(2)]);
        assert_eq!(set[PlotId(2)].neighbours(), &[PlotId(1)]);
        assert!(set[PlotId(3)].neighbours().is_empty());
        for plot in set.iter() {
            for &n in plot.neighbours() {
                assert!(set[n].neighbours().contains(&plot.id()));
            }
        }
    }

    #[test]
    fn overlap_mode_links_overlapping_plots_only() {
        let mut set = PlotSet::new(bx((0, 0, 0), (10, 1, 10)));
        set.push(bx((0, 0, 0), (5, 1, 5)), None);
        set.push(bx((3, 0, 3), (5, 1, 5)), None);
        set.push(bx((5, 0, 0), (5, 1, 4)), None);
        set.fill_in_neighbours(NeighbourMode {
            touch: false,
            overlap: true,
        });
        assert_eq!(set[PlotId(0)].neighbours(), &[PlotId(1)]);
        assert_eq!(set[PlotId(2)].neighbours(), &[PlotId(1)]);
    }

    #[test]
    fn refilling_neighbours_replaces_lists() {
        let mut set = street();
        set.fill_in_neighbours(NeighbourMode::default());
        set.fill_in_neighbours(NeighbourMode::default());
        assert_eq!(set[PlotId(1)].neighbours().len(), 2);
    }

    #[test]
    fn neighbour_tag_queries() {
        let mut set = street();
        set.fill_in_neighbours(NeighbourMode::default());
        let lot = set.view(PlotId(0));
        assert!(lot.has_neighbour_with_tag(TAG_ROAD));
        assert!(!lot.has_neighbour_with_tag(TAG_GAP));
        assert_eq!(lot.neighbours_with_tag(TAG_ROAD).count(), 1);
        assert_eq!(lot.widest_neighbour_with_tag(TAG_ROAD).map(Plot::id), Some(PlotId(1)));
        assert!(!set.view(PlotId(3)).has_neighbour_with_tag(TAG_ROAD));
    }

    #[test]
    fn widest_neighbour_prefers_wider_road() {
        let mut set = PlotSet::new(bx((0, 0, 0), (20, 1, 20)));
        let lot = set.push(bx((5, 0, 5), (5, 1, 5)), None);
        set.push(bx((10, 0, 5), (1, 1, 5)), Some(TAG_ROAD));
        let wide = set.push(bx((5, 0, 10), (5, 1, 5)), Some(TAG_ROAD));
        set.fill_in_neighbours(NeighbourMode::default());
        let widest = set.view(lot).widest_neighbour_with_tag(TAG_ROAD);
        assert_eq!(widest.map(Plot::id), Some(wide));
    }

    #[test]
    fn excentricity_is_normalized_and_clamped() {
        let mut set = PlotSet::new(bx((0, 0, 0), (20, 4, 20)));
        let middle = set.push(bx((8, 0, 8), (4, 4, 4)), None);
        let corner = set.push(bx((0, 0, 0), (2, 4, 2)), None);
        let edge = set.push(bx((0, 0, 8), (2, 4, 4)), None);
        assert!(set.view(middle).excentricity().abs() < 1e-9);
        assert!((set.view(middle).centricity() - 1.0).abs() < 1e-9);
        assert_eq!(set.view(corner).excentricity(), 1.0);
        // Center (1, 2, 10) is 9 from (10, 2, 10); extents are 10.
        assert!((set.view(edge).excentricity() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn filter_by_tag_any_and_all() {
        let mut set = street();
        set.add_tag(PlotId(0), TAG_HOUSE);
        set.add_tag(PlotId(1), TAG_HOUSE);
        let any: Vec<_> = set
            .filter_by_tag(&[TAG_ROAD, TAG_GAP], Quantifier::Any)
            .map(Plot::id)
            .collect();
        assert_eq!(any, vec![PlotId(1)]);
        let all: Vec<_> = set
            .filter_by_tag(&[TAG_ROAD, TAG_HOUSE], Quantifier::All)
            .map(Plot::id)
            .collect();
        assert_eq!(all, vec![PlotId(1)]);
        assert_eq!(set.filter_by_tag(&[TAG_HOUSE], Quantifier::Any).count(), 2);
    }

    #[test]
    fn plot_dimensions() {
        let set = street();
        let road = &set[PlotId(1)];
        assert_eq!(road.area(), 15);
        assert_eq!(road.min_dimension(), 3);
        assert_eq!(road.max_dimension(), 5);
        assert!(road.is_passage());
        assert!(!set[PlotId(0)].is_passage());
        assert_eq!(road.tags().collect::<Vec<_>>(), vec![TAG_ROAD]);
    }

    #[test]
    fn loading_checks_plot_ids() {
        let mut set = street();
        set.fill_in_neighbours(NeighbourMode::default());
        let json = serde_json::to_value(&set).unwrap();
        let restored: PlotSet = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(restored, set);

        let mut dangling = json.clone();
        dangling["plots"][0]["neighbours"] = serde_json::json!([1, 99]);
        let err = serde_json::from_value::<PlotSet>(dangling).unwrap_err();
        assert!(err.to_string().contains("plot#99"), "{err}");

        let mut misnumbered = json;
        misnumbered["plots"][2]["id"] = serde_json::json!(7);
        assert!(serde_json::from_value::<PlotSet>(misnumbered).is_err());
    }
}
