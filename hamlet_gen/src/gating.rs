// Declarative gates in front of builder policies.
//
// `Gated<P>` wraps any `BuilderPolicy` with a list of `PlotPredicate`s.
// Interest is zero unless every predicate holds; otherwise the inner
// policy's interest is passed through. `award` and `build` are forwarded
// unchanged, so a gated policy only ever sees plots that passed its gate.
//
// See also: `auction.rs` for the policy trait, `builders.rs` where the
// reference policies are gated.

use crate::auction::{BuildContext, BuildError, BuilderPolicy};
use crate::level::Level;
use crate::plot::{PlotSet, PlotView, TAG_GAP, TAG_ROAD};
use crate::prng::SiteRng;
use crate::types::PlotId;
use serde::{Deserialize, Serialize};

/// A condition on a plot's tags or footprint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlotPredicate {
    /// Not tagged "road" or "gap".
    NotARoad,
    /// Both footprint extents are at least this.
    MinDimension(i32),
    /// Both footprint extents are at most this.
    MaxDimension(i32),
    MinArea(i64),
    MaxArea(i64),
    WithTag(String),
    WithoutTag(String),
}

impl PlotPredicate {
    pub fn holds(&self, plot: PlotView<'_>) -> bool {
        let p = plot.plot();
        match self {
            PlotPredicate::NotARoad => !p.has_tag(TAG_ROAD) && !p.has_tag(TAG_GAP),
            PlotPredicate::MinDimension(d) => p.min_dimension() >= *d,
            PlotPredicate::MaxDimension(d) => p.max_dimension() <= *d,
            PlotPredicate::MinArea(a) => p.area() >= *a,
            PlotPredicate::MaxArea(a) => p.area() <= *a,
            PlotPredicate::WithTag(tag) => p.has_tag(tag),
            PlotPredicate::WithoutTag(tag) => !p.has_tag(tag),
        }
    }
}

/// A policy that only bids on plots passing all of its predicates.
pub struct Gated<P> {
    inner: P,
    predicates: Vec<PlotPredicate>,
}

impl<P> Gated<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            predicates: Vec::new(),
        }
    }

    pub fn requires(mut self, predicate: PlotPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn admits(&self, plot: PlotView<'_>) -> bool {
        self.predicates.iter().all(|p| p.holds(plot))
    }
}

impl<L: Level, P: BuilderPolicy<L>> BuilderPolicy<L> for Gated<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn interest(&self, plot: PlotView<'_>) -> f64 {
        if self.admits(plot) {
            self.inner.interest(plot)
        } else {
            0.0
        }
    }

    fn award(&mut self, plots: &mut PlotSet, plot: PlotId, rng: &mut SiteRng) {
        self.inner.award(plots, plot, rng);
    }

    fn build(&mut self, ctx: &mut BuildContext<'_, L>, plot: PlotId) -> Result<(), BuildError> {
        self.inner.build(ctx, plot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VoxelBox;
    use crate::level::VoxelGrid;
    use crate::plot::TAG_HOUSE;
    use crate::types::VoxelCoord;

    struct Eager;

    impl BuilderPolicy<VoxelGrid<u8>> for Eager {
        fn name(&self) -> &str {
            "eager"
        }

        fn interest(&self, _plot: PlotView<'_>) -> f64 {
            0.8
        }

        fn build(
            &mut self,
            _ctx: &mut BuildContext<'_, VoxelGrid<u8>>,
            _plot: PlotId,
        ) -> Result<(), BuildError> {
            Ok(())
        }
    }

    fn plots() -> PlotSet {
        let mut set = PlotSet::new(VoxelBox::new(
            VoxelCoord::new(0, 0, 0),
            VoxelCoord::new(30, 1, 30),
        ));
        // 0: 6x8 lot, 1: 3x8 road, 2: 2x2 lot, 3: 12x12 lot
        set.push(VoxelBox::new(VoxelCoord::new(0, 0, 0), VoxelCoord::new(6, 1, 8)), None);
        set.push(VoxelBox::new(VoxelCoord::new(6, 0, 0), VoxelCoord::new(3, 1, 8)), Some(TAG_ROAD));
        set.push(
            VoxelBox::new(VoxelCoord::new(9, 0, 0), VoxelCoord::new(2, 1, 2)),
            Some(TAG_HOUSE),
        );
        set.push(VoxelBox::new(VoxelCoord::new(12, 0, 12), VoxelCoord::new(12, 1, 12)), None);
        set
    }

    fn admitted(predicate: PlotPredicate) -> Vec<u32> {
        let set = plots();
        set.ids()
            .filter(|&id| predicate.holds(set.view(id)))
            .map(|id| id.0)
            .collect()
    }

    #[test]
    fn predicates() {
        assert_eq!(admitted(PlotPredicate::NotARoad), vec![0, 2, 3]);
        assert_eq!(admitted(PlotPredicate::MinDimension(5)), vec![0, 3]);
        assert_eq!(admitted(PlotPredicate::MaxDimension(8)), vec![0, 1, 2]);
        assert_eq!(admitted(PlotPredicate::MinArea(48)), vec![0, 3]);
        assert_eq!(admitted(PlotPredicate::MaxArea(24)), vec![1, 2]);
        assert_eq!(admitted(PlotPredicate::WithTag(TAG_HOUSE.into())), vec![2]);
        assert_eq!(admitted(PlotPredicate::WithoutTag(TAG_HOUSE.into())), vec![0, 1, 3]);
    }

    #[test]
    fn gate_is_a_conjunction() {
        let gated = Gated::new(Eager)
            .requires(PlotPredicate::NotARoad)
            .requires(PlotPredicate::MaxArea(100));
        let policy: &dyn BuilderPolicy<VoxelGrid<u8>> = &gated;
        let set = plots();
        let interests: Vec<f64> = set.ids().map(|id| policy.interest(set.view(id))).collect();
        assert_eq!(interests, vec![0.8, 0.0, 0.8, 0.0]);
        assert_eq!(policy.name(), "eager");
    }

    #[test]
    fn ungated_policy_passes_through() {
        let gated = Gated::new(Eager);
        let set = plots();
        assert!(set.ids().all(|id| gated.admits(set.view(id))));
    }
}
