// The builder auction: allocating plots to competing builder policies.
//
// A `BuilderPolicy` bids for plots with an interest value in [0, 1], may
// record something when it wins (`award`), and later renders its plots
// (`build`). Policies are registered in an explicit `BuilderRegistry`; an
// `Auction` borrows the registry and runs two phases over a `PlotSet`:
//
// - **Bid.** For each plot in id order, every policy states its interest.
//   If the highest interest is positive, one policy is drawn with
//   probability proportional to its interest (one `SiteRng` draw), the
//   assignment is recorded on the plot and the winner's `award` hook runs.
//   Plots nobody wants stay unassigned; that is a normal outcome, reported
//   in `AuctionReport::unbid`.
// - **Build.** Each assigned plot, in id order, is handed to its policy's
//   `build` exactly once. `Auction::build` stops at the first failure and
//   returns it as `AuctionError::PolicyFault`; `Auction::build_isolated`
//   keeps going and returns every failure. A plot assigned to a builder the
//   registry doesn't hold is an `AuctionError::UnknownBuilder`, never a
//   silent skip.
//
// Interest outside [0, 1] is a policy bug. The auction logs it and clamps
// (NaN counts as 0) instead of failing.
//
// `BuilderCollective` bundles several policies into one bidder: it bids the
// maximum of its members' interests and, when it wins a plot, draws one
// member by their interests and delegates `award` and `build` to it.
//
// See also: `gating.rs` for predicate-gated policies, `builders.rs` for the
// reference policies, `weights.rs` for the selector used for the draw,
// `generate.rs` which runs both phases.
//
// **Critical constraint: determinism.** Plots are visited in id order and
// policies in registration order. Each awarded plot costs exactly one draw
// plus whatever its policy's `award` consumes.

use crate::geometry::GeometryError;
use crate::level::Level;
use crate::plot::{PlotSet, PlotView};
use crate::prng::SiteRng;
use crate::site::Site;
use crate::types::{BuilderId, PlotId};
use crate::weights::WeightedSelector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("{message}")]
    Policy { message: String },
}

impl BuildError {
    pub fn policy(message: impl Into<String>) -> Self {
        BuildError::Policy {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("builder '{builder}' failed on {plot}")]
    PolicyFault {
        builder: String,
        plot: PlotId,
        #[source]
        source: BuildError,
    },
    /// The plot was awarded to a builder the building registry doesn't have,
    /// usually because bid and build ran against different registries.
    #[error("{plot} is assigned to {builder}, which is not registered")]
    UnknownBuilder { builder: BuilderId, plot: PlotId },
}

/// Everything a policy may touch while building.
pub struct BuildContext<'a, L: Level> {
    pub level: &'a mut L,
    pub site: &'a dyn Site<Material = L::Material>,
    pub plots: &'a PlotSet,
    pub rng: &'a mut SiteRng,
}

/// A pluggable strategy that bids for plots and builds on the ones it wins.
pub trait BuilderPolicy<L: Level> {
    fn name(&self) -> &str;

    /// How much this policy wants `plot`, in [0, 1]. Zero means never.
    fn interest(&self, plot: PlotView<'_>) -> f64;

    /// Called once when this policy wins `plot`.
    fn award(&mut self, _plots: &mut PlotSet, _plot: PlotId, _rng: &mut SiteRng) {}

    /// Render `plot`. Called once per awarded plot.
    fn build(&mut self, ctx: &mut BuildContext<'_, L>, plot: PlotId) -> Result<(), BuildError>;
}

/// Clamp a reported interest into [0, 1], logging out-of-range values.
pub fn checked_interest(builder: &str, plot: PlotId, raw: f64) -> f64 {
    if raw.is_nan() {
        warn!(builder, %plot, "interest is NaN, treating as 0");
        0.0
    } else if !(0.0..=1.0).contains(&raw) {
        warn!(builder, %plot, raw, "interest outside [0, 1], clamping");
        raw.clamp(0.0, 1.0)
    } else {
        raw
    }
}

/// Draw an index proportionally to `interests`. `None` when none is positive.
pub fn pick_by_interest(interests: &[f64], rng: &mut SiteRng) -> Option<usize> {
    let table = WeightedSelector::from_weights(
        None,
        interests.iter().enumerate().map(|(i, &w)| (Some(i), w)),
    );
    *table.random(rng)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The policies taking part in an auction, in registration order.
pub struct BuilderRegistry<L: Level> {
    policies: Vec<Box<dyn BuilderPolicy<L>>>,
}

impl<L: Level> Default for BuilderRegistry<L> {
    fn default() -> Self {
        Self {
            policies: Vec::new(),
        }
    }
}

impl<L: Level> BuilderRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, policy: impl BuilderPolicy<L> + 'static) -> BuilderId {
        self.register_boxed(Box::new(policy))
    }

    pub fn register_boxed(&mut self, policy: Box<dyn BuilderPolicy<L>>) -> BuilderId {
        let id = BuilderId(self.policies.len() as u32);
        self.policies.push(policy);
        id
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn name(&self, id: BuilderId) -> Option<&str> {
        self.policies.get(id.index()).map(|p| p.name())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|p| p.name())
    }
}

// ---------------------------------------------------------------------------
// Auction
// ---------------------------------------------------------------------------

/// Per-builder award count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderTally {
    pub name: String,
    pub awarded: usize,
}

/// Outcome of the bid phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionReport {
    pub assigned: usize,
    /// Plots no policy showed interest in, in id order.
    pub unbid: Vec<PlotId>,
    /// One entry per registered builder, in registration order.
    pub per_builder: Vec<BuilderTally>,
}

pub struct Auction<'r, L: Level> {
    registry: &'r mut BuilderRegistry<L>,
}

impl<'r, L: Level> Auction<'r, L> {
    pub fn new(registry: &'r mut BuilderRegistry<L>) -> Self {
        Self { registry }
    }

    /// Run the bid phase, recording the winner of each plot on the plot.
    pub fn bid(&mut self, plots: &mut PlotSet, rng: &mut SiteRng) -> AuctionReport {
        let mut report = AuctionReport {
            per_builder: self
                .registry
                .names()
                .map(|name| BuilderTally {
                    name: name.to_string(),
                    awarded: 0,
                })
                .collect(),
            ..Default::default()
        };

        for id in plots.ids() {
            let view = plots.view(id);
            let interests: Vec<f64> = self
                .registry
                .policies
                .iter()
                .map(|p| checked_interest(p.name(), id, p.interest(view)))
                .collect();

            let Some(winner) = pick_by_interest(&interests, rng) else {
                report.unbid.push(id);
                continue;
            };
            let builder = BuilderId(winner as u32);
            plots.assign(id, builder);
            let policy = &mut self.registry.policies[winner];
            debug!(%id, builder = policy.name(), interest = interests[winner], "awarded");
            policy.award(plots, id, rng);
            report.assigned += 1;
            report.per_builder[winner].awarded += 1;
        }

        debug!(
            assigned = report.assigned,
            unbid = report.unbid.len(),
            "bid phase done"
        );
        report
    }

    /// Run the build phase, stopping at the first failing policy. Returns
    /// the number of plots built.
    pub fn build(&mut self, ctx: &mut BuildContext<'_, L>) -> Result<usize, AuctionError> {
        let plots = ctx.plots;
        let mut built = 0;
        for plot in plots.iter() {
            let Some(builder) = plot.builder() else {
                continue;
            };
            self.build_one(ctx, builder, plot.id())?;
            built += 1;
        }
        Ok(built)
    }

    /// Run the build phase, building every plot whose policy does not fail
    /// and returning all failures.
    pub fn build_isolated(&mut self, ctx: &mut BuildContext<'_, L>) -> Vec<AuctionError> {
        let plots = ctx.plots;
        let mut failures = Vec::new();
        for plot in plots.iter() {
            let Some(builder) = plot.builder() else {
                continue;
            };
            if let Err(e) = self.build_one(ctx, builder, plot.id()) {
                warn!(error = %e, "build failed, continuing");
                failures.push(e);
            }
        }
        failures
    }

    fn build_one(
        &mut self,
        ctx: &mut BuildContext<'_, L>,
        builder: BuilderId,
        plot: PlotId,
    ) -> Result<(), AuctionError> {
        let Some(policy) = self.registry.policies.get_mut(builder.index()) else {
            return Err(AuctionError::UnknownBuilder { builder, plot });
        };
        policy
            .build(ctx, plot)
            .map_err(|source| AuctionError::PolicyFault {
                builder: policy.name().to_string(),
                plot,
                source,
            })
    }
}

// ---------------------------------------------------------------------------
// BuilderCollective
// ---------------------------------------------------------------------------

/// Several policies bidding as one.
pub struct BuilderCollective<L: Level> {
    name: String,
    members: Vec<Box<dyn BuilderPolicy<L>>>,
    chosen: BTreeMap<PlotId, usize>,
}

impl<L: Level> BuilderCollective<L> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            chosen: BTreeMap::new(),
        }
    }

    pub fn with(mut self, member: impl BuilderPolicy<L> + 'static) -> Self {
        self.members.push(Box::new(member));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Name of the member that was awarded `plot`, if any.
    pub fn member_for(&self, plot: PlotId) -> Option<&str> {
        self.chosen.get(&plot).map(|&i| self.members[i].name())
    }

    fn member_interests(&self, plot: PlotView<'_>) -> Vec<f64> {
        self.members
            .iter()
            .map(|m| checked_interest(m.name(), plot.id(), m.interest(plot)))
            .collect()
    }
}

impl<L: Level> BuilderPolicy<L> for BuilderCollective<L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn interest(&self, plot: PlotView<'_>) -> f64 {
        self.member_interests(plot).into_iter().fold(0.0, f64::max)
    }

    fn award(&mut self, plots: &mut PlotSet, plot: PlotId, rng: &mut SiteRng) {
        let interests = self.member_interests(plots.view(plot));
        if let Some(i) = pick_by_interest(&interests, rng) {
            self.chosen.insert(plot, i);
            self.members[i].award(plots, plot, rng);
        }
    }

    fn build(&mut self, ctx: &mut BuildContext<'_, L>, plot: PlotId) -> Result<(), BuildError> {
        match self.chosen.get(&plot) {
            Some(&i) => self.members[i].build(ctx, plot),
            None => Err(BuildError::policy(format!(
                "no member of '{}' was awarded {plot}",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VoxelBox;
    use crate::level::VoxelGrid;
    use crate::site::{FlatSite, SiteInfo};
    use crate::types::VoxelCoord;

    type Grid = VoxelGrid<u8>;

    /// Bids a fixed interest on plots whose x origin is below `below_x`
    /// and stamps `mark` on the plot's floor when building.
    struct Stamp {
        name: &'static str,
        interest: f64,
        below_x: i32,
        mark: u8,
        awarded: Vec<PlotId>,
    }

    fn stamp(name: &'static str, interest: f64, mark: u8) -> Stamp {
        Stamp {
            name,
            interest,
            below_x: i32::MAX,
            mark,
            awarded: Vec::new(),
        }
    }

    impl BuilderPolicy<Grid> for Stamp {
        fn name(&self) -> &str {
            self.name
        }

        fn interest(&self, plot: PlotView<'_>) -> f64 {
            if plot.bounds().origin().x < self.below_x {
                self.interest
            } else {
                0.0
            }
        }

        fn award(&mut self, plots: &mut PlotSet, plot: PlotId, _rng: &mut SiteRng) {
            self.awarded.push(plot);
            plots.add_tag(plot, self.name);
        }

        fn build(
            &mut self,
            ctx: &mut BuildContext<'_, Grid>,
            plot: PlotId,
        ) -> Result<(), BuildError> {
            let floor = ctx.plots[plot].bounds().floor();
            ctx.level.fill(floor, self.mark);
            Ok(())
        }
    }

    /// Wants every plot and fails on plots at odd x.
    struct Flaky;

    impl BuilderPolicy<Grid> for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn interest(&self, _plot: PlotView<'_>) -> f64 {
            1.0
        }

        fn build(
            &mut self,
            ctx: &mut BuildContext<'_, Grid>,
            plot: PlotId,
        ) -> Result<(), BuildError> {
            let b = ctx.plots[plot].bounds();
            if b.origin().x % 2 == 1 {
                return Err(BuildError::policy("odd plot"));
            }
            ctx.level.fill(b.floor(), 9);
            Ok(())
        }
    }

    /// `n` unit plots in a row along x.
    fn row(n: i32) -> PlotSet {
        let region = VoxelBox::new(VoxelCoord::new(0, 0, 0), VoxelCoord::new(n, 1, 1));
        let mut set = PlotSet::new(region);
        for x in 0..n {
            set.push(VoxelBox::new(VoxelCoord::new(x, 0, 0), VoxelCoord::new(1, 1, 1)), None);
        }
        set
    }

    fn run_build(
        registry: &mut BuilderRegistry<Grid>,
        plots: &PlotSet,
        rng: &mut SiteRng,
    ) -> (Grid, Result<usize, AuctionError>) {
        let mut level = Grid::new(plots.region());
        let site: FlatSite<u8> = FlatSite::new(plots.region(), 0, SiteInfo::default());
        let mut ctx = BuildContext {
            level: &mut level,
            site: &site,
            plots,
            rng,
        };
        let result = Auction::new(registry).build(&mut ctx);
        (level, result)
    }

    #[test]
    fn assigned_iff_some_interest() {
        let mut registry = BuilderRegistry::new();
        let mut left = stamp("left", 0.5, 1);
        left.below_x = 4;
        registry.register(left);
        registry.register(stamp("never", 0.0, 2));
        let mut plots = row(10);
        let report = Auction::new(&mut registry).bid(&mut plots, &mut SiteRng::new(3));

        assert_eq!(report.assigned, 4);
        assert_eq!(report.unbid, (4..10).map(PlotId).collect::<Vec<_>>());
        for plot in plots.iter() {
            let expected = (plot.bounds().origin().x < 4).then_some(BuilderId(0));
            assert_eq!(plot.builder(), expected);
        }
        assert_eq!(report.per_builder[0].awarded, 4);
        assert_eq!(report.per_builder[1].awarded, 0);
        assert_eq!(report.per_builder[1].name, "never");
    }

    #[test]
    fn all_zero_round_leaves_everything_unbuilt() {
        let mut registry = BuilderRegistry::new();
        registry.register(stamp("zero", 0.0, 1));
        let mut plots = row(5);
        let mut rng = SiteRng::new(1);
        let report = Auction::new(&mut registry).bid(&mut plots, &mut rng);
        assert_eq!(report.assigned, 0);
        assert_eq!(report.unbid.len(), 5);

        let (level, built) = run_build(&mut registry, &plots, &mut rng);
        assert_eq!(built.unwrap(), 0);
        assert_eq!(level.count(1), 0);
    }

    #[test]
    fn draw_is_proportional_to_interest() {
        let mut registry = BuilderRegistry::new();
        registry.register(stamp("big", 0.75, 1));
        registry.register(stamp("small", 0.25, 2));
        let mut plots = row(4000);
        let report = Auction::new(&mut registry).bid(&mut plots, &mut SiteRng::new(11));
        assert_eq!(report.assigned, 4000);
        let share = report.per_builder[0].awarded as f64 / 4000.0;
        assert!((0.72..0.78).contains(&share), "got {share}");
    }

    #[test]
    fn award_hook_runs_once_per_won_plot() {
        let mut registry = BuilderRegistry::new();
        registry.register(stamp("only", 1.0, 1));
        let mut plots = row(6);
        Auction::new(&mut registry).bid(&mut plots, &mut SiteRng::new(2));
        assert_eq!(plots.filter_by_tag(&["only"], crate::plot::Quantifier::Any).count(), 6);
    }

    #[test]
    fn out_of_range_interest_is_clamped() {
        assert_eq!(checked_interest("x", PlotId(0), 7.0), 1.0);
        assert_eq!(checked_interest("x", PlotId(0), -1.0), 0.0);
        assert_eq!(checked_interest("x", PlotId(0), f64::NAN), 0.0);
        assert_eq!(checked_interest("x", PlotId(0), 0.3), 0.3);

        let mut registry = BuilderRegistry::new();
        registry.register(stamp("nan", f64::NAN, 1));
        let mut plots = row(3);
        let report = Auction::new(&mut registry).bid(&mut plots, &mut SiteRng::new(2));
        assert_eq!(report.assigned, 0);
    }

    #[test]
    fn build_stamps_each_assigned_plot() {
        let mut registry = BuilderRegistry::new();
        registry.register(stamp("a", 0.5, 1));
        registry.register(stamp("b", 0.5, 2));
        let mut plots = row(20);
        let mut rng = SiteRng::new(5);
        let report = Auction::new(&mut registry).bid(&mut plots, &mut rng);
        let (level, built) = run_build(&mut registry, &plots, &mut rng);
        assert_eq!(built.unwrap(), 20);
        assert_eq!(level.count(1), report.per_builder[0].awarded);
        assert_eq!(level.count(2), report.per_builder[1].awarded);
    }

    #[test]
    fn build_aborts_on_first_fault() {
        let mut registry = BuilderRegistry::new();
        registry.register(Flaky);
        let mut plots = row(6);
        let mut rng = SiteRng::new(1);
        Auction::new(&mut registry).bid(&mut plots, &mut rng);
        let (level, result) = run_build(&mut registry, &plots, &mut rng);
        match result {
            Err(AuctionError::PolicyFault { builder, plot, .. }) => {
                assert_eq!(builder, "flaky");
                assert_eq!(plot, PlotId(1));
            }
            other => panic!("expected a policy fault, got {other:?}"),
        }
        // Only the plot before the fault was built.
        assert_eq!(level.count(9), 1);
    }

    #[test]
    fn build_isolated_collects_every_fault() {
        let mut registry = BuilderRegistry::new();
        registry.register(Flaky);
        let mut plots = row(6);
        let mut rng = SiteRng::new(1);
        Auction::new(&mut registry).bid(&mut plots, &mut rng);

        let mut level = Grid::new(plots.region());
        let site: FlatSite<u8> = FlatSite::new(plots.region(), 0, SiteInfo::default());
        let mut ctx = BuildContext {
            level: &mut level,
            site: &site,
            plots: &plots,
            rng: &mut rng,
        };
        let failures = Auction::new(&mut registry).build_isolated(&mut ctx);
        assert_eq!(failures.len(), 3);
        assert_eq!(level.count(9), 3);
    }

    #[test]
    fn collective_bids_max_and_remembers_member() {
        let mut low = stamp("low", 0.2, 1);
        low.below_x = 2;
        let high = stamp("high", 0.6, 2);
        let collective = BuilderCollective::new("crew").with(low).with(high);
        assert_eq!(collective.len(), 2);

        let plots = row(4);
        let policy: &dyn BuilderPolicy<Grid> = &collective;
        assert_eq!(policy.interest(plots.view(PlotId(0))), 0.6);
        assert_eq!(policy.interest(plots.view(PlotId(3))), 0.6);

        let mut registry = BuilderRegistry::new();
        registry.register(collective);
        let mut plots = row(40);
        let mut rng = SiteRng::new(21);
        let report = Auction::new(&mut registry).bid(&mut plots, &mut rng);
        assert_eq!(report.assigned, 40);
        // Beyond x = 2 only "high" is interested.
        for plot in plots.iter().skip(2) {
            assert!(plot.has_tag("high"));
        }
        let (level, built) = run_build(&mut registry, &plots, &mut rng);
        assert_eq!(built.unwrap(), 40);
        assert_eq!(level.count(1) + level.count(2), 40);
        assert!(level.count(2) >= 38);
    }

    #[test]
    fn building_with_a_smaller_registry_is_an_error() {
        let mut bidders = BuilderRegistry::new();
        bidders.register(stamp("a", 0.5, 1));
        bidders.register(stamp("b", 0.5, 2));
        let mut plots = row(20);
        let mut rng = SiteRng::new(8);
        let report = Auction::new(&mut bidders).bid(&mut plots, &mut rng);
        assert!(report.per_builder[1].awarded > 0);

        let mut builders = BuilderRegistry::new();
        builders.register(stamp("a", 0.5, 1));
        let first_orphan = plots
            .iter()
            .find(|p| p.builder() == Some(BuilderId(1)))
            .map(|p| p.id());
        let (_, result) = run_build(&mut builders, &plots, &mut rng);
        match result {
            Err(AuctionError::UnknownBuilder { builder, plot }) => {
                assert_eq!(builder, BuilderId(1));
                assert_eq!(Some(plot), first_orphan);
            }
            other => panic!("expected an unknown builder, got {other:?}"),
        }

        let mut level = Grid::new(plots.region());
        let site: FlatSite<u8> = FlatSite::new(plots.region(), 0, SiteInfo::default());
        let mut ctx = BuildContext {
            level: &mut level,
            site: &site,
            plots: &plots,
            rng: &mut rng,
        };
        let failures = Auction::new(&mut builders).build_isolated(&mut ctx);
        assert_eq!(failures.len(), report.per_builder[1].awarded);
        assert_eq!(level.count(1), report.per_builder[0].awarded);
        assert_eq!(level.count(2), 0);
    }

    #[test]
    fn collective_refuses_plots_it_never_awarded() {
        let mut collective = BuilderCollective::new("crew").with(stamp("only", 1.0, 1));
        let plots = row(2);
        let mut level = Grid::new(plots.region());
        let site: FlatSite<u8> = FlatSite::new(plots.region(), 0, SiteInfo::default());
        let mut rng = SiteRng::new(1);
        let mut ctx = BuildContext {
            level: &mut level,
            site: &site,
            plots: &plots,
            rng: &mut rng,
        };
        let result = BuilderPolicy::<Grid>::build(&mut collective, &mut ctx, PlotId(1));
        assert!(matches!(result, Err(BuildError::Policy { .. })));
        assert_eq!(level.count(1), 0);
    }

    #[test]
    fn same_seed_same_assignment() {
        let assign = |seed| {
            let mut registry = BuilderRegistry::new();
            registry.register(stamp("a", 0.3, 1));
            registry.register(stamp("b", 0.9, 2));
            let mut plots = row(50);
            Auction::new(&mut registry).bid(&mut plots, &mut SiteRng::new(seed));
            plots.iter().map(|p| p.builder()).collect::<Vec<_>>()
        };
        assert_eq!(assign(4), assign(4));
    }
}
