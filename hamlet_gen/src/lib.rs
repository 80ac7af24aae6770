// hamlet_gen: procedural settlement layout for voxel worlds.
//
// This crate lays out a settlement inside a box of a voxel level: it cuts
// the box into plots separated by roads, lets competing builder policies bid
// for the plots in a weighted auction, and hands every won plot to its
// builder. It knows nothing about any particular block palette; terrain
// comes in through the `Site` trait and voxels go out through `Level`.
//
// Module overview:
// - `types.rs`:     VoxelCoord, Axis, Direction, PlotId, BuilderId.
// - `geometry.rs`:  VoxelBox (split, expand, faces, touch/overlap) and the FlatBox 2D view.
// - `weights.rs`:   WeightedSelector, proportional and extremal picks over a weight table.
// - `plot.rs`:      Plot, the PlotSet arena, PlotView queries, the adjacency pass.
// - `partition.rs`: PlotPartitioner, backlog-driven recursive splitting with road tiers.
// - `auction.rs`:   BuilderPolicy, BuilderRegistry, the bid/build Auction, BuilderCollective.
// - `gating.rs`:    Gated policies and PlotPredicate.
// - `level.rs`:     Level trait + VoxelGrid, a dense in-memory level.
// - `site.rs`:      Site trait, SiteInfo, FlatSite.
// - `builders.rs`:  Reference policies: roads, houses, acres, fallow land.
// - `config.rs`:    SettlementConfig, loaded from JSON.
// - `generate.rs`:  The `generate` entry point tying it all together.
// - `prng`:         Re-exported from `hamlet_prng`: xoshiro256++ PRNG with SplitMix64 seeding.
//
// The `layout` binary (src/bin/layout.rs) runs a settlement over a flat
// in-memory level and prints its plan.
//
// **Critical constraint: determinism.** A layout is a pure function of the
// level, the region, the config and the seed. All randomness comes from one
// `SiteRng` threaded through every stage in a fixed order. No `HashMap`, no
// system time in any decision. Use `BTreeMap` for ordered collections.

pub mod auction;
pub mod builders;
pub mod config;
pub mod gating;
pub mod generate;
pub mod geometry;
pub mod level;
pub mod partition;
pub mod plot;
pub use hamlet_prng as prng;
pub mod site;
pub mod types;
pub mod weights;
