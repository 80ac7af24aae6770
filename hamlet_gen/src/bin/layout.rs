// Hamlet layout: CLI entry point.
//
// Generates one settlement on a flat in-memory level and prints its plan.
// The pipeline: config → flat terrain → partition → auction → build.
//
// Usage:
//   cargo run -p hamlet_gen --bin layout -- [--width N] [--length N]
//     [--height N] [--seed N] [--config PATH] [--json]
//
// Without `--config`, the file named by HAMLET_CONFIG_PATH is used if set.
// Log output goes to stderr and is controlled by RUST_LOG.
//
// Plan legend: `#` road, `.` gap, `H` house, `~` acre, `,` fallow,
// blank for plots nobody built on.

use hamlet_gen::builders::default_registry;
use hamlet_gen::config::SettlementConfig;
use hamlet_gen::generate::{Settlement, generate, grow_to_minimum};
use hamlet_gen::geometry::VoxelBox;
use hamlet_gen::level::{Level, VoxelGrid};
use hamlet_gen::plot::{Plot, TAG_ACRE, TAG_FALLOW, TAG_GAP, TAG_HOUSE, TAG_ROAD};
use hamlet_gen::prng::SiteRng;
use hamlet_gen::site::{FlatSite, MaterialClass, SiteInfo};
use hamlet_gen::types::{Axis, VoxelCoord};
use hamlet_gen::weights::WeightedSelector;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// The little palette this binary renders with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
enum Block {
    #[default]
    Air,
    Dirt,
    Grass,
    Cobblestone,
    Granite,
    OakPlanks,
    SprucePlanks,
    Farmland,
    Wheat,
    Carrots,
    Potatoes,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let width: i32 = parse_flag(&args, "--width").unwrap_or(128);
    let length: i32 = parse_flag(&args, "--length").unwrap_or(128);
    let height: i32 = parse_flag(&args, "--height").unwrap_or(16);
    let seed: Option<u64> = parse_flag(&args, "--seed");
    let config_path: Option<String> = parse_flag(&args, "--config");
    let json = args.iter().any(|a| a == "--json");

    let mut config = match config_path {
        Some(path) => match SettlementConfig::load(Path::new(&path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        None => SettlementConfig::from_env(),
    };
    if let Some(s) = seed {
        config.seed = s;
    }

    if width < 1 || length < 1 || height < 2 {
        eprintln!("error: region must be at least 1x2x1");
        process::exit(1);
    }
    let region = VoxelBox::new(VoxelCoord::new(0, 0, 0), VoxelCoord::new(width, height, length));
    let ground = height / 3;

    let mut level = flat_level(region, &config, ground);
    let mut registry = default_registry(config.house.clone());
    let mut rng = SiteRng::new(config.seed);
    let settlement = match generate(
        &mut level,
        region,
        &config,
        &mut registry,
        |_, bounds, info| flat_site(bounds, ground, info),
        &mut rng,
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&settlement) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    println!("=== Hamlet layout ===");
    println!("Region: {}", settlement.region);
    println!("Seed: {}", config.seed);
    println!();
    print!("{}", render_plan(&settlement));
    println!();
    print_summary(&settlement);
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

/// A level covering the region plus its border, dirt up to `ground` with a
/// grass top.
fn flat_level(region: VoxelBox, config: &SettlementConfig, ground: i32) -> VoxelGrid<Block> {
    let border = config.site_border;
    let laid_out = config
        .minimum_region
        .map_or(region, |minimum| grow_to_minimum(region, minimum));
    let bounds = laid_out.expand(border.x.max(0), border.y.max(0), border.z.max(0));
    let mut level = VoxelGrid::new(bounds);
    let origin = bounds.origin();
    let size = bounds.size();
    let dirt_height = ground - origin.y;
    if dirt_height > 0 {
        level.fill(
            VoxelBox::new(origin, VoxelCoord::new(size.x, dirt_height, size.z)),
            Block::Dirt,
        );
    }
    level.fill(
        VoxelBox::new(origin.with(Axis::Y, ground), VoxelCoord::new(size.x, 1, size.z)),
        Block::Grass,
    );
    level
}

fn flat_site(bounds: VoxelBox, ground: i32, info: SiteInfo) -> FlatSite<Block> {
    FlatSite::new(bounds, ground, info)
        .with_materials(
            MaterialClass::Stone,
            WeightedSelector::from_weights(
                Block::Cobblestone,
                [(Block::Cobblestone, 12.0), (Block::Granite, 5.0)],
            ),
        )
        .with_materials(
            MaterialClass::Wood,
            WeightedSelector::from_weights(
                Block::OakPlanks,
                [(Block::OakPlanks, 8.0), (Block::SprucePlanks, 3.0)],
            ),
        )
        .with_materials(
            MaterialClass::Soil,
            WeightedSelector::from_weights(Block::Dirt, [(Block::Farmland, 1.0)]),
        )
        .with_materials(
            MaterialClass::Crop,
            WeightedSelector::from_weights(
                Block::Air,
                [(Block::Wheat, 3.0), (Block::Carrots, 1.0), (Block::Potatoes, 1.0)],
            ),
        )
}

fn plot_glyph(plot: &Plot) -> char {
    if plot.has_tag(TAG_HOUSE) {
        'H'
    } else if plot.has_tag(TAG_ACRE) {
        '~'
    } else if plot.has_tag(TAG_FALLOW) {
        ','
    } else if plot.has_tag(TAG_ROAD) {
        '#'
    } else if plot.has_tag(TAG_GAP) {
        '.'
    } else {
        ' '
    }
}

/// Top-down plan of the settlement, one character per column, north up.
fn render_plan(settlement: &Settlement) -> String {
    let region = settlement.region;
    let (w, l) = (region.width() as usize, region.length() as usize);
    let origin = region.origin();
    let mut rows = vec![vec![' '; w]; l];
    for plot in settlement.plots.iter() {
        let glyph = plot_glyph(plot);
        for (x, z) in plot.bounds().columns() {
            let (col, row) = ((x - origin.x) as usize, (z - origin.z) as usize);
            if let Some(cell) = rows.get_mut(row).and_then(|r| r.get_mut(col)) {
                *cell = glyph;
            }
        }
    }
    let mut out = String::with_capacity((w + 1) * l);
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    out
}

fn print_summary(settlement: &Settlement) {
    let report = &settlement.report;
    println!(
        "{} plots, {} assigned, {} unbid, {} built",
        settlement.plots.len(),
        report.assigned,
        report.unbid.len(),
        settlement.built
    );
    for tally in &report.per_builder {
        println!("  {:<8} {}", tally.name, tally.awarded);
    }
}
