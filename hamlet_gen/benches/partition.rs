// Partitioner throughput.
//
// Run with: cargo bench -p hamlet_gen --bench partition

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use hamlet_gen::geometry::VoxelBox;
use hamlet_gen::partition::{PartitionParams, PlotPartitioner, Traversal};
use hamlet_gen::plot::NeighbourMode;
use hamlet_gen::prng::SiteRng;
use hamlet_gen::types::VoxelCoord;

fn region(side: i32) -> VoxelBox {
    VoxelBox::new(VoxelCoord::new(0, 0, 0), VoxelCoord::new(side, 8, side))
}

fn benchmark_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    group.sample_size(10);

    for side in [256, 2048] {
        group.throughput(Throughput::Elements((side as u64) * (side as u64)));
        for traversal in [Traversal::Lifo, Traversal::Fifo] {
            let partitioner = PlotPartitioner::new(PartitionParams {
                traversal,
                ..Default::default()
            });
            group.bench_function(format!("{side}x{side}_{traversal:?}"), |b| {
                let mut seed = 0u64;
                b.iter(|| {
                    seed = seed.wrapping_add(1);
                    black_box(partitioner.partition(region(side), &mut SiteRng::new(seed)))
                });
            });
        }
    }

    group.finish();
}

fn benchmark_neighbours(c: &mut Criterion) {
    let plots = PlotPartitioner::default().partition(region(256), &mut SiteRng::new(42));

    c.bench_function("fill_in_neighbours_256x256", |b| {
        b.iter(|| {
            let mut set = plots.clone();
            set.fill_in_neighbours(NeighbourMode::default());
            black_box(set)
        });
    });
}

criterion_group!(benches, benchmark_partition, benchmark_neighbours);
criterion_main!(benches);
