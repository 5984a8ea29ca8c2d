//! Octree benchmarks.
//!
//! - **insert**: per-particle insertion vs. the bulk build
//! - **query**: radius queries, single and batched
//! - **tick**: one simulation step of updates followed by a reflow drain

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use particle_octree::{Aabb3, Octree, OctreeConfig, ParticleId};
use rand::{rngs::StdRng, Rng, SeedableRng};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn world() -> Aabb3 {
  Aabb3::new(Vec3::ZERO, Vec3::splat(1000.0))
}

fn random_points(count: usize, seed: u64) -> Vec<Vec3> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      Vec3::new(
        rng.random_range(0.0f32..1000.0),
        rng.random_range(0.0f32..1000.0),
        rng.random_range(0.0f32..1000.0),
      )
    })
    .collect()
}

fn populated(count: usize) -> Octree {
  let octree = Octree::with_config(world(), OctreeConfig::default()).unwrap();
  octree.add_particles(&random_points(count, 1)).unwrap();
  octree
}

// =============================================================================
// Insertion
// =============================================================================

fn bench_insert(c: &mut Criterion) {
  let mut group = c.benchmark_group("insert");

  for &count in &SIZES {
    let points = random_points(count, 2);
    group.throughput(Throughput::Elements(count as u64));

    group.bench_with_input(BenchmarkId::new("single", count), &points, |b, points| {
      b.iter(|| {
        let octree = Octree::new(world()).unwrap();
        for &p in points {
          black_box(octree.add_particle(p).unwrap());
        }
        octree
      })
    });

    group.bench_with_input(BenchmarkId::new("bulk", count), &points, |b, points| {
      b.iter(|| {
        let octree = Octree::new(world()).unwrap();
        black_box(octree.add_particles(points).unwrap());
        octree
      })
    });
  }

  group.finish();
}

// =============================================================================
// Queries
// =============================================================================

fn bench_query(c: &mut Criterion) {
  let mut group = c.benchmark_group("query");
  let octree = populated(100_000);
  let centers = random_points(256, 3);

  for radius in [5.0f32, 25.0, 100.0] {
    group.bench_with_input(BenchmarkId::new("radius", radius), &radius, |b, &radius| {
      let mut i = 0;
      b.iter(|| {
        i = (i + 1) % centers.len();
        black_box(octree.get_particles_in_radius(centers[i], radius))
      })
    });
  }

  let queries: Vec<(Vec3, f32)> = centers.iter().map(|&c| (c, 25.0)).collect();
  group.throughput(Throughput::Elements(queries.len() as u64));
  group.bench_function("radius_batch_256", |b| {
    b.iter(|| black_box(octree.get_particles_in_radius_batch(&queries)))
  });

  let probe = Aabb3::from_center_size(Vec3::splat(500.0), Vec3::splat(50.0));
  group.bench_function("box_50", |b| b.iter(|| black_box(octree.get_particles_in_box(&probe))));

  group.finish();
}

// =============================================================================
// Update + reflow tick
// =============================================================================

fn bench_tick(c: &mut Criterion) {
  let mut group = c.benchmark_group("tick");

  for &count in &SIZES {
    let octree = populated(count);
    let mut rng = StdRng::seed_from_u64(4);
    group.throughput(Throughput::Elements(count as u64));

    group.bench_function(BenchmarkId::new("update_reflow", count), |b| {
      b.iter(|| {
        let updates: Vec<(ParticleId, Vec3)> = octree
          .get_all_particles()
          .into_iter()
          .enumerate()
          .map(|(id, p)| {
            let step = Vec3::new(
              rng.random_range(-2.0f32..2.0),
              rng.random_range(-2.0f32..2.0),
              rng.random_range(-2.0f32..2.0),
            );
            (id as ParticleId, (p + step).clamp(world().min, world().max))
          })
          .collect();
        octree.update_particles(&updates).unwrap();
        black_box(octree.process_particle_reflow())
      })
    });
  }

  group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_tick);
criterion_main!(benches);
