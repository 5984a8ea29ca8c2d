use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::octree::{Aabb3, OctreeConfig};

fn world() -> Aabb3 {
  Aabb3::new(Vec3::ZERO, Vec3::splat(100.0))
}

fn random_points(count: usize, seed: u64) -> Vec<Vec3> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      Vec3::new(
        rng.random_range(0.0f32..100.0),
        rng.random_range(0.0f32..100.0),
        rng.random_range(0.0f32..100.0),
      )
    })
    .collect()
}

fn sorted(mut ids: Vec<ParticleId>) -> Vec<ParticleId> {
  ids.sort_unstable();
  ids
}

/// Every inserted particle is in the snapshot and in a root-box query.
#[test]
fn test_completeness() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(8);
  let octree = Octree::with_config(world(), config).unwrap();
  let points = random_points(1000, 1);

  let ids: Vec<ParticleId> = points.iter().map(|&p| octree.add_particle(p).unwrap()).collect();
  assert_eq!(ids, (0..1000).collect::<Vec<_>>());

  let all = octree.get_all_particles();
  assert_eq!(all, points);
  assert_eq!(sorted(octree.get_particles_in_box(&world())), ids);
  assert!(octree.node_count() > 1);
  octree.check_invariants().unwrap();
}

/// Inserted particles are found by a small radius query around them.
#[test]
fn test_radius_round_trip() {
  let octree = Octree::new(world()).unwrap();
  for (i, p) in random_points(300, 2).into_iter().enumerate() {
    let id = octree.add_particle(p).unwrap();
    assert_eq!(id as usize, i);
    assert!(
      octree.get_particles_in_radius(p, 1e-3).contains(&id),
      "Particle {} not found at {}",
      id,
      p
    );
  }
}

/// Overflowing a capacity-1 root splits it into two children.
#[test]
fn test_split_creates_only_needed_children() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(1);
  let octree = Octree::with_config(world(), config).unwrap();
  let a = octree.add_particle(Vec3::splat(10.0)).unwrap();
  let b = octree.add_particle(Vec3::splat(90.0)).unwrap();

  assert_eq!(octree.node_count(), 3);
  assert_eq!(octree.leaf_count(), 2);
  assert_eq!(octree.get_depth(), 1);

  let leaf_a = octree.particle_leaf(a).unwrap().unwrap();
  let leaf_b = octree.particle_leaf(b).unwrap().unwrap();
  assert_ne!(leaf_a, leaf_b);
  assert_ne!(leaf_a, ROOT);
  octree.check_invariants().unwrap();
}

/// Coincident points stop splitting at the depth cap and all stay indexed.
#[test]
fn test_depth_cap() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(4).with_max_depth(21);
  let octree = Octree::with_config(world(), config).unwrap();
  for i in 0..200 {
    let jitter = (i % 7) as f32 * 1e-6;
    octree.add_particle(Vec3::splat(37.0 + jitter)).unwrap();
  }

  assert!(octree.get_depth() <= 21, "Depth {} exceeds cap", octree.get_depth());
  assert_eq!(octree.get_all_particles().len(), 200);
  assert_eq!(octree.get_particles_in_box(&world()).len(), 200);
  assert_eq!(octree.get_particles_in_radius(Vec3::splat(37.0), 0.01).len(), 200);
  octree.check_invariants().unwrap();
}

/// Batches above the threshold take the bulk path and answer queries the
/// same way as per-point insertion.
#[test]
fn test_bulk_matches_per_point() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(6);
  let points = random_points(3000, 3);

  let bulk = Octree::with_config(world(), config).unwrap();
  let bulk_ids = bulk.add_particles(&points).unwrap();

  let single = Octree::with_config(world(), config).unwrap();
  let single_ids: Vec<ParticleId> = points.iter().map(|&p| single.add_particle(p).unwrap()).collect();

  assert_eq!(bulk_ids, single_ids);
  bulk.check_invariants().unwrap();
  single.check_invariants().unwrap();

  for (center, radius) in random_points(40, 4).into_iter().zip([1.0, 5.0, 12.5, 30.0].into_iter().cycle()) {
    assert_eq!(
      sorted(bulk.get_particles_in_radius(center, radius)),
      sorted(single.get_particles_in_radius(center, radius)),
      "Radius query at {} r={} differs",
      center,
      radius
    );
  }
  let probe = Aabb3::new(Vec3::new(10.0, 20.0, 30.0), Vec3::new(60.0, 55.0, 90.0));
  assert_eq!(
    sorted(bulk.get_particles_in_box(&probe)),
    sorted(single.get_particles_in_box(&probe))
  );
}

/// A bulk batch merges with payloads already in the tree.
#[test]
fn test_bulk_into_populated_tree() {
  let config = OctreeConfig::default()
    .with_max_particles_per_leaf(4)
    .with_bulk_insert_threshold(64);
  let octree = Octree::with_config(world(), config).unwrap();

  let first = random_points(50, 5);
  for &p in &first {
    octree.add_particle(p).unwrap();
  }
  let second = random_points(500, 6);
  let ids = octree.add_particles(&second).unwrap();
  assert_eq!(ids, (50..550).collect::<Vec<_>>());

  assert_eq!(octree.get_particles_in_box(&world()).len(), 550);
  for (&id, &p) in ids.iter().zip(&second) {
    assert!(octree.get_particles_in_radius(p, 1e-3).contains(&id));
  }
  octree.check_invariants().unwrap();
}

/// Small batches go through the single-point path.
#[test]
fn test_small_batch() {
  let octree = Octree::new(world()).unwrap();
  let points = random_points(100, 7);
  let ids = octree.add_particles(&points).unwrap();
  assert_eq!(ids, (0..100).collect::<Vec<_>>());
  assert_eq!(octree.get_all_particles(), points);
  octree.check_invariants().unwrap();

  assert_eq!(octree.add_particles(&[]).unwrap(), Vec::<ParticleId>::new());
}

/// One bad position rejects the whole batch with nothing inserted.
#[test]
fn test_batch_rejected_atomically() {
  let octree = Octree::new(world()).unwrap();
  let mut points = random_points(2000, 8);
  points[1234] = Vec3::new(50.0, 150.0, 50.0);

  let err = octree.add_particles(&points).unwrap_err();
  assert!(matches!(err, OctreeError::OutOfBounds { .. }));
  assert_eq!(octree.particle_count(), 0);
  assert_eq!(octree.node_count(), 1);
}

/// Split payload lists come back to the pool.
#[test]
fn test_split_recycles_lists() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(1);
  let octree = Octree::with_config(world(), config).unwrap();
  octree.add_particle(Vec3::splat(10.0)).unwrap();
  assert_eq!(octree.pooled_lists(), 0);

  octree.add_particle(Vec3::splat(90.0)).unwrap();
  // Root list returned, then taken again by one of the two new children
  assert_eq!(octree.pooled_lists(), 0);

  octree.clear();
  assert_eq!(octree.pooled_lists(), 1);
}

#[cfg(feature = "metrics")]
#[test]
fn test_metrics_count_structural_work() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(1);
  let octree = Octree::with_config(world(), config).unwrap();
  octree.add_particle(Vec3::splat(10.0)).unwrap();
  octree.add_particle(Vec3::splat(90.0)).unwrap();
  assert_eq!(octree.metrics().splits(), 1);
  assert_eq!(octree.metrics().nodes_created(), 2);

  octree.add_particles(&random_points(2000, 9)).unwrap();
  assert_eq!(octree.metrics().bulk_builds(), 1);
  assert_eq!(octree.metrics().nodes_created() as usize, octree.node_count() - 1);
}
