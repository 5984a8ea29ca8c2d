use super::*;

#[test]
fn test_defaults() {
  let config = OctreeConfig::default();
  assert_eq!(config.max_particles_per_leaf, 10);
  assert_eq!(config.max_depth, 27);
  assert_eq!(config.bulk_insert_threshold, 1024);
  assert!(config.validate().is_ok());
}

#[test]
fn test_builder_helpers() {
  let config = OctreeConfig::default()
    .with_max_particles_per_leaf(1)
    .with_max_depth(21)
    .with_bulk_insert_threshold(64);
  assert_eq!(config.max_particles_per_leaf, 1);
  assert_eq!(config.max_depth, 21);
  assert_eq!(config.bulk_insert_threshold, 64);
}

#[test]
fn test_zero_capacity_rejected() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(0);
  assert_eq!(config.validate(), Err(ConfigError::ZeroLeafCapacity));
}

#[test]
fn test_depth_range() {
  assert!(OctreeConfig::default().with_max_depth(0).validate().is_err());
  assert!(OctreeConfig::default().with_max_depth(MAX_CODE_DEPTH).validate().is_ok());
  assert_eq!(
    OctreeConfig::default().with_max_depth(MAX_CODE_DEPTH + 1).validate(),
    Err(ConfigError::DepthOutOfRange {
      max_depth: MAX_CODE_DEPTH + 1,
      limit: MAX_CODE_DEPTH,
    })
  );
}

/// Below the depth cap a full leaf refuses; at the cap it always accepts.
#[test]
fn test_leaf_accepts() {
  let config = OctreeConfig::default().with_max_particles_per_leaf(2).with_max_depth(5);
  assert!(config.leaf_accepts(0, 0));
  assert!(config.leaf_accepts(1, 4));
  assert!(!config.leaf_accepts(2, 4));
  assert!(config.leaf_accepts(2, 5));
  assert!(config.leaf_accepts(1000, 5));
}
