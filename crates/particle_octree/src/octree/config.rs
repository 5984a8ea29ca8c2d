//! OctreeConfig - leaf capacity, depth cap and bulk insert threshold.

use super::node::MAX_CODE_DEPTH;
use crate::error::ConfigError;

/// Default maximum number of particles a leaf holds before it splits.
pub const DEFAULT_MAX_PARTICLES_PER_LEAF: usize = 10;

/// Default depth cap. Leaves at this depth accept any number of particles.
pub const DEFAULT_MAX_DEPTH: u32 = 27;

/// Default batch size above which `add_particles` takes the bulk path.
pub const DEFAULT_BULK_INSERT_THRESHOLD: usize = 1024;

/// Configuration for leaf splitting and batch insertion.
///
/// Lower leaf capacity means more, smaller leaves (faster point queries,
/// more nodes). The depth cap bounds memory when points cluster arbitrarily
/// close together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeConfig {
  /// Maximum payload length of a leaf below `max_depth`.
  pub max_particles_per_leaf: usize,

  /// Deepest level a node may be created at.
  pub max_depth: u32,

  /// Batches larger than this use the single-writer bulk build.
  pub bulk_insert_threshold: usize,
}

impl OctreeConfig {
  /// Set the leaf capacity.
  pub fn with_max_particles_per_leaf(mut self, max_particles_per_leaf: usize) -> Self {
    self.max_particles_per_leaf = max_particles_per_leaf;
    self
  }

  /// Set the depth cap.
  pub fn with_max_depth(mut self, max_depth: u32) -> Self {
    self.max_depth = max_depth;
    self
  }

  /// Set the bulk insert threshold.
  pub fn with_bulk_insert_threshold(mut self, bulk_insert_threshold: usize) -> Self {
    self.bulk_insert_threshold = bulk_insert_threshold;
    self
  }

  /// Check that the configuration can drive an octree.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_particles_per_leaf == 0 {
      return Err(ConfigError::ZeroLeafCapacity);
    }
    if self.max_depth == 0 || self.max_depth > MAX_CODE_DEPTH {
      return Err(ConfigError::DepthOutOfRange {
        max_depth: self.max_depth,
        limit: MAX_CODE_DEPTH,
      });
    }
    Ok(())
  }

  /// True when a leaf at `depth` holding `len` ids may take one more.
  #[inline]
  pub fn leaf_accepts(&self, len: usize, depth: u32) -> bool {
    len < self.max_particles_per_leaf || depth >= self.max_depth
  }
}

impl Default for OctreeConfig {
  fn default() -> Self {
    Self {
      max_particles_per_leaf: DEFAULT_MAX_PARTICLES_PER_LEAF,
      max_depth: DEFAULT_MAX_DEPTH,
      bulk_insert_threshold: DEFAULT_BULK_INSERT_THRESHOLD,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
