//! Error types for the particle octree.

use thiserror::Error;

use crate::octree::{Aabb3, ParticleId, Point3D};

/// Errors returned by [`crate::Octree`] operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OctreeError {
  /// Position outside the root box (or not finite). Nothing was mutated.
  #[error("position {position} is outside the octree bounds {bounds:?}")]
  OutOfBounds { position: Point3D, bounds: Aabb3 },

  /// The id was never issued by this octree.
  #[error("unknown particle id {0}")]
  UnknownParticle(ParticleId),

  /// Issuing the requested ids would overflow the `u32` id space.
  #[error("particle id space exhausted")]
  IdSpaceExhausted,

  /// World bounds are not finite or have min > max on some axis.
  #[error("invalid octree bounds {0:?}")]
  InvalidBounds(Aabb3),

  #[error("invalid octree configuration: {0}")]
  InvalidConfig(#[from] ConfigError),

  /// Reported by `check_invariants` only.
  #[error("octree invariant violated: {0}")]
  InvariantViolation(String),
}

/// Configuration validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("max_particles_per_leaf must be at least 1")]
  ZeroLeafCapacity,

  #[error("max_depth {max_depth} must be within 1..={limit}")]
  DepthOutOfRange { max_depth: u32, limit: u32 },
}
