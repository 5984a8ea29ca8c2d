#![feature(portable_simd)]

//! particle_octree - Concurrent octree spatial index for dynamic particles
//!
//! An adaptive octree over a fixed world box that many threads can insert
//! into, move, remove and query at the same time. Leaves split when they
//! exceed a fixed capacity (down to a depth cap); moved particles are
//! relocated lazily through a reflow queue drained once per tick.
//!
//! # Features
//!
//! - **Concurrent mutation**: shared-lock fast path with per-leaf spin locks,
//!   exclusive lock only for structural change
//! - **Bulk build**: large batches are binned breadth-first in one pass
//! - **SIMD radius scan**: leaf payloads are tested 8 lanes at a time using
//!   portable_simd
//! - **Metrics**: optional counters behind the `metrics` feature
//!
//! # Example
//!
//! ```ignore
//! use glam::Vec3;
//! use particle_octree::{Aabb3, Octree};
//!
//! let octree = Octree::new(Aabb3::new(Vec3::ZERO, Vec3::splat(100.0)))?;
//! let id = octree.add_particle(Vec3::splat(10.0))?;
//!
//! octree.update_particle(id, Vec3::splat(90.0))?;
//! octree.process_particle_reflow();
//!
//! let near = octree.get_particles_in_radius(Vec3::splat(90.0), 1.0);
//! assert_eq!(near, vec![id]);
//! ```

pub mod error;
pub mod metrics;
pub mod octree;
pub mod simd_search;
pub mod sync;

// Re-export commonly used items
pub use error::{ConfigError, OctreeError};
pub use metrics::OctreeMetrics;
pub use octree::{Aabb3, NodeIndex, Octree, OctreeConfig, OctreeNode, OctreeStats, ParticleId, Point3D};
