//! Concurrent octree over dynamic point particles.
//!
//! Nodes live in an arena addressed by [`NodeIndex`]; particles in a dense
//! store addressed by [`ParticleId`]. Leaves hold id lists behind per-leaf
//! spin locks, the structure as a whole sits behind one `RwLock`.
//!
//! # Octant convention
//!
//! ```text
//! bit 0 = X, bit 1 = Y, bit 2 = Z
//! a bit is set when the coordinate is >= the node center
//! ```
//!
//! # Module Structure
//!
//! - [`bounds`]: `Aabb3` - axis-aligned boxes and octant geometry
//! - [`node`]: `OctreeNode` - immutable per-node geometry and path code
//! - [`config`]: `OctreeConfig` - leaf capacity, depth cap, bulk threshold
//! - `arena`: node records and the payload list pool
//! - `particles`: per-particle position and leaf/slot bookkeeping
//! - `index`: the `Octree` itself; `insert`, `mutate` and `query` extend it

pub mod bounds;
pub mod config;
pub mod node;

mod arena;
mod index;
mod insert;
mod mutate;
mod particles;
mod query;

// Re-exports
pub use arena::{LIST_POOL_CAPACITY, ROOT};
pub use bounds::{Aabb3, Point3D};
pub use config::OctreeConfig;
pub use index::{Octree, OctreeStats};
pub use node::OctreeNode;
pub use particles::{NodeIndex, ParticleId, NO_NODE, TOMBSTONE};
