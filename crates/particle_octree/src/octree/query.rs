//! Range queries.
//!
//! Both queries walk the tree depth-first with an explicit stack under the
//! shared tree lock, pruning nodes whose box misses the region. A leaf's spin
//! lock is held only while its payload is scanned.

use rayon::prelude::*;
use smallvec::SmallVec;

use super::arena::{Arena, ROOT};
use super::bounds::{Aabb3, Point3D};
use super::index::Octree;
use super::particles::{NodeIndex, ParticleId};
use crate::simd_search;
use crate::sync;

/// Traversal stack, inline for typical tree shapes.
type NodeStack = SmallVec<[NodeIndex; 64]>;

impl Octree {
  /// Ids of all particles within `radius` of `center` (boundary inclusive).
  ///
  /// Particles awaiting reflow are reported at their old leaf, so they may be
  /// missed here until the next [`Octree::process_particle_reflow`].
  pub fn get_particles_in_radius(&self, center: Point3D, radius: f32) -> Vec<ParticleId> {
    let mut out = Vec::new();
    if radius.is_nan() || radius < 0.0 || !center.is_finite() {
      return out;
    }
    self.metrics.record_query();

    let r2 = radius * radius;
    let arena = sync::read(&self.tree);
    visit_leaves(
      &arena,
      |bounds| bounds.distance_squared_to(center) <= r2,
      |ids| {
        let particles = self.particles.read();
        simd_search::scan_radius(ids, |id| particles[id as usize].coords(), center, radius, &mut out);
      },
    );
    out
  }

  /// Run many radius queries in parallel, one result per `(center, radius)`.
  pub fn get_particles_in_radius_batch(&self, queries: &[(Point3D, f32)]) -> Vec<Vec<ParticleId>> {
    queries
      .par_iter()
      .map(|&(center, radius)| self.get_particles_in_radius(center, radius))
      .collect()
  }

  /// Ids of all particles inside `query` (boundary inclusive).
  pub fn get_particles_in_box(&self, query: &Aabb3) -> Vec<ParticleId> {
    let mut out = Vec::new();
    if !query.is_valid() {
      return out;
    }
    self.metrics.record_query();

    let arena = sync::read(&self.tree);
    visit_leaves(
      &arena,
      |bounds| bounds.intersects(query),
      |ids| {
        let particles = self.particles.read();
        out.extend(
          ids
            .iter()
            .copied()
            .filter(|&id| query.contains(particles[id as usize].position())),
        );
      },
    );
    out
  }
}

/// Depth-first walk calling `scan` on the payload of every leaf whose box
/// passes `keep`.
fn visit_leaves(arena: &Arena, keep: impl Fn(&Aabb3) -> bool, mut scan: impl FnMut(&[ParticleId])) {
  let mut stack: NodeStack = SmallVec::new();
  stack.push(ROOT);

  while let Some(index) = stack.pop() {
    let node = arena.node(index);
    if !keep(&node.geometry.bounds) {
      continue;
    }
    match node.payload.as_ref() {
      Some(payload) => {
        let list = payload.lock();
        if !list.is_empty() {
          scan(&list);
        }
      }
      None => stack.extend(node.child_indices()),
    }
  }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;
