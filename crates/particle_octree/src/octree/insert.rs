//! Insertion: single-particle routing and the bulk build.
//!
//! A particle is routed from the root under the shared tree lock. If the
//! descent meets a missing child or a full leaf, routing falls back to the
//! exclusive lock, where children are created and leaves split until the
//! particle fits. Every structural change happens under the exclusive lock.

use std::collections::VecDeque;
use std::ops::Range;

use super::arena::{Arena, ROOT};
use super::bounds::Point3D;
use super::index::Octree;
use super::particles::{NodeIndex, ParticleId, ParticleView, NO_NODE};
use crate::error::OctreeError;
use crate::sync;

/// Outcome of the shared-lock fast path.
enum FastPath {
  /// Placed, or nothing left to do (removed or cleared meanwhile).
  Done,
  /// Needs a missing child or a split.
  Restructure,
}

impl Octree {
  /// Insert one particle and return its id.
  pub fn add_particle(&self, position: Point3D) -> Result<ParticleId, OctreeError> {
    self.check_in_bounds(position)?;
    let (ids, epoch) = self.reserve(&[position])?;
    let id = ids.start;
    self.route(id, epoch);
    tracing::trace!(id, %position, "particle added");
    Ok(id)
  }

  /// Insert a batch of particles and return their ids, in input order.
  ///
  /// Every position is validated first; one out-of-bounds position rejects
  /// the whole batch. Batches above `bulk_insert_threshold` are built with a
  /// single exclusive-lock traversal.
  #[tracing::instrument(skip_all, fields(count = positions.len()))]
  pub fn add_particles(&self, positions: &[Point3D]) -> Result<Vec<ParticleId>, OctreeError> {
    for &position in positions {
      self.check_in_bounds(position)?;
    }
    if positions.is_empty() {
      return Ok(Vec::new());
    }

    if positions.len() > self.config.bulk_insert_threshold {
      return self.bulk_insert(positions);
    }

    let (ids, epoch) = self.reserve(positions)?;
    for id in ids.clone() {
      self.route(id, epoch);
    }
    self.process_particle_reflow();
    Ok(ids.collect())
  }

  /// Issue ids for `positions` and capture the epoch they belong to.
  ///
  /// Held under the shared tree lock so a `clear` cannot land in between.
  fn reserve(&self, positions: &[Point3D]) -> Result<(Range<ParticleId>, u64), OctreeError> {
    let arena = sync::read(&self.tree);
    let ids = self
      .particles
      .reserve(positions)
      .ok_or(OctreeError::IdSpaceExhausted)?;
    Ok((ids, arena.epoch))
  }

  /// Place unplaced particle `id` in the leaf covering its position.
  ///
  /// Abandons silently if the octree was cleared since `epoch`.
  pub(crate) fn route(&self, id: ParticleId, epoch: u64) {
    {
      let arena = sync::read(&self.tree);
      if arena.epoch != epoch {
        return;
      }
      if let FastPath::Done = self.place_shared(&arena, id) {
        return;
      }
    }

    let mut arena = sync::write(&self.tree);
    if arena.epoch != epoch {
      return;
    }
    self.place_exclusive(&mut arena, id);
  }

  /// Descend and append under the shared tree lock and one leaf spin lock.
  fn place_shared(&self, arena: &Arena, id: ParticleId) -> FastPath {
    let position = {
      let particles = self.particles.read();
      let record = &particles[id as usize];
      if record.is_tombstone() {
        return FastPath::Done;
      }
      record.position()
    };

    let mut index = ROOT;
    loop {
      let node = arena.node(index);
      let Some(payload) = node.payload.as_ref() else {
        let child = node.children[node.geometry.octant_of(position) as usize];
        if child == NO_NODE {
          return FastPath::Restructure;
        }
        index = child;
        continue;
      };

      let mut list = payload.lock();
      if !self.config.leaf_accepts(list.len(), node.geometry.depth) {
        return FastPath::Restructure;
      }
      let slot = list.len();
      list.push(id);

      let particles = self.particles.read();
      let record = &particles[id as usize];
      record.place(index, slot);
      if record.is_tombstone() {
        // Removed while in flight; the remover saw no leaf.
        list.pop();
        record.unplace();
      } else if !node.geometry.bounds.contains(record.position()) {
        // Moved while in flight.
        let _ = self.reflow_tx.send(id);
      }
      return FastPath::Done;
    }
  }

  /// Descend under the exclusive lock, creating children and splitting full
  /// leaves until the particle fits.
  fn place_exclusive(&self, arena: &mut Arena, id: ParticleId) {
    let particles = self.particles.read();
    let record = &particles[id as usize];
    if record.is_tombstone() {
      return;
    }
    let position = record.position();

    let mut index = ROOT;
    loop {
      let depth = arena.node(index).geometry.depth;
      if let Some(payload) = arena.node_mut(index).payload.as_mut() {
        let list = payload.get_mut();
        if self.config.leaf_accepts(list.len(), depth) {
          let slot = list.len();
          list.push(id);
          record.place(index, slot);
          return;
        }
        self.split_leaf(arena, &particles, index);
      }

      let octant = arena.node(index).geometry.octant_of(position);
      index = self.child(arena, index, octant);
    }
  }

  /// Turn full leaf `index` into an internal node, moving its payload into
  /// lazily created children.
  fn split_leaf(&self, arena: &mut Arena, particles: &ParticleView<'_>, index: NodeIndex) {
    let nodes_before = arena.nodes.len();
    let moved = arena.convert_to_internal(index, |arena, ids| {
      for &id in ids {
        let octant = arena.node(index).geometry.octant_of(particles[id as usize].position());
        let child = arena.child_or_create(index, octant);
        append(arena, particles, child, id);
      }
      ids.len()
    });

    let created = arena.nodes.len() - nodes_before;
    self.metrics.record_split(created);
    tracing::trace!(
      node = index,
      depth = arena.node(index).geometry.depth,
      moved,
      created,
      "leaf split"
    );
  }

  /// Child at `octant`, created on demand.
  #[inline]
  fn child(&self, arena: &mut Arena, parent: NodeIndex, octant: u8) -> NodeIndex {
    let nodes_before = arena.nodes.len();
    let child = arena.child_or_create(parent, octant);
    if arena.nodes.len() > nodes_before {
      self.metrics.record_nodes_created(1);
    }
    child
  }

  /// Breadth-first build of a large batch under one exclusive lock.
  ///
  /// Each queued entry is a node plus the ids bound for its subtree. Leaves
  /// absorb the batch when it fits; otherwise their payload joins the batch,
  /// the leaf becomes internal and the batch is binned by octant.
  #[tracing::instrument(skip_all, fields(count = positions.len()))]
  fn bulk_insert(&self, positions: &[Point3D]) -> Result<Vec<ParticleId>, OctreeError> {
    let mut arena = sync::write(&self.tree);
    let ids = self
      .particles
      .reserve(positions)
      .ok_or(OctreeError::IdSpaceExhausted)?;
    let particles = self.particles.read();
    let nodes_before = arena.nodes.len();

    let mut queue: VecDeque<(NodeIndex, Vec<ParticleId>)> = VecDeque::new();
    queue.push_back((ROOT, ids.clone().collect()));

    while let Some((index, mut batch)) = queue.pop_front() {
      let depth = arena.node(index).geometry.depth;
      if let Some(payload) = arena.node_mut(index).payload.as_mut() {
        let existing = payload.get_mut().len();
        if existing + batch.len() <= self.config.max_particles_per_leaf || depth >= self.config.max_depth {
          for id in batch {
            append(&mut arena, &particles, index, id);
          }
          continue;
        }
        arena.convert_to_internal(index, |_, old| batch.extend_from_slice(old));
      }

      let mut bins: [Vec<ParticleId>; 8] = Default::default();
      let geometry = arena.node(index).geometry;
      for id in batch {
        bins[geometry.octant_of(particles[id as usize].position()) as usize].push(id);
      }
      for (octant, bin) in bins.into_iter().enumerate() {
        if !bin.is_empty() {
          let child = arena.child_or_create(index, octant as u8);
          queue.push_back((child, bin));
        }
      }
    }

    let created = arena.nodes.len() - nodes_before;
    self.metrics.record_bulk_build();
    self.metrics.record_nodes_created(created);
    tracing::debug!(
      count = positions.len(),
      created,
      nodes = arena.nodes.len(),
      "bulk build complete"
    );
    Ok(ids.collect())
  }
}

/// Append `id` to leaf `leaf` and record its slot. Exclusive lock only.
#[inline]
fn append(arena: &mut Arena, particles: &ParticleView<'_>, leaf: NodeIndex, id: ParticleId) {
  if let Some(payload) = arena.node_mut(leaf).payload.as_mut() {
    let list = payload.get_mut();
    particles[id as usize].place(leaf, list.len());
    list.push(id);
  }
}

#[cfg(test)]
#[path = "insert_test.rs"]
mod insert_test;
