//! The concurrent octree: state, construction, snapshots and `clear`.
//!
//! Mutation protocols live in `insert.rs` and `mutate.rs`, queries in
//! `query.rs`.
//!
//! # Lock order
//!
//! ```text
//! tree RwLock (shared or exclusive)
//!   └─ one leaf SpinLock
//!        └─ particle store RwLock (innermost, never held while waiting on the others)
//! ```
//!
//! No lock is ever re-entered.

use std::sync::RwLock;

use crossbeam_channel::{self as channel, Receiver, Sender};

use super::arena::{Arena, ROOT};
use super::bounds::{Aabb3, Point3D};
use super::config::OctreeConfig;
use super::particles::{NodeIndex, ParticleId, ParticleStore, NO_NODE, TOMBSTONE};
use crate::error::OctreeError;
use crate::metrics::OctreeMetrics;
use crate::sync;

/// Concurrent octree over point particles.
///
/// All methods take `&self`; share it between threads by reference or `Arc`.
pub struct Octree {
  pub(crate) bounds: Aabb3,
  pub(crate) config: OctreeConfig,
  pub(crate) tree: RwLock<Arena>,
  pub(crate) particles: ParticleStore,
  pub(crate) reflow_tx: Sender<ParticleId>,
  pub(crate) reflow_rx: Receiver<ParticleId>,
  pub(crate) metrics: OctreeMetrics,
}

/// Point-in-time structural counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OctreeStats {
  /// Ids issued, tombstones included.
  pub particles: usize,
  pub nodes: usize,
  pub leaves: usize,
  pub max_depth: u32,
  /// Idle payload lists held by the pool.
  pub pooled_lists: usize,
  /// Particles waiting for `process_particle_reflow`.
  pub pending_reflow: usize,
}

impl Octree {
  /// Create an octree over `bounds` with the default configuration.
  pub fn new(bounds: Aabb3) -> Result<Self, OctreeError> {
    Self::with_config(bounds, OctreeConfig::default())
  }

  /// Create an octree over `bounds`.
  pub fn with_config(bounds: Aabb3, config: OctreeConfig) -> Result<Self, OctreeError> {
    if !bounds.is_valid() {
      return Err(OctreeError::InvalidBounds(bounds));
    }
    config.validate()?;

    let (reflow_tx, reflow_rx) = channel::unbounded();
    tracing::debug!(?bounds, ?config, "octree created");
    Ok(Self {
      bounds,
      config,
      tree: RwLock::new(Arena::new(bounds)),
      particles: ParticleStore::new(),
      reflow_tx,
      reflow_rx,
      metrics: OctreeMetrics::new(),
    })
  }

  /// World box covered by the root.
  pub fn bounds(&self) -> Aabb3 {
    self.bounds
  }

  pub fn config(&self) -> &OctreeConfig {
    &self.config
  }

  /// Activity counters (populated with the `metrics` feature).
  pub fn metrics(&self) -> &OctreeMetrics {
    &self.metrics
  }

  /// Number of ids issued since construction or the last `clear`,
  /// removed particles included.
  pub fn particle_count(&self) -> usize {
    self.particles.len()
  }

  pub fn node_count(&self) -> usize {
    sync::read(&self.tree).nodes.len()
  }

  pub fn leaf_count(&self) -> usize {
    sync::read(&self.tree).leaf_count()
  }

  /// Idle payload lists currently held by the pool.
  pub fn pooled_lists(&self) -> usize {
    sync::read(&self.tree).pool.len()
  }

  /// Particles queued for relocation by [`Octree::process_particle_reflow`].
  pub fn pending_reflow(&self) -> usize {
    self.reflow_rx.len()
  }

  /// Maximum depth over all nodes.
  pub fn get_depth(&self) -> u32 {
    sync::read(&self.tree).max_depth()
  }

  /// Box of every node, in arena order.
  pub fn get_box_cloud(&self) -> Vec<Aabb3> {
    let arena = sync::read(&self.tree);
    arena.nodes.iter().map(|n| n.geometry.bounds).collect()
  }

  /// Position of every particle, indexed by id. Removed particles are NaN.
  ///
  /// Positions updated concurrently may be observed mid-write.
  pub fn get_all_particles(&self) -> Vec<Point3D> {
    self
      .particles
      .read()
      .iter()
      .map(|p| if p.is_tombstone() { TOMBSTONE } else { p.position() })
      .collect()
  }

  /// Arena index of the leaf hosting `id`, if it is placed.
  pub fn particle_leaf(&self, id: ParticleId) -> Result<Option<NodeIndex>, OctreeError> {
    let particles = self.particles.read();
    let slot = particles
      .get(id as usize)
      .ok_or(OctreeError::UnknownParticle(id))?;
    Ok(Some(slot.leaf()).filter(|&leaf| leaf != NO_NODE))
  }

  /// Structural counters taken under one shared tree lock.
  pub fn stats(&self) -> OctreeStats {
    let arena = sync::read(&self.tree);
    OctreeStats {
      particles: self.particles.len(),
      nodes: arena.nodes.len(),
      leaves: arena.leaf_count(),
      max_depth: arena.max_depth(),
      pooled_lists: arena.pool.len(),
      pending_reflow: self.reflow_rx.len(),
    }
  }

  /// Drop every particle and node, keeping a fresh root leaf.
  ///
  /// Payload lists go back to the pool, ids restart at 0 and the reflow
  /// queue is emptied.
  #[tracing::instrument(skip_all, name = "octree::clear")]
  pub fn clear(&self) {
    let mut arena = sync::write(&self.tree);
    let nodes = arena.nodes.len();
    arena.reset(self.bounds);
    self.particles.reset();
    let dropped = self.reflow_rx.try_iter().count();
    tracing::debug!(nodes, dropped_reflow = dropped, "octree cleared");
  }

  /// Walk the whole structure and verify its invariants.
  ///
  /// Takes the exclusive tree lock. Containment of particles in their leaf is
  /// only checked when no reflow is pending.
  pub fn check_invariants(&self) -> Result<(), OctreeError> {
    let mut arena = sync::write(&self.tree);
    let particles = self.particles.read();
    let check_containment = self.reflow_rx.is_empty();
    let fail = |msg: String| Err(OctreeError::InvariantViolation(msg));

    if arena.nodes.is_empty() || arena.nodes[ROOT as usize].geometry.bounds != self.bounds {
      return fail("root node missing or resized".into());
    }

    let mut placed = 0usize;
    let node_count = arena.nodes.len();
    for index in 0..node_count {
      let node = &arena.nodes[index];
      let geometry = node.geometry;
      let children = node.children;

      for (octant, &child) in children.iter().enumerate() {
        if child == NO_NODE {
          continue;
        }
        if child as usize >= node_count {
          return fail(format!("node {index} links missing child {child}"));
        }
        let expected = geometry.create_child(octant as u8);
        if arena.nodes[child as usize].geometry != expected {
          return fail(format!("node {child} is not octant {octant} of node {index}"));
        }
      }

      let Some(payload) = arena.nodes[index].payload.as_mut() else {
        continue;
      };
      if children.iter().any(|&c| c != NO_NODE) {
        return fail(format!("leaf {index} has children"));
      }
      let ids = payload.get_mut();
      if ids.len() > self.config.max_particles_per_leaf && geometry.depth < self.config.max_depth {
        return fail(format!(
          "leaf {index} at depth {} holds {} ids (capacity {})",
          geometry.depth,
          ids.len(),
          self.config.max_particles_per_leaf
        ));
      }
      for (slot, &id) in ids.iter().enumerate() {
        let Some(record) = particles.get(id as usize) else {
          return fail(format!("leaf {index} holds unknown id {id}"));
        };
        if record.leaf() as usize != index || record.slot() as usize != slot {
          return fail(format!(
            "particle {id} records leaf {}/slot {} but sits in leaf {index}/slot {slot}",
            record.leaf(),
            record.slot()
          ));
        }
        if record.is_tombstone() {
          return fail(format!("removed particle {id} still in leaf {index}"));
        }
        if check_containment && !geometry.bounds.contains(record.position()) {
          return fail(format!(
            "particle {id} at {} outside leaf {index} {:?}",
            record.position(),
            geometry.bounds
          ));
        }
      }
      placed += ids.len();
    }

    let recorded = particles.iter().filter(|p| p.leaf() != NO_NODE).count();
    if recorded != placed {
      return fail(format!("{recorded} particles record a leaf but {placed} are placed"));
    }
    Ok(())
  }

  /// Reject positions outside the root box (NaN included).
  #[inline]
  pub(crate) fn check_in_bounds(&self, position: Point3D) -> Result<(), OctreeError> {
    if self.bounds.contains(position) {
      Ok(())
    } else {
      Err(OctreeError::OutOfBounds {
        position,
        bounds: self.bounds,
      })
    }
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
