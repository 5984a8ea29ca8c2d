//! Removal, in-place updates and deferred reflow.

use rayon::prelude::*;
use web_time::Instant;

use super::arena::Arena;
use super::bounds::Point3D;
use super::index::Octree;
use super::particles::{ParticleId, NO_NODE};
use crate::error::OctreeError;
use crate::sync;

impl Octree {
  /// Move a particle.
  ///
  /// The position is written immediately. If it left its leaf, the particle
  /// is queued and only relocated by [`Octree::process_particle_reflow`];
  /// until then queries find it at its old leaf. Updating a removed particle
  /// does nothing.
  pub fn update_particle(&self, id: ParticleId, position: Point3D) -> Result<(), OctreeError> {
    self.check_in_bounds(position)?;

    let arena = sync::read(&self.tree);
    let particles = self.particles.read();
    let record = particles
      .get(id as usize)
      .ok_or(OctreeError::UnknownParticle(id))?;
    if !record.try_store_position(position) {
      return Ok(());
    }

    let leaf = record.leaf();
    if leaf == NO_NODE || !arena.node(leaf).geometry.bounds.contains(position) {
      let _ = self.reflow_tx.send(id);
    }
    Ok(())
  }

  /// Apply many updates in parallel.
  ///
  /// Every valid update is applied; the first failure in input order is
  /// returned.
  pub fn update_particles(&self, updates: &[(ParticleId, Point3D)]) -> Result<(), OctreeError> {
    let results: Vec<Result<(), OctreeError>> = updates
      .par_iter()
      .map(|&(id, position)| self.update_particle(id, position))
      .collect();
    results.into_iter().collect()
  }

  /// Remove a particle. Its id is never reissued and its position becomes
  /// NaN. Removing twice is a no-op.
  pub fn remove_particle(&self, id: ParticleId) -> Result<(), OctreeError> {
    let arena = sync::read(&self.tree);
    {
      let particles = self.particles.read();
      let record = particles
        .get(id as usize)
        .ok_or(OctreeError::UnknownParticle(id))?;
      if !record.tombstone() {
        return Ok(());
      }
    }
    self.detach(&arena, id);
    tracing::trace!(id, "particle removed");
    Ok(())
  }

  /// Relocate every particle queued by updates. Returns how many moved.
  ///
  /// Call once per tick. Ids are deduplicated; removed particles and those
  /// already back inside their leaf are skipped.
  #[tracing::instrument(skip_all, name = "octree::reflow")]
  pub fn process_particle_reflow(&self) -> usize {
    let start = Instant::now();
    let (epoch, mut ids) = {
      let arena = sync::read(&self.tree);
      (arena.epoch, self.reflow_rx.try_iter().collect::<Vec<_>>())
    };
    if ids.is_empty() {
      return 0;
    }
    ids.sort_unstable();
    ids.dedup();

    let mut relocated = 0;
    for &id in &ids {
      {
        let arena = sync::read(&self.tree);
        if arena.epoch != epoch {
          tracing::debug!("octree cleared during reflow");
          break;
        }
        let (leaf, position) = {
          let particles = self.particles.read();
          let record = &particles[id as usize];
          if record.is_tombstone() {
            continue;
          }
          (record.leaf(), record.position())
        };
        // Unplaced particles belong to whoever is routing them.
        if leaf == NO_NODE || arena.node(leaf).geometry.bounds.contains(position) {
          continue;
        }
        if !self.detach(&arena, id) {
          continue;
        }
      }
      self.route(id, epoch);
      relocated += 1;
    }

    let elapsed_us = start.elapsed().as_micros() as u64;
    self.metrics.record_reflow(relocated, elapsed_us);
    tracing::debug!(queued = ids.len(), relocated, elapsed_us, "reflow drained");
    relocated
  }

  /// Swap-remove `id` from its leaf under that leaf's spin lock.
  ///
  /// Returns `true` if this call took it out; the caller then owns its
  /// placement. Runs under the shared tree lock held by the caller.
  pub(crate) fn detach(&self, arena: &Arena, id: ParticleId) -> bool {
    loop {
      let leaf = self.particles.read()[id as usize].leaf();
      if leaf == NO_NODE {
        return false;
      }
      let Some(payload) = arena.node(leaf).payload.as_ref() else {
        debug_assert!(false, "particle {id} recorded in internal node {leaf}");
        return false;
      };

      let mut list = payload.lock();
      let particles = self.particles.read();
      let record = &particles[id as usize];
      if record.leaf() != leaf {
        // Moved between the lookup and the lock.
        continue;
      }
      let slot = record.slot() as usize;
      debug_assert_eq!(list.get(slot), Some(&id));
      list.swap_remove(slot);
      if let Some(&moved) = list.get(slot) {
        particles[moved as usize].set_slot(slot);
      }
      record.unplace();
      return true;
    }
  }
}

#[cfg(test)]
#[path = "mutate_test.rs"]
mod mutate_test;
