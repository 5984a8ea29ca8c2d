//! Particle store - dense, append-only records indexed by particle id.
//!
//! Growth (append, reset) takes the store's exclusive lock. Everything else
//! runs under the shared lock. A position is three per-coordinate atomics with
//! X doubling as the tombstone marker, so two updates of the same particle
//! racing each other may leave a snapshot mixing their coordinates.
//!
//! Leaf/slot bookkeeping for a particle only changes while the hosting leaf's
//! spin lock (or the exclusive tree lock) is held.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard};

use super::bounds::Point3D;
use crate::sync;

/// Stable particle identifier. Never reused while the octree lives.
pub type ParticleId = u32;

/// Arena index of a node.
pub type NodeIndex = u32;

/// "No node": absent child, or a particle that is not placed in any leaf.
pub const NO_NODE: NodeIndex = u32::MAX;

/// "No slot": a particle that is not placed in any leaf payload.
pub const NO_SLOT: u32 = u32::MAX;

/// Position written over removed particles.
pub const TOMBSTONE: Point3D = Point3D::NAN;

/// One particle record.
pub(crate) struct ParticleSlot {
  position: [AtomicU32; 3],
  leaf: AtomicU32,
  slot: AtomicU32,
}

impl ParticleSlot {
  fn new(position: Point3D) -> Self {
    Self {
      position: [
        AtomicU32::new(position.x.to_bits()),
        AtomicU32::new(position.y.to_bits()),
        AtomicU32::new(position.z.to_bits()),
      ],
      leaf: AtomicU32::new(NO_NODE),
      slot: AtomicU32::new(NO_SLOT),
    }
  }

  /// Current position. X is loaded first and sequentially consistent; see
  /// [`ParticleSlot::try_store_position`].
  #[inline]
  pub fn coords(&self) -> [f32; 3] {
    let x = self.position[0].load(Ordering::SeqCst);
    [
      f32::from_bits(x),
      f32::from_bits(self.position[1].load(Ordering::Relaxed)),
      f32::from_bits(self.position[2].load(Ordering::Relaxed)),
    ]
  }

  #[inline]
  pub fn position(&self) -> Point3D {
    Point3D::from_array(self.coords())
  }

  /// Overwrite the position unless the particle was removed. Returns `false`
  /// for tombstones.
  ///
  /// The X coordinate is the tombstone marker and is published last with a
  /// CAS, so an update never resurrects a removed particle and a reader that
  /// sees the new X also sees the new Y and Z.
  pub fn try_store_position(&self, position: Point3D) -> bool {
    let x = &self.position[0];
    let mut current = x.load(Ordering::SeqCst);
    if f32::from_bits(current).is_nan() {
      return false;
    }
    self.position[1].store(position.y.to_bits(), Ordering::Relaxed);
    self.position[2].store(position.z.to_bits(), Ordering::Relaxed);
    loop {
      match x.compare_exchange_weak(current, position.x.to_bits(), Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => return true,
        Err(actual) if f32::from_bits(actual).is_nan() => return false,
        Err(actual) => current = actual,
      }
    }
  }

  /// Write [`TOMBSTONE`] over the position. Returns `false` if the particle
  /// was already removed.
  ///
  /// Pairs with the sequentially consistent leaf store in
  /// [`ParticleSlot::place`]: a placement racing a removal either observes the
  /// tombstone or is observed by the remover.
  pub fn tombstone(&self) -> bool {
    let previous = self.position[0].swap(TOMBSTONE.x.to_bits(), Ordering::SeqCst);
    self.position[1].store(TOMBSTONE.y.to_bits(), Ordering::Relaxed);
    self.position[2].store(TOMBSTONE.z.to_bits(), Ordering::Relaxed);
    !f32::from_bits(previous).is_nan()
  }

  /// True once the particle has been removed.
  #[inline]
  pub fn is_tombstone(&self) -> bool {
    f32::from_bits(self.position[0].load(Ordering::SeqCst)).is_nan()
  }

  #[inline]
  pub fn leaf(&self) -> NodeIndex {
    self.leaf.load(Ordering::SeqCst)
  }

  #[inline]
  pub fn slot(&self) -> u32 {
    self.slot.load(Ordering::Acquire)
  }

  /// Record that the particle sits at `slot` of `leaf`'s payload.
  #[inline]
  pub fn place(&self, leaf: NodeIndex, slot: usize) {
    self.slot.store(slot as u32, Ordering::Release);
    self.leaf.store(leaf, Ordering::SeqCst);
  }

  #[inline]
  pub fn set_slot(&self, slot: usize) {
    self.slot.store(slot as u32, Ordering::Release);
  }

  #[inline]
  pub fn unplace(&self) {
    self.leaf.store(NO_NODE, Ordering::SeqCst);
    self.slot.store(NO_SLOT, Ordering::Release);
  }
}

/// Shared view of all particle records.
pub(crate) type ParticleView<'a> = RwLockReadGuard<'a, Vec<ParticleSlot>>;

/// Append-only particle records behind the coarse growth lock.
pub(crate) struct ParticleStore {
  slots: RwLock<Vec<ParticleSlot>>,
}

impl ParticleStore {
  pub fn new() -> Self {
    Self {
      slots: RwLock::new(Vec::new()),
    }
  }

  /// Shared access for reads, in-place position writes and bookkeeping.
  #[inline]
  pub fn read(&self) -> ParticleView<'_> {
    sync::read(&self.slots)
  }

  /// Number of ids issued so far.
  pub fn len(&self) -> usize {
    self.read().len()
  }

  /// Append records for `positions`, returning the reserved id range.
  ///
  /// Returns `None` when the id space would overflow; nothing is appended.
  pub fn reserve(&self, positions: &[Point3D]) -> Option<Range<ParticleId>> {
    let mut slots = sync::write(&self.slots);
    let start = slots.len();
    let end = start.checked_add(positions.len())?;
    if end > NO_SLOT as usize {
      return None;
    }
    slots.reserve(positions.len());
    slots.extend(positions.iter().map(|&p| ParticleSlot::new(p)));
    Some(start as ParticleId..end as ParticleId)
  }

  /// Drop every record; ids restart at 0.
  pub fn reset(&self) {
    sync::write(&self.slots).clear();
  }
}
