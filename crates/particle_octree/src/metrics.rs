//! Octree activity counters.
//!
//! Compiled in with the `metrics` feature and switchable at runtime through
//! [`COLLECT_METRICS`]. Without the feature every recorder is an empty inline
//! function and the getters report zero.
//!
//! ```ignore
//! // cargo build --features metrics
//! COLLECT_METRICS.store(false, Ordering::Relaxed); // pause collection
//!
//! octree.process_particle_reflow();
//! println!("{} splits, reflow avg {:.1}us",
//!     octree.metrics().splits(),
//!     octree.metrics().avg_reflow_timing_us());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Runtime switch, only consulted when the `metrics` feature is on.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Number of reflow drains kept by [`ReflowTimings`].
pub const REFLOW_TIMING_SAMPLES: usize = 128;

/// Whether recorders should do any work right now.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Durations of the most recent reflow drains, in microseconds.
#[derive(Debug, Clone)]
pub struct ReflowTimings {
  samples: VecDeque<u64>,
  limit: usize,
}

impl ReflowTimings {
  pub fn with_limit(limit: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(limit),
      limit,
    }
  }

  /// Add a sample, dropping the oldest once `limit` is reached.
  pub fn record(&mut self, micros: u64) {
    if self.limit == 0 {
      return;
    }
    while self.samples.len() >= self.limit {
      self.samples.pop_front();
    }
    self.samples.push_back(micros);
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  /// Samples, oldest first.
  pub fn samples(&self) -> impl Iterator<Item = u64> + '_ {
    self.samples.iter().copied()
  }

  pub fn latest(&self) -> Option<u64> {
    self.samples.back().copied()
  }

  /// Mean in microseconds; zero when empty.
  pub fn mean(&self) -> f64 {
    match self.samples.len() {
      0 => 0.0,
      n => self.samples.iter().sum::<u64>() as f64 / n as f64,
    }
  }

  /// Fastest and slowest drain.
  pub fn range(&self) -> Option<(u64, u64)> {
    let fastest = self.samples.iter().min()?;
    let slowest = self.samples.iter().max()?;
    Some((*fastest, *slowest))
  }
}

impl Default for ReflowTimings {
  fn default() -> Self {
    Self::with_limit(REFLOW_TIMING_SAMPLES)
  }
}

/// Counters shared by every thread using one octree.
#[derive(Debug, Default)]
pub struct OctreeMetrics {
  splits: AtomicU64,
  nodes_created: AtomicU64,
  bulk_builds: AtomicU64,
  reflowed: AtomicU64,
  queries: AtomicU64,
  reflow_timings: Mutex<ReflowTimings>,
}

impl OctreeMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn record_split(&self, children_created: usize) {
    if is_enabled() {
      self.splits.fetch_add(1, Ordering::Relaxed);
      self.nodes_created.fetch_add(children_created as u64, Ordering::Relaxed);
    }
  }

  #[inline]
  pub(crate) fn record_nodes_created(&self, count: usize) {
    if is_enabled() && count > 0 {
      self.nodes_created.fetch_add(count as u64, Ordering::Relaxed);
    }
  }

  #[inline]
  pub(crate) fn record_bulk_build(&self) {
    if is_enabled() {
      self.bulk_builds.fetch_add(1, Ordering::Relaxed);
    }
  }

  #[inline]
  pub(crate) fn record_query(&self) {
    if is_enabled() {
      self.queries.fetch_add(1, Ordering::Relaxed);
    }
  }

  pub(crate) fn record_reflow(&self, relocated: usize, micros: u64) {
    if !is_enabled() {
      return;
    }
    self.reflowed.fetch_add(relocated as u64, Ordering::Relaxed);
    self.timings().record(micros);
  }

  fn timings(&self) -> std::sync::MutexGuard<'_, ReflowTimings> {
    self.reflow_timings.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Leaf splits performed by single-particle insertion.
  pub fn splits(&self) -> u64 {
    self.splits.load(Ordering::Relaxed)
  }

  /// Nodes created, root excluded.
  pub fn nodes_created(&self) -> u64 {
    self.nodes_created.load(Ordering::Relaxed)
  }

  pub fn bulk_builds(&self) -> u64 {
    self.bulk_builds.load(Ordering::Relaxed)
  }

  /// Particles relocated by reflow drains.
  pub fn reflowed(&self) -> u64 {
    self.reflowed.load(Ordering::Relaxed)
  }

  pub fn queries(&self) -> u64 {
    self.queries.load(Ordering::Relaxed)
  }

  pub fn avg_reflow_timing_us(&self) -> f64 {
    self.timings().mean()
  }

  /// Copy of the recent reflow drain timings.
  pub fn reflow_timings(&self) -> ReflowTimings {
    self.timings().clone()
  }

  pub fn reset(&self) {
    for counter in [
      &self.splits,
      &self.nodes_created,
      &self.bulk_builds,
      &self.reflowed,
      &self.queries,
    ] {
      counter.store(0, Ordering::Relaxed);
    }
    *self.timings() = ReflowTimings::default();
  }
}
