//! Node arena and payload list pool.
//!
//! Nodes live in an append-only `Vec` addressed by [`NodeIndex`]; node 0 is
//! the permanent root. A node is a leaf while it owns a payload list and
//! internal once the list is gone. That transition only happens through
//! `&mut Arena`, i.e. under the exclusive tree lock, so under the shared lock
//! a node's kind is stable and only a leaf's list contents can change (behind
//! its spin lock).

use super::bounds::Aabb3;
use super::node::OctreeNode;
use super::particles::{NodeIndex, ParticleId, NO_NODE};
use crate::sync::SpinLock;

/// Arena index of the root node.
pub const ROOT: NodeIndex = 0;

/// Maximum number of idle lists the pool keeps.
pub const LIST_POOL_CAPACITY: usize = 4096;

/// One arena slot.
pub(crate) struct NodeRecord {
  pub geometry: OctreeNode,
  pub children: [NodeIndex; 8],
  /// `Some` for leaves, `None` for internal nodes.
  pub payload: Option<SpinLock<Vec<ParticleId>>>,
}

impl NodeRecord {
  fn leaf(geometry: OctreeNode, list: Vec<ParticleId>) -> Self {
    Self {
      geometry,
      children: [NO_NODE; 8],
      payload: Some(SpinLock::new(list)),
    }
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.payload.is_some()
  }

  /// Existing children, in octant order.
  #[inline]
  pub fn child_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
    self.children.iter().copied().filter(|&c| c != NO_NODE)
  }
}

/// Bounded pool of recycled payload lists.
pub(crate) struct ListPool {
  free: Vec<Vec<ParticleId>>,
  capacity: usize,
}

impl ListPool {
  pub fn new(capacity: usize) -> Self {
    Self {
      free: Vec::new(),
      capacity,
    }
  }

  /// An empty list, recycled when one is available.
  #[inline]
  pub fn take(&mut self) -> Vec<ParticleId> {
    self.free.pop().unwrap_or_default()
  }

  /// Return a list. It is cleared; beyond capacity it is dropped.
  #[inline]
  pub fn give(&mut self, mut list: Vec<ParticleId>) {
    if self.free.len() < self.capacity {
      list.clear();
      self.free.push(list);
    }
  }

  pub fn len(&self) -> usize {
    self.free.len()
  }
}

/// Node records plus the pool their payload lists come from.
pub(crate) struct Arena {
  pub nodes: Vec<NodeRecord>,
  pub pool: ListPool,
  /// Bumped by every reset so in-flight work can detect a `clear`.
  pub epoch: u64,
}

impl Arena {
  pub fn new(bounds: Aabb3) -> Self {
    let mut pool = ListPool::new(LIST_POOL_CAPACITY);
    let root = NodeRecord::leaf(OctreeNode::root(bounds), pool.take());
    Self {
      nodes: vec![root],
      pool,
      epoch: 0,
    }
  }

  #[inline]
  pub fn node(&self, index: NodeIndex) -> &NodeRecord {
    &self.nodes[index as usize]
  }

  #[inline]
  pub fn node_mut(&mut self, index: NodeIndex) -> &mut NodeRecord {
    &mut self.nodes[index as usize]
  }

  /// Child of `parent` at `octant`, creating an empty leaf if absent.
  pub fn child_or_create(&mut self, parent: NodeIndex, octant: u8) -> NodeIndex {
    let existing = self.node(parent).children[octant as usize];
    if existing != NO_NODE {
      return existing;
    }
    let geometry = self.node(parent).geometry.create_child(octant);
    let index = self.nodes.len() as NodeIndex;
    debug_assert!(index != NO_NODE, "node arena exhausted");
    let list = self.pool.take();
    self.nodes.push(NodeRecord::leaf(geometry, list));
    self.node_mut(parent).children[octant as usize] = index;
    index
  }

  /// Turn leaf `index` into an internal node and hand its former payload
  /// to `drain`. The list goes back to the pool afterwards.
  ///
  /// Returns `None` without calling `drain` if the node is already internal.
  pub fn convert_to_internal<R>(
    &mut self,
    index: NodeIndex,
    drain: impl FnOnce(&mut Self, &[ParticleId]) -> R,
  ) -> Option<R> {
    let list = self.node_mut(index).payload.take()?.into_inner();
    let result = drain(self, &list);
    self.pool.give(list);
    Some(result)
  }

  /// Return every payload list to the pool and keep only a fresh root.
  pub fn reset(&mut self, bounds: Aabb3) {
    for node in self.nodes.drain(..) {
      if let Some(payload) = node.payload {
        self.pool.give(payload.into_inner());
      }
    }
    let root = NodeRecord::leaf(OctreeNode::root(bounds), self.pool.take());
    self.nodes.push(root);
    self.epoch += 1;
  }

  pub fn leaf_count(&self) -> usize {
    self.nodes.iter().filter(|n| n.is_leaf()).count()
  }

  pub fn max_depth(&self) -> u32 {
    self.nodes.iter().map(|n| n.geometry.depth).max().unwrap_or(0)
  }
}
