//! OctreeNode - immutable geometry record for one arena slot.
//!
//! The box of a child is always produced by [`OctreeNode::create_child`], so
//! geometry is fully determined by ancestry.

use super::bounds::{Aabb3, Point3D};

/// Location code of the root node (a single sentinel bit).
pub const ROOT_CODE: u128 = 1;

/// Deepest level for which location codes stay unique in a `u128`.
pub const MAX_CODE_DEPTH: u32 = 42;

/// Octree node geometry - immutable value type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctreeNode {
  /// World-space box covered by this node.
  pub bounds: Aabb3,
  /// Distance from the root (root = 0).
  pub depth: u32,
  /// Octant of this node within its parent (root = 0).
  pub octant: u8,
  /// Location code: a leading 1 bit followed by 3 bits per level.
  ///
  /// Only a debug label, nothing routes by it.
  pub code: u128,
}

impl OctreeNode {
  /// Geometry record for the root node.
  pub fn root(bounds: Aabb3) -> Self {
    Self {
      bounds,
      depth: 0,
      octant: 0,
      code: ROOT_CODE,
    }
  }

  /// Get child geometry (finer: depth + 1).
  ///
  /// Octant: 0-7 where bits represent +X, +Y, +Z halves:
  /// - bit 0: X >= center
  /// - bit 1: Y >= center
  /// - bit 2: Z >= center
  pub fn create_child(&self, octant: u8) -> Self {
    debug_assert!(octant < 8, "octant must be 0..8");
    Self {
      bounds: self.bounds.octant(octant),
      depth: self.depth + 1,
      octant,
      code: (self.code << 3) | octant as u128,
    }
  }

  /// Octant of this node that `point` routes to.
  #[inline]
  pub fn octant_of(&self, point: Point3D) -> u8 {
    self.bounds.octant_of(point)
  }

  /// Octant path from the root, outermost first.
  pub fn path(&self) -> Vec<u8> {
    (0..self.depth)
      .rev()
      .map(|level| ((self.code >> (3 * level)) & 0b111) as u8)
      .collect()
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
