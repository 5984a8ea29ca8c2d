//! Radius scan over a leaf payload using portable SIMD.
//!
//! Ids are processed in blocks of [`LANES`]: positions are gathered into
//! X/Y/Z lanes, squared distances computed in parallel and compared against
//! the squared radius. A scalar loop handles the tail. Tombstoned particles
//! (NaN positions) fail every comparison and are never returned.

use std::simd::{cmp::SimdPartialOrd, f32x8};

use glam::Vec3;

use crate::octree::ParticleId;

/// Data-parallel width of the scan.
pub const LANES: usize = 8;

/// Append every id in `ids` whose position lies within `radius` of `center`.
///
/// `position_of` resolves an id to its `[x, y, z]` position. Output order
/// follows `ids`.
#[inline]
pub fn scan_radius<P>(ids: &[ParticleId], position_of: P, center: Vec3, radius: f32, out: &mut Vec<ParticleId>)
where
  P: Fn(ParticleId) -> [f32; 3],
{
  let radius_sq = radius * radius;
  let cx = f32x8::splat(center.x);
  let cy = f32x8::splat(center.y);
  let cz = f32x8::splat(center.z);
  let r2 = f32x8::splat(radius_sq);

  let blocks = ids.chunks_exact(LANES);
  let tail = blocks.remainder();

  for block in blocks {
    let mut xs = [0.0f32; LANES];
    let mut ys = [0.0f32; LANES];
    let mut zs = [0.0f32; LANES];
    for (lane, &id) in block.iter().enumerate() {
      let [x, y, z] = position_of(id);
      xs[lane] = x;
      ys[lane] = y;
      zs[lane] = z;
    }

    let dx = f32x8::from_array(xs) - cx;
    let dy = f32x8::from_array(ys) - cy;
    let dz = f32x8::from_array(zs) - cz;
    let d2 = dx * dx + dy * dy + dz * dz;

    let mut mask = d2.simd_le(r2).to_bitmask();
    while mask != 0 {
      let lane = mask.trailing_zeros() as usize;
      out.push(block[lane]);
      mask &= mask - 1;
    }
  }

  for &id in tail {
    if within(position_of(id), center, radius_sq) {
      out.push(id);
    }
  }
}

/// Reference scan without SIMD. Same results as [`scan_radius`].
pub fn scan_radius_scalar<P>(ids: &[ParticleId], position_of: P, center: Vec3, radius: f32, out: &mut Vec<ParticleId>)
where
  P: Fn(ParticleId) -> [f32; 3],
{
  let radius_sq = radius * radius;
  out.extend(ids.iter().copied().filter(|&id| within(position_of(id), center, radius_sq)));
}

#[inline(always)]
fn within([x, y, z]: [f32; 3], center: Vec3, radius_sq: f32) -> bool {
  let dx = x - center.x;
  let dy = y - center.y;
  let dz = z - center.z;
  dx * dx + dy * dy + dz * dz <= radius_sq
}

#[cfg(test)]
#[path = "simd_search_test.rs"]
mod simd_search_test;
