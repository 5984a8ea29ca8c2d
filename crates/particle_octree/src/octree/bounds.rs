//! Axis-aligned bounding box and point type used by the particle octree.

use glam::Vec3;

/// A particle position in world space.
pub type Point3D = Vec3;

/// Axis-aligned bounding box.
///
/// Stored as min/max corners so that octant boxes are derived from exact
/// min/center/max values. A point routed to octant `k` by [`Aabb3::octant_of`]
/// is always contained by [`Aabb3::octant`]`(k)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
	/// Minimum corner (inclusive).
	pub min: Vec3,
	/// Maximum corner (inclusive).
	pub max: Vec3,
}

impl Aabb3 {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: Vec3, max: Vec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Create a new AABB from its center and full size.
	pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
		let half = size * 0.5;
		Self {
			min: center - half,
			max: center + half,
		}
	}

	/// True when both corners are finite and ordered on every axis.
	pub fn is_valid(&self) -> bool {
		self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
	}

	/// Check if this AABB overlaps with another.
	///
	/// Two AABBs overlap if they share any interior or boundary points.
	#[inline]
	pub fn intersects(&self, other: &Aabb3) -> bool {
		self.min.x <= other.max.x
			&& self.max.x >= other.min.x
			&& self.min.y <= other.max.y
			&& self.max.y >= other.min.y
			&& self.min.z <= other.max.z
			&& self.max.z >= other.min.z
	}

	/// Check if this AABB contains a point (closed interval on every axis).
	///
	/// NaN coordinates are never contained.
	#[inline]
	pub fn contains(&self, point: Vec3) -> bool {
		point.x >= self.min.x
			&& point.x <= self.max.x
			&& point.y >= self.min.y
			&& point.y <= self.max.y
			&& point.z >= self.min.z
			&& point.z <= self.max.z
	}

	/// Smallest AABB enclosing both boxes.
	#[inline]
	pub fn union(&self, other: &Aabb3) -> Aabb3 {
		Self {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> Vec3 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> Vec3 {
		(self.min + self.max) * 0.5
	}

	/// Squared distance from `point` to the closest point of the box.
	///
	/// Zero when the point is inside.
	#[inline]
	pub fn distance_squared_to(&self, point: Vec3) -> f32 {
		let d = (self.min - point).max(Vec3::ZERO).max(point - self.max);
		d.length_squared()
	}

	/// Octant code for `point` relative to the box center.
	///
	/// Bit 0: X >= center.x, bit 1: Y >= center.y, bit 2: Z >= center.z.
	#[inline]
	pub fn octant_of(&self, point: Vec3) -> u8 {
		let c = self.center();
		(point.x >= c.x) as u8 | ((point.y >= c.y) as u8) << 1 | ((point.z >= c.z) as u8) << 2
	}

	/// The `octant`-th sub-box, using the same bit layout as [`Aabb3::octant_of`].
	#[inline]
	pub fn octant(&self, octant: u8) -> Aabb3 {
		debug_assert!(octant < 8, "octant must be 0..8");
		let c = self.center();
		let pick = |bit: u8, lo: f32, mid: f32, hi: f32| {
			if octant & bit != 0 {
				(mid, hi)
			} else {
				(lo, mid)
			}
		};
		let (min_x, max_x) = pick(1, self.min.x, c.x, self.max.x);
		let (min_y, max_y) = pick(2, self.min.y, c.y, self.max.y);
		let (min_z, max_z) = pick(4, self.min.z, c.z, self.max.z);
		Self {
			min: Vec3::new(min_x, min_y, min_z),
			max: Vec3::new(max_x, max_y, max_z),
		}
	}

	/// All 8 octants, indexed by octant code.
	pub fn split(&self) -> [Aabb3; 8] {
		std::array::from_fn(|k| self.octant(k as u8))
	}
}
