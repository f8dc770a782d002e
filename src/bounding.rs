//! Axis-aligned bounding boxes with the box/box and box/plane tests the
//! spatial octree relies on.

use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub mins: Point3<Real>,
    pub maxs: Point3<Real>,
}

impl Aabb {
    #[inline]
    pub const fn new(mins: Point3<Real>, maxs: Point3<Real>) -> Self {
        Self { mins, maxs }
    }

    /// Build the tightest box spanning `points`, or `None` for an empty slice.
    pub fn from_points(points: &[Point3<Real>]) -> Option<Self> {
        let first = points.first()?;
        let mut mins = *first;
        let mut maxs = *first;
        for p in &points[1..] {
            mins.x = mins.x.min(p.x);
            mins.y = mins.y.min(p.y);
            mins.z = mins.z.min(p.z);
            maxs.x = maxs.x.max(p.x);
            maxs.y = maxs.y.max(p.y);
            maxs.z = maxs.z.max(p.z);
        }
        Some(Self { mins, maxs })
    }

    #[inline]
    pub fn center(&self) -> Point3<Real> {
        Point3::new(
            (self.mins.x + self.maxs.x) * 0.5,
            (self.mins.y + self.maxs.y) * 0.5,
            (self.mins.z + self.maxs.z) * 0.5,
        )
    }

    #[inline]
    pub fn size(&self) -> Vector3<Real> {
        self.maxs - self.mins
    }

    /// Shortest edge of the box.
    #[inline]
    pub fn min_extent(&self) -> Real {
        let s = self.size();
        s.x.min(s.y).min(s.z)
    }

    /// Longest edge of the box.
    #[inline]
    pub fn max_extent(&self) -> Real {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    /// Expand to a cube anchored at the min corner, side = longest edge.
    /// Welding uses this to avoid skewed octree cells.
    #[inline]
    pub fn grow_to_cube(&self) -> Self {
        let side = self.max_extent();
        Self {
            mins: self.mins,
            maxs: self.mins + Vector3::new(side, side, side),
        }
    }

    /// Inclusive box/box overlap test.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.maxs.x >= other.mins.x
            && self.mins.x <= other.maxs.x
            && self.maxs.y >= other.mins.y
            && self.mins.y <= other.maxs.y
            && self.maxs.z >= other.mins.z
            && self.mins.z <= other.maxs.z
    }

    /// Does the plane `normal · p = w` pass through this box?
    ///
    /// Tests the signed distances of the 8 corners; the plane intersects when
    /// corners lie on both sides (or touch it exactly).
    pub fn intersects_plane(&self, normal: &Vector3<Real>, w: Real) -> bool {
        let mut has_front = false;
        let mut has_back = false;
        for corner in self.corners() {
            let d = normal.dot(&corner.coords) - w;
            if d >= 0.0 {
                has_front = true;
            }
            if d <= 0.0 {
                has_back = true;
            }
            if has_front && has_back {
                return true;
            }
        }
        false
    }

    #[inline]
    pub fn contains_point(&self, p: &Point3<Real>) -> bool {
        p.x >= self.mins.x
            && p.x <= self.maxs.x
            && p.y >= self.mins.y
            && p.y <= self.maxs.y
            && p.z >= self.mins.z
            && p.z <= self.maxs.z
    }

    /// The 8 corner points.
    pub fn corners(&self) -> [Point3<Real>; 8] {
        let (a, b) = (self.mins, self.maxs);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// The `i`-th of the 8 equal midplane octants.
    ///
    /// Canonical child order: bit 0 selects the +x half, bit 1 the +y half,
    /// bit 2 the +z half, so octant 0 is the (min,min,min) corner and
    /// octant 7 the (max,max,max) corner.
    pub fn octant(&self, i: usize) -> Self {
        debug_assert!(i < 8);
        let c = self.center();
        let mins = Point3::new(
            if i & 1 == 0 { self.mins.x } else { c.x },
            if i & 2 == 0 { self.mins.y } else { c.y },
            if i & 4 == 0 { self.mins.z } else { c.z },
        );
        let maxs = Point3::new(
            if i & 1 == 0 { c.x } else { self.maxs.x },
            if i & 2 == 0 { c.y } else { self.maxs.y },
            if i & 4 == 0 { c.z } else { self.maxs.z },
        );
        Self { mins, maxs }
    }
}
