use glam::*;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::simd::{Float4, Mask4};
use crate::RayPacket4;

/// Axis aligned bounding box.
///
/// Either `min <= max` on every axis, or the box is in the canonical empty
/// state produced by [`Aabb::clear`] (`min = +inf`, `max = -inf`).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

pub trait Bounds {
    fn bounds(&self) -> Aabb;
}

impl Display for Aabb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(min: ({}, {}, {}),  max: ({}, {}, {}))",
            self.min[0], self.min[1], self.min[2], self.max[0], self.max[1], self.max[2],
        )
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

impl Aabb {
    /// An empty box.
    pub fn new() -> Aabb {
        Aabb {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    pub fn from_points(min: Vec3, max: Vec3) -> Aabb {
        Aabb {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    /// Grows the box to contain `pos`.
    pub fn grow(&mut self, pos: Vec3) {
        let (min, max) = self.points();
        self.min = min.min(pos).into();
        self.max = max.max(pos).into();
    }

    /// Grows the box to contain `aabb`.
    pub fn grow_bb(&mut self, aabb: &Aabb) {
        let (min, max) = self.points();
        let (b_min, b_max) = aabb.points();
        self.min = min.min(b_min).into();
        self.max = max.max(b_max).into();
    }

    pub fn union_of(&self, bb: &Self) -> Self {
        let mut result = *self;
        result.grow_bb(bb);
        result
    }

    /// Shrinks the box to its intersection with `bb`.
    ///
    /// Collapses to the canonical empty box when the intersection is empty on
    /// any of the three axes.
    pub fn join(&mut self, bb: &Aabb) {
        let (min, max) = self.points();
        let (b_min, b_max) = bb.points();
        self.min = min.max(b_min).into();
        self.max = max.min(b_max).into();

        if self.is_empty() {
            self.clear();
        }
    }

    pub fn intersection(&self, bb: &Self) -> Self {
        let mut result = *self;
        result.join(bb);
        result
    }

    /// Closed-interval overlap test; boxes sharing only a face overlap.
    pub fn overlaps(&self, b: &Aabb) -> bool {
        (0..3).all(|axis| self.max[axis] >= b.min[axis] && b.max[axis] >= self.min[axis])
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let point: [f32; 3] = point.into();
        (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }

    pub fn contains_box(&self, b: &Aabb) -> bool {
        (0..3).all(|axis| self.min[axis] <= b.min[axis] && b.max[axis] <= self.max[axis])
    }

    /// Surface area of the box, `0` for an empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        let e = self.lengths();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Double precision variant of [`Aabb::surface_area`] for diagnostics that
    /// compare areas of nearly degenerate boxes.
    pub fn surface_area_precise(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }

        let e = [
            self.max[0] as f64 - self.min[0] as f64,
            self.max[1] as f64 - self.min[1] as f64,
            self.max[2] as f64 - self.min[2] as f64,
        ];
        2.0 * (e[0] * e[1] + e[1] * e[2] + e[2] * e[0])
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.points();
        (min + max) * 0.5
    }

    pub fn lengths(&self) -> Vec3 {
        Vec3::from(self.max) - Vec3::from(self.min)
    }

    pub fn extent(&self, axis: usize) -> f32 {
        self.max[axis] - self.min[axis]
    }

    pub fn longest_axis(&self) -> usize {
        let mut a: usize = 0;
        if self.extent(1) > self.extent(0) {
            a = 1;
        }
        if self.extent(2) > self.extent(a) {
            a = 2
        }
        a
    }

    /// Per-lane entry and exit distances of `packet` through the box.
    ///
    /// A lane misses the box when its returned `t_near > t_far`.
    pub fn clip(&self, packet: &RayPacket4) -> (Float4, Float4) {
        self.clip_interval(
            packet,
            &packet.reverse_mask(),
            Float4::splat(f32::NEG_INFINITY),
            Float4::splat(f32::INFINITY),
        )
    }

    /// Narrows the per-lane interval `[t_near, t_far]` to the part inside the box.
    ///
    /// `reverse` holds, per axis, the lanes with a negative reciprocal
    /// direction. Lanes whose slab distance is NaN (origin on a slab plane of
    /// an axis the ray is parallel to) keep their interval for that axis.
    #[inline(always)]
    pub fn clip_interval(
        &self,
        packet: &RayPacket4,
        reverse: &[Mask4; 3],
        mut t_near: Float4,
        mut t_far: Float4,
    ) -> (Float4, Float4) {
        let origin = packet.origin();
        let inv_dir = packet.inv_direction();

        for axis in 0..3 {
            let org = origin.axis(axis);
            let inv = inv_dir.axis(axis);

            let t_min = (Float4::splat(self.min[axis]) - org) * inv;
            let t_max = (Float4::splat(self.max[axis]) - org) * inv;

            let axis_near = Float4::select(reverse[axis], t_max, t_min);
            let axis_far = Float4::select(reverse[axis], t_min, t_max);

            t_near = Float4::select(axis_near.cmpgt(t_near), axis_near, t_near);
            t_far = Float4::select(axis_far.cmplt(t_far), axis_far, t_far);
        }

        (t_near, t_far)
    }

    pub fn points(&self) -> (Vec3, Vec3) {
        (self.min.into(), self.max.into())
    }
}

impl From<(Vec3, Vec3)> for Aabb {
    fn from(v: (Vec3, Vec3)) -> Self {
        Aabb::from_points(v.0, v.1)
    }
}

impl Into<(Vec3, Vec3)> for Aabb {
    fn into(self) -> (Vec3, Vec3) {
        self.points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::LaneMask;

    fn unit_box() -> Aabb {
        Aabb::from_points(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn clear_is_canonical_empty() {
        let mut aabb = unit_box();
        aabb.clear();

        assert_eq!(aabb.min, [f32::INFINITY; 3]);
        assert_eq!(aabb.max, [f32::NEG_INFINITY; 3]);
        assert!(aabb.is_empty());
        assert_eq!(aabb.surface_area(), 0.0);
    }

    #[test]
    fn grow_single_point() {
        let p = Vec3::new(1.0, -2.0, 3.5);
        let mut aabb = Aabb::new();
        aabb.grow(p);

        assert_eq!(aabb.min, <[f32; 3]>::from(p));
        assert_eq!(aabb.max, <[f32; 3]>::from(p));
        assert!(!aabb.is_empty());
    }

    #[test]
    fn grow_two_boxes_is_smallest_enclosing() {
        let a = Aabb::from_points(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 1.0));
        let b = Aabb::from_points(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(0.5, 1.0, 4.0));

        let mut aabb = Aabb::new();
        aabb.grow_bb(&a);
        aabb.grow_bb(&b);

        assert_eq!(aabb.min, [-1.0, 0.0, 0.0]);
        assert_eq!(aabb.max, [1.0, 2.0, 4.0]);
        assert!(aabb.contains_box(&a));
        assert!(aabb.contains_box(&b));
        assert_eq!(a.union_of(&b), aabb);
    }

    #[test]
    fn join_overlapping() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::splat(2.0));
        let b = Aabb::from_points(Vec3::ONE, Vec3::splat(3.0));

        let joined = a.intersection(&b);
        assert_eq!(joined, Aabb::from_points(Vec3::ONE, Vec3::splat(2.0)));
    }

    #[test]
    fn join_disjoint_is_empty() {
        let a = unit_box();
        let b = Aabb::from_points(Vec3::splat(2.0), Vec3::splat(3.0));

        assert_eq!(a.intersection(&b), Aabb::new());
    }

    #[test]
    fn join_disjoint_only_along_z_is_empty() {
        let a = unit_box();
        let b = Aabb::from_points(Vec3::new(0.0, 0.0, 2.0), Vec3::new(1.0, 1.0, 3.0));

        assert!(!a.overlaps(&b));
        assert_eq!(a.intersection(&b), Aabb::new());
    }

    #[test]
    fn overlaps_and_contains() {
        let a = unit_box();
        let touching = Aabb::from_points(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let apart = Aabb::from_points(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

        assert!(a.overlaps(&touching));
        assert!(!a.overlaps(&apart));

        assert!(a.contains(Vec3::splat(0.5)));
        assert!(a.contains(Vec3::ONE));
        assert!(!a.contains(Vec3::new(0.5, 1.5, 0.5)));
        assert!(!a.contains_box(&touching));
    }

    #[test]
    fn surface_area_and_axes() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(aabb.surface_area(), 22.0);
        assert_eq!(aabb.surface_area_precise(), 22.0);
        assert_eq!(aabb.longest_axis(), 2);
        assert_eq!(aabb.center(), Vec3::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn clip_hit_and_miss() {
        let aabb = unit_box();
        let packet = RayPacket4::new(
            [
                Vec3::new(-5.0, 0.5, 0.5),
                Vec3::new(-5.0, 5.0, 5.0),
                Vec3::new(6.0, 0.5, 0.5),
                Vec3::new(0.5, 0.5, 0.5),
            ],
            [
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            100.0,
        );

        let (t_near, t_far) = aabb.clip(&packet);
        let miss = t_near.cmpgt(t_far);

        assert!(!miss.lane(0));
        assert!((t_near[0] - 5.0).abs() < 1e-6);
        assert!((t_far[0] - 6.0).abs() < 1e-6);

        assert!(miss.lane(1));

        assert!(!miss.lane(2));
        assert!((t_near[2] - 5.0).abs() < 1e-6);
        assert!((t_far[2] - 6.0).abs() < 1e-6);

        // origin inside: entry lies behind the origin
        assert!(!miss.lane(3));
        assert!((t_near[3] + 0.5).abs() < 1e-6);
        assert!((t_far[3] - 0.5).abs() < 1e-6);
    }
}
