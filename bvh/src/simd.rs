use glam::*;
use std::ops::{Add, Mul, Sub};

/// Four independent `f32` lanes, one per ray of a packet.
pub type Float4 = Vec4;

/// Per-lane boolean result of comparing two [`Float4`] values.
pub type Mask4 = BVec4A;

/// Horizontal reductions over a lane mask.
pub trait LaneMask: Copy {
    fn all_true(self) -> bool;
    fn all_false(self) -> bool;
    fn lane(self, lane: usize) -> bool;
    fn count(self) -> u32;
}

impl LaneMask for Mask4 {
    #[inline(always)]
    fn all_true(self) -> bool {
        self.bitmask() == 0b1111
    }

    #[inline(always)]
    fn all_false(self) -> bool {
        self.bitmask() == 0
    }

    #[inline(always)]
    fn lane(self, lane: usize) -> bool {
        debug_assert!(lane < 4, "lane {} out of range", lane);
        (self.bitmask() >> lane) & 1 == 1
    }

    #[inline(always)]
    fn count(self) -> u32 {
        self.bitmask().count_ones()
    }
}

/// Three-component vector with four lanes per component (structure of arrays).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3x4 {
    pub x: Float4,
    pub y: Float4,
    pub z: Float4,
}

impl Vec3x4 {
    #[inline(always)]
    pub fn new(x: Float4, y: Float4, z: Float4) -> Self {
        Self { x, y, z }
    }

    /// Broadcasts a single vector into all four lanes.
    #[inline(always)]
    pub fn splat(v: Vec3) -> Self {
        Self {
            x: Float4::splat(v.x),
            y: Float4::splat(v.y),
            z: Float4::splat(v.z),
        }
    }

    #[inline(always)]
    pub fn axis(&self, axis: usize) -> Float4 {
        match axis {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => panic!("Invalid axis: {}", axis),
        }
    }

    #[inline(always)]
    pub fn dot(&self, other: &Self) -> Float4 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline(always)]
    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Length-normalizes every lane. Zero-length lanes stay zero.
    pub fn normalize(&self) -> Self {
        let len_sq = self.dot(self);
        let inv_len = Float4::from(len_sq.to_array().map(|l| l.sqrt().recip()));
        *self * Float4::select(len_sq.cmpgt(Float4::ZERO), inv_len, Float4::ZERO)
    }

    pub fn lane(&self, lane: usize) -> Vec3 {
        Vec3::new(self.x[lane], self.y[lane], self.z[lane])
    }
}

impl Add for Vec3x4 {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3x4 {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<Float4> for Vec3x4 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: Float4) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_reductions() {
        let a = Float4::new(0.0, 1.0, 2.0, 3.0);
        let b = Float4::splat(1.5);

        let lt = a.cmplt(b);
        assert!(!lt.all_true());
        assert!(!lt.all_false());
        assert_eq!(lt.count(), 2);
        assert!(lt.lane(0) && lt.lane(1));
        assert!(!lt.lane(2) && !lt.lane(3));

        assert!(a.cmplt(Float4::splat(10.0)).all_true());
        assert!(a.cmpgt(Float4::splat(10.0)).all_false());
    }

    #[test]
    fn cross_and_dot_per_lane() {
        let x = Vec3x4::splat(Vec3::X);
        let y = Vec3x4::splat(Vec3::Y);
        let z = x.cross(&y);

        for lane in 0..4 {
            assert_eq!(z.lane(lane), Vec3::Z);
        }
        assert_eq!(x.dot(&y), Float4::ZERO);
        assert_eq!(z.dot(&z), Float4::ONE);
    }

    #[test]
    fn normalize_lanes() {
        let v = Vec3x4::new(
            Float4::new(3.0, 0.0, 0.0, 1.0),
            Float4::new(4.0, 2.0, 0.0, 1.0),
            Float4::new(0.0, 0.0, 5.0, 1.0),
        )
        .normalize();

        for lane in 0..4 {
            assert!((v.lane(lane).length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_keeps_zero_lanes() {
        let v = Vec3x4::new(
            Float4::new(0.0, 2.0, 0.0, 0.0),
            Float4::new(0.0, 0.0, 0.0, 0.0),
            Float4::new(0.0, 0.0, -3.0, 0.0),
        )
        .normalize();

        assert_eq!(v.lane(0), Vec3::ZERO);
        assert_eq!(v.lane(1), Vec3::X);
        assert_eq!(v.lane(2), -Vec3::Z);
        assert_eq!(v.lane(3), Vec3::ZERO);
    }
}
