use glam::*;

use crate::simd::{Float4, LaneMask, Mask4, Vec3x4};

/// Closest hit of a single lane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LaneHit {
    pub prim_id: u32,
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Four rays traced together.
///
/// Every lane is an independent ray; lanes only share control flow during
/// traversal. `t`, `u`, `v` and `hit` are updated in place whenever a lane
/// finds a closer intersection, so `t` always holds the current upper bound of
/// the lane's search interval `(0, t]`.
#[derive(Debug, Copy, Clone)]
pub struct RayPacket4 {
    pub origin_x: [f32; 4],
    pub origin_y: [f32; 4],
    pub origin_z: [f32; 4],

    pub direction_x: [f32; 4],
    pub direction_y: [f32; 4],
    pub direction_z: [f32; 4],

    pub inv_direction_x: [f32; 4],
    pub inv_direction_y: [f32; 4],
    pub inv_direction_z: [f32; 4],

    pub t: [f32; 4],
    pub u: [f32; 4],
    pub v: [f32; 4],
    pub hit: [Option<u32>; 4],
}

impl RayPacket4 {
    pub fn new(origins: [Vec3; 4], directions: [Vec3; 4], t_max: f32) -> RayPacket4 {
        let mut packet = RayPacket4 {
            origin_x: [0.0; 4],
            origin_y: [0.0; 4],
            origin_z: [0.0; 4],
            direction_x: [0.0; 4],
            direction_y: [0.0; 4],
            direction_z: [0.0; 4],
            inv_direction_x: [0.0; 4],
            inv_direction_y: [0.0; 4],
            inv_direction_z: [0.0; 4],
            t: [t_max; 4],
            u: [0.0; 4],
            v: [0.0; 4],
            hit: [None; 4],
        };

        for i in 0..4 {
            let inv = Vec3::ONE / directions[i];

            packet.origin_x[i] = origins[i].x;
            packet.origin_y[i] = origins[i].y;
            packet.origin_z[i] = origins[i].z;
            packet.direction_x[i] = directions[i].x;
            packet.direction_y[i] = directions[i].y;
            packet.direction_z[i] = directions[i].z;
            packet.inv_direction_x[i] = inv.x;
            packet.inv_direction_y[i] = inv.y;
            packet.inv_direction_z[i] = inv.z;
        }

        packet
    }

    /// Packet holding the same ray in all four lanes.
    pub fn from_ray(origin: Vec3, direction: Vec3, t_max: f32) -> RayPacket4 {
        Self::new([origin; 4], [direction; 4], t_max)
    }

    /// Packet of rays sharing one origin, e.g. a 2x2 pixel block of a pinhole camera.
    pub fn from_origin(origin: Vec3, directions: [Vec3; 4], t_max: f32) -> RayPacket4 {
        Self::new([origin; 4], directions, t_max)
    }

    #[inline(always)]
    pub fn origin(&self) -> Vec3x4 {
        Vec3x4::new(
            self.origin_x.into(),
            self.origin_y.into(),
            self.origin_z.into(),
        )
    }

    #[inline(always)]
    pub fn direction(&self) -> Vec3x4 {
        Vec3x4::new(
            self.direction_x.into(),
            self.direction_y.into(),
            self.direction_z.into(),
        )
    }

    #[inline(always)]
    pub fn inv_direction(&self) -> Vec3x4 {
        Vec3x4::new(
            self.inv_direction_x.into(),
            self.inv_direction_y.into(),
            self.inv_direction_z.into(),
        )
    }

    #[inline(always)]
    pub fn t4(&self) -> Float4 {
        self.t.into()
    }

    /// Per axis: lanes travelling towards negative coordinates.
    #[inline(always)]
    pub fn reverse_mask(&self) -> [Mask4; 3] {
        let zero = Float4::ZERO;
        let inv = self.inv_direction();
        [inv.x.cmplt(zero), inv.y.cmplt(zero), inv.z.cmplt(zero)]
    }

    /// Stores a new closest hit for every lane set in `mask`; other lanes keep their state.
    #[inline(always)]
    pub fn update_hits(&mut self, mask: Mask4, t: Float4, u: Float4, v: Float4, prim_id: u32) {
        self.t = Float4::select(mask, t, self.t.into()).to_array();
        self.u = Float4::select(mask, u, self.u.into()).to_array();
        self.v = Float4::select(mask, v, self.v.into()).to_array();

        for lane in 0..4 {
            if mask.lane(lane) {
                self.hit[lane] = Some(prim_id);
            }
        }
    }

    pub fn lane_hit(&self, lane: usize) -> Option<LaneHit> {
        self.hit[lane].map(|prim_id| LaneHit {
            prim_id,
            t: self.t[lane],
            u: self.u[lane],
            v: self.v[lane],
        })
    }

    /// All four lanes hit the same primitive (or all missed).
    pub fn hit_all_same(&self) -> bool {
        self.hit.iter().all(|h| *h == self.hit[0])
    }

    pub fn hit_point(&self, lane: usize) -> Vec3 {
        let t = self.t[lane];
        self.origin().lane(lane) + self.direction().lane(lane) * t
    }
}
