use bvh::simd::{Float4, LaneMask, Vec3x4};
use bvh::{Aabb, Bounds, RayPacket4};
use glam::*;
use serde::{Deserialize, Serialize};

/// Determinant threshold below which a ray counts as parallel to the triangle.
pub const EPSILON: f32 = 1e-8;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Opaque material handle, handed back with hits.
    pub material: u32,
    pub a: [f32; 3],
    pub edge_ab: [f32; 3],
    pub edge_ac: [f32; 3],
    pub normals: [[f32; 3]; 3],
    pub uvs: [[f32; 2]; 3],
}

/// Wraps a texture coordinate into `[0, 1]`, keeping an exact `1.0`.
fn wrap_uv(x: f32) -> f32 {
    let x = if x != 1.0 { x % 1.0 } else { x };
    if x < 0.0 {
        1.0 + x
    } else {
        x
    }
}

impl Triangle {
    pub fn new(material: u32, vertices: [Vec3; 3], normals: [Vec3; 3], uvs: [Vec2; 3]) -> Triangle {
        let [a, b, c] = vertices;
        let mut tex_coords = [[0.0; 2]; 3];
        let mut vertex_normals = [[0.0; 3]; 3];
        for i in 0..3 {
            vertex_normals[i] = normals[i].normalize_or_zero().into();
            tex_coords[i] = [wrap_uv(uvs[i].x), wrap_uv(uvs[i].y)];
        }

        Triangle {
            material,
            a: a.into(),
            edge_ab: (b - a).into(),
            edge_ac: (c - a).into(),
            normals: vertex_normals,
            uvs: tex_coords,
        }
    }

    /// Triangle with the geometric normal at every vertex.
    pub fn flat(material: u32, a: Vec3, b: Vec3, c: Vec3) -> Triangle {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Triangle::new(
            material,
            [a, b, c],
            [normal; 3],
            [Vec2::ZERO, Vec2::X, Vec2::Y],
        )
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        let a = Vec3::from(self.a);
        [a, a + Vec3::from(self.edge_ab), a + Vec3::from(self.edge_ac)]
    }

    /// Packet Möller-Trumbore test. Lanes that hit closer than their current
    /// `t` store `prim_id`, the distance and the barycentric `u` (weight of
    /// the second vertex) and `v` (weight of the third vertex).
    ///
    /// Returns whether any lane was updated.
    pub fn intersect4(&self, packet: &mut RayPacket4, prim_id: u32) -> bool {
        let edge1 = Vec3x4::splat(self.edge_ab.into());
        let edge2 = Vec3x4::splat(self.edge_ac.into());
        let dir = packet.direction();

        let vec_p = dir.cross(&edge2);
        let det = edge1.dot(&vec_p);

        let mut hit = det.abs().cmpge(Float4::splat(EPSILON));
        if hit.all_false() {
            return false;
        }

        let inv_det = det.recip();
        let zero = Float4::ZERO;
        let one = Float4::ONE;

        let vec_t = packet.origin() - Vec3x4::splat(self.a.into());
        let lambda = vec_t.dot(&vec_p) * inv_det;
        hit = hit & lambda.cmpge(zero) & lambda.cmple(one);
        if hit.all_false() {
            return false;
        }

        let vec_q = vec_t.cross(&edge1);
        let mue = dir.dot(&vec_q) * inv_det;
        hit = hit & mue.cmpge(zero) & (mue + lambda).cmple(one);
        if hit.all_false() {
            return false;
        }

        let f = edge2.dot(&vec_q) * inv_det;
        hit = hit & f.cmpgt(zero) & f.cmple(packet.t4());
        if hit.all_false() {
            return false;
        }

        packet.update_hits(hit, f, lambda, mue, prim_id);
        true
    }

    /// Interpolated, normalized shading normal.
    pub fn normal_at(&self, u: f32, v: f32) -> Vec3 {
        let [na, nb, nc] = self.normals;
        let normal = Vec3::from(nb) * u + Vec3::from(nc) * v + Vec3::from(na) * (1.0 - u - v);
        normal.normalize_or_zero()
    }

    pub fn normal_at4(&self, u: Float4, v: Float4) -> Vec3x4 {
        let [na, nb, nc] = self.normals;
        let w = Float4::ONE - u - v;
        let normal = Vec3x4::splat(nb.into()) * u
            + Vec3x4::splat(nc.into()) * v
            + Vec3x4::splat(na.into()) * w;
        normal.normalize()
    }

    pub fn tex_coord_at(&self, u: f32, v: f32) -> Vec2 {
        let [ta, tb, tc] = self.uvs;
        Vec2::from(tb) * u + Vec2::from(tc) * v + Vec2::from(ta) * (1.0 - u - v)
    }
}

impl Bounds for Triangle {
    fn bounds(&self) -> Aabb {
        let [a, b, c] = self.vertices();
        let mut aabb = Aabb::new();
        aabb.grow(a);
        aabb.grow(b);
        aabb.grow(c);
        aabb
    }
}
