use bvh::{Aabb, BuildStats, RayPacket4, TraversalStack, TraversalStats};
use glam::*;
use std::fmt::Debug;
use std::sync::Arc;

use crate::config::{SceneConfig, SceneKind};
use crate::objects::Triangle;
use crate::{BoundingVolumeHierarchy, Result, SceneError, SimpleScene, SingleSlabHierarchy};

/// Shading information of one lane's closest hit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HitRecord {
    pub prim_id: u32,
    pub material: u32,
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

/// A static triangle scene answering nearest-hit queries for ray packets.
///
/// `construct` is the only mutating call. Afterwards any number of threads may
/// intersect concurrently, each with its own [`TraversalStack`].
pub trait Scene: Debug + Send + Sync {
    fn kind(&self) -> SceneKind;

    /// Builds the acceleration structure over `triangles`, replacing any
    /// previous one. The triangles are shared, never copied or modified.
    fn construct(&mut self, triangles: Arc<[Triangle]>) -> Result<BuildStats>;

    /// Updates `t`, `u`, `v` and `hit` of every lane that has a hit in `(0, t]`.
    fn intersect_with_stack(&self, packet: &mut RayPacket4, stack: &mut TraversalStack) -> TraversalStats;

    fn intersect(&self, packet: &mut RayPacket4) -> TraversalStats {
        let mut stack = TraversalStack::new();
        self.intersect_with_stack(packet, &mut stack)
    }

    fn bounds(&self) -> Aabb;

    /// Estimated size of the acceleration structure in bytes.
    fn computed_memory_usage(&self) -> usize;

    fn triangles(&self) -> &[Triangle];

    fn hit_record(&self, packet: &RayPacket4, lane: usize) -> Option<HitRecord> {
        let hit = packet.lane_hit(lane)?;
        let triangle = self.triangles().get(hit.prim_id as usize)?;

        Some(HitRecord {
            prim_id: hit.prim_id,
            material: triangle.material,
            t: hit.t,
            u: hit.u,
            v: hit.v,
            point: packet.hit_point(lane),
            normal: triangle.normal_at(hit.u, hit.v),
            tex_coord: triangle.tex_coord_at(hit.u, hit.v),
        })
    }
}

pub fn create_scene(config: &SceneConfig) -> Result<Box<dyn Scene>> {
    match config.kind {
        SceneKind::Bvh => {
            log::info!("Creating BVH");
            Ok(Box::new(BoundingVolumeHierarchy::new(
                config.traversal,
                config.collect_stats,
            )))
        }
        SceneKind::Ssh => {
            log::info!("Creating SSH");
            Ok(Box::new(SingleSlabHierarchy::new(
                config.traversal,
                config.collect_stats,
            )))
        }
        SceneKind::Simple => {
            log::info!("Creating scene using no acceleration");
            Ok(Box::new(SimpleScene::new()))
        }
        SceneKind::Kd => {
            log::error!("{} not supported yet", config.kind);
            Err(SceneError::Unsupported(config.kind))
        }
    }
}

/// Creates a scene of the configured kind and builds it over `triangles`.
pub fn build_scene(config: &SceneConfig, triangles: Arc<[Triangle]>) -> Result<(Box<dyn Scene>, BuildStats)> {
    let mut scene = create_scene(config)?;
    let stats = scene.construct(triangles)?;
    Ok((scene, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Arc<[Triangle]> {
        vec![
            Triangle::flat(1, Vec3::ZERO, Vec3::X, Vec3::Y),
            Triangle::flat(2, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y),
        ]
        .into()
    }

    #[test]
    fn kd_tree_fails_fast() {
        let result = create_scene(&SceneConfig::new(SceneKind::Kd));
        assert!(matches!(result, Err(SceneError::Unsupported(SceneKind::Kd))));
    }

    #[test]
    fn created_kinds() {
        for kind in [SceneKind::Bvh, SceneKind::Ssh, SceneKind::Simple].iter() {
            let scene = create_scene(&SceneConfig::new(*kind)).unwrap();
            assert_eq!(scene.kind(), *kind);
        }
    }

    #[test]
    fn hit_record_of_closest_triangle() {
        for kind in [SceneKind::Bvh, SceneKind::Ssh, SceneKind::Simple].iter() {
            let (scene, _) = build_scene(&SceneConfig::new(*kind), quad()).unwrap();

            let mut packet = RayPacket4::from_origin(
                Vec3::new(0.0, 0.0, 2.0),
                [
                    Vec3::new(0.25, 0.25, -2.0),
                    Vec3::new(0.75, 0.75, -2.0),
                    Vec3::new(2.0, 2.0, -2.0),
                    Vec3::new(0.0, 0.0, 1.0),
                ],
                1e34,
            );
            scene.intersect(&mut packet);

            let record = scene.hit_record(&packet, 0).unwrap();
            assert_eq!(record.prim_id, 0);
            assert_eq!(record.material, 1);
            assert!((record.t - 1.0).abs() < 1e-5);
            assert!((record.point - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-5);
            assert!((record.normal - Vec3::Z).length() < 1e-5);
            assert!((record.tex_coord - Vec2::new(0.25, 0.25)).length() < 1e-5);

            assert_eq!(scene.hit_record(&packet, 1).map(|r| r.material), Some(2));
            assert!(scene.hit_record(&packet, 2).is_none());
            assert!(scene.hit_record(&packet, 3).is_none());
        }
    }
}
