use bvh::{Aabb, Bounds, BuildStats, RayPacket4, TraversalStack, TraversalStats};
use std::sync::Arc;
use std::time::Instant;

use crate::config::SceneKind;
use crate::objects::Triangle;
use crate::{Result, Scene, SceneError};

/// Tests every triangle against every packet. Serves as the reference the
/// hierarchies are validated against.
#[derive(Debug, Clone)]
pub struct SimpleScene {
    triangles: Arc<[Triangle]>,
    bounds: Aabb,
}

impl Default for SimpleScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleScene {
    pub fn new() -> SimpleScene {
        SimpleScene {
            triangles: Arc::from(Vec::new()),
            bounds: Aabb::new(),
        }
    }
}

impl Scene for SimpleScene {
    fn kind(&self) -> SceneKind {
        SceneKind::Simple
    }

    fn construct(&mut self, triangles: Arc<[Triangle]>) -> Result<BuildStats> {
        if triangles.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        let timer = Instant::now();
        self.bounds = triangles
            .iter()
            .fold(Aabb::new(), |bb, t| bb.union_of(&t.bounds()));
        self.triangles = triangles;

        Ok(BuildStats {
            construction_time: timer.elapsed(),
            ..BuildStats::default()
        })
    }

    fn intersect_with_stack(&self, packet: &mut RayPacket4, _stack: &mut TraversalStack) -> TraversalStats {
        for (i, triangle) in self.triangles.iter().enumerate() {
            triangle.intersect4(packet, i as u32);
        }

        TraversalStats {
            node_visits: 0,
            triangle_tests: self.triangles.len() as u64,
        }
    }

    fn intersect(&self, packet: &mut RayPacket4) -> TraversalStats {
        self.intersect_with_stack(packet, &mut TraversalStack::new())
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn computed_memory_usage(&self) -> usize {
        0
    }

    fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}
