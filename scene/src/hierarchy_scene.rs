use bvh::{
    Aabb, BVHNode, Bounds, BuildStats, Hierarchy, MedianCutVolume, RayPacket4, SSHNode,
    TraversalConfig, TraversalStack, TraversalStats,
};
use std::sync::Arc;

use crate::config::SceneKind;
use crate::objects::Triangle;
use crate::{Result, Scene, SceneError};

/// Node layouts a [`HierarchyScene`] can be built from.
pub trait SceneNode: MedianCutVolume {
    const KIND: SceneKind;
}

impl SceneNode for BVHNode {
    const KIND: SceneKind = SceneKind::Bvh;
}

impl SceneNode for SSHNode {
    const KIND: SceneKind = SceneKind::Ssh;
}

#[derive(Debug, Clone)]
pub struct HierarchyScene<N: SceneNode> {
    pub(crate) hierarchy: Hierarchy<N>,
    pub(crate) triangles: Arc<[Triangle]>,
    collect_stats: bool,
}

pub type BoundingVolumeHierarchy = HierarchyScene<BVHNode>;
pub type SingleSlabHierarchy = HierarchyScene<SSHNode>;

impl<N: SceneNode> HierarchyScene<N> {
    pub fn new(traversal: TraversalConfig, collect_stats: bool) -> Self {
        Self {
            hierarchy: Hierarchy::empty(traversal),
            triangles: Arc::from(Vec::new()),
            collect_stats,
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy<N> {
        &self.hierarchy
    }

    pub fn set_traversal(&mut self, traversal: TraversalConfig) {
        self.hierarchy.config = traversal;
    }
}

impl<N: SceneNode> Scene for HierarchyScene<N> {
    fn kind(&self) -> SceneKind {
        N::KIND
    }

    fn construct(&mut self, triangles: Arc<[Triangle]>) -> Result<BuildStats> {
        if triangles.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        let aabbs: Vec<Aabb> = triangles.iter().map(|t| t.bounds()).collect();
        let stats = self.hierarchy.construct(&aabbs, self.collect_stats)?;
        self.triangles = triangles;

        log::debug!(
            "{}: {} inner nodes, {} leaves, height {}, {} bytes",
            N::KIND,
            stats.inner_nodes,
            stats.leaf_nodes,
            stats.height,
            self.computed_memory_usage()
        );
        if let Some(ratio) = stats.surface_approx_ratio {
            log::debug!("{}: surface ratio to tight bounds {:.4}", N::KIND, ratio);
        }

        Ok(stats)
    }

    fn intersect_with_stack(&self, packet: &mut RayPacket4, stack: &mut TraversalStack) -> TraversalStats {
        let triangles = &self.triangles;
        self.hierarchy.traverse4(packet, stack, |prim, packet| {
            triangles[prim].intersect4(packet, prim as u32);
        })
    }

    fn intersect(&self, packet: &mut RayPacket4) -> TraversalStats {
        let mut stack = self.hierarchy.new_stack();
        self.intersect_with_stack(packet, &mut stack)
    }

    fn bounds(&self) -> Aabb {
        self.hierarchy.bounds()
    }

    fn computed_memory_usage(&self) -> usize {
        self.hierarchy.computed_memory_usage()
    }

    fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}
