use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::build::{BuildResult, BuildStats, HierarchyBuilder, MedianCutVolume, SpatialMedianCut};
use crate::node::HierarchyNode;
use crate::simd::{Float4, LaneMask};
use crate::traversal::{
    traverse_iterative, traverse_recursive, TraversalConfig, TraversalStack, TraversalStats,
    TraversalStrategy,
};
use crate::{Aabb, BVHNode, RayPacket4, Result, SSHNode};

/// Binary hierarchy over a fixed primitive set, stored as a flat node array.
///
/// The root is node 0 and the children of an inner node referencing `c`
/// occupy `c` and `c + 1`. Every leaf references exactly one primitive, so
/// `N` primitives always produce `2N - 1` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hierarchy<N: HierarchyNode> {
    nodes: Vec<N>,
    bounds: Aabb,
    height: usize,
    pub config: TraversalConfig,
}

pub type BVH = Hierarchy<BVHNode>;
pub type SSH = Hierarchy<SSHNode>;

impl<N: HierarchyNode> Hierarchy<N> {
    pub fn empty(config: TraversalConfig) -> Hierarchy<N> {
        Hierarchy {
            nodes: Vec::new(),
            bounds: Aabb::new(),
            height: 0,
            config,
        }
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn prim_count(&self) -> usize {
        (self.nodes.len() + 1) / 2
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Static estimate of the node array size in bytes.
    pub fn computed_memory_usage(&self) -> usize {
        N::MEM_SIZE * self.nodes.len()
    }

    /// Stack sized for the deepest path of this hierarchy.
    pub fn new_stack(&self) -> TraversalStack {
        TraversalStack::with_capacity(self.height + 1)
    }

    /// Walks the hierarchy with `packet`, calling `intersection_test` with the
    /// primitive index of every leaf that is not rejected.
    ///
    /// `intersection_test` is expected to shrink `packet.t` of the lanes it
    /// hits, which lets ordered traversal reject nodes behind closer hits.
    pub fn traverse4<I>(
        &self,
        packet: &mut RayPacket4,
        stack: &mut TraversalStack,
        mut intersection_test: I,
    ) -> TraversalStats
    where
        I: FnMut(usize, &mut RayPacket4),
    {
        if self.nodes.is_empty() {
            return TraversalStats::default();
        }

        let reverse = packet.reverse_mask();
        let (t_near, t_far) = self
            .bounds
            .clip_interval(packet, &reverse, Float4::ZERO, packet.t4());

        if t_near.cmpgt(t_far).all_true() {
            return TraversalStats::default();
        }

        let ordered = self.config.ordered;
        match self.config.strategy {
            TraversalStrategy::Iterative => traverse_iterative(
                &self.nodes,
                packet,
                &reverse,
                t_near,
                t_far,
                ordered,
                stack,
                &mut intersection_test,
            ),
            TraversalStrategy::Recursive => {
                let mut stats = TraversalStats::default();
                traverse_recursive(
                    &self.nodes,
                    0,
                    packet,
                    &reverse,
                    t_near,
                    t_far,
                    ordered,
                    &mut intersection_test,
                    &mut stats,
                );
                stats
            }
        }
    }
}

impl<N: MedianCutVolume> Hierarchy<N> {
    /// Rebuilds the hierarchy over `aabbs`, replacing any previous node array.
    ///
    /// On error the previous hierarchy is left untouched.
    pub fn construct(&mut self, aabbs: &[Aabb], collect_stats: bool) -> Result<BuildStats> {
        let timer = Instant::now();
        let result: BuildResult<N> = SpatialMedianCut::new().build(aabbs, collect_stats)?;

        self.nodes = result.nodes;
        self.bounds = result.bounds;
        self.height = result.stats.height;

        log::debug!(
            "built hierarchy over {} primitives in {} ms: {} nodes, height {}, {} fallback splits",
            aabbs.len(),
            timer.elapsed().as_millis(),
            self.nodes.len(),
            self.height,
            result.stats.fallback_splits
        );

        Ok(result.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::*;

    fn grid_boxes() -> Vec<Aabb> {
        let mut aabbs = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                let min = Vec3::new(x as f32 * 2.0, y as f32 * 2.0, 0.0);
                aabbs.push(Aabb::from_points(min, min + Vec3::new(1.0, 1.0, 0.0)));
            }
        }
        aabbs
    }

    /// Leaf test treating every box as an opaque slab at z = 0.
    fn hit_boxes(aabbs: &[Aabb]) -> impl FnMut(usize, &mut RayPacket4) + '_ {
        move |prim: usize, packet: &mut RayPacket4| {
            let (t_near, t_far) = aabbs[prim].clip(packet);
            let t = packet.t4();
            let mask = t_near.cmple(t_far) & t_near.cmpgt(Float4::ZERO) & t_near.cmplt(t);
            packet.update_hits(mask, t_near, Float4::ZERO, Float4::ZERO, prim as u32);
        }
    }

    fn packet_over(targets: [Vec2; 4]) -> RayPacket4 {
        let origins = [
            targets[0].extend(5.0),
            targets[1].extend(5.0),
            targets[2].extend(5.0),
            targets[3].extend(5.0),
        ];
        RayPacket4::new(origins, [Vec3::new(0.0, 0.0, -1.0); 4], 100.0)
    }

    fn check_hits<N: MedianCutVolume>() {
        let aabbs = grid_boxes();
        let targets = [
            Vec2::new(0.5, 0.5),
            Vec2::new(6.5, 2.5),
            Vec2::new(1.5, 1.5),
            Vec2::new(4.25, 6.75),
        ];

        for config in TraversalConfig::all().iter() {
            let mut hierarchy = Hierarchy::<N>::empty(*config);
            hierarchy.construct(&aabbs, false).unwrap();

            let mut packet = packet_over(targets);
            let mut stack = hierarchy.new_stack();
            let stats = hierarchy.traverse4(&mut packet, &mut stack, hit_boxes(&aabbs));

            assert!(stats.node_visits > 0);
            assert_eq!(packet.hit, [Some(0), Some(13), None, Some(11)]);
            assert!((packet.t[0] - 5.0).abs() < 1e-5);
            assert_eq!(packet.t[2], 100.0);
        }
    }

    #[test]
    fn bvh_finds_boxes() {
        check_hits::<BVHNode>();
    }

    #[test]
    fn ssh_finds_boxes() {
        check_hits::<SSHNode>();
    }

    #[test]
    fn packet_missing_bounds_visits_nothing() {
        let aabbs = grid_boxes();
        let mut hierarchy = BVH::empty(TraversalConfig::default());
        hierarchy.construct(&aabbs, false).unwrap();

        // pointing away from the scene
        let mut packet = RayPacket4::from_ray(Vec3::new(0.5, 0.5, 5.0), Vec3::Z, 100.0);
        let stats = hierarchy.traverse4(&mut packet, &mut TraversalStack::new(), hit_boxes(&aabbs));

        assert_eq!(stats, TraversalStats::default());
        assert_eq!(packet.hit, [None; 4]);
    }

    #[test]
    fn iterative_and_recursive_visit_same_nodes() {
        let aabbs = grid_boxes();
        let targets = [
            Vec2::new(0.5, 0.5),
            Vec2::new(6.5, 6.5),
            Vec2::new(3.0, 3.0),
            Vec2::new(2.5, 4.5),
        ];

        for &ordered in [true, false].iter() {
            let mut visits = Vec::new();
            for &strategy in [TraversalStrategy::Iterative, TraversalStrategy::Recursive].iter() {
                let mut hierarchy = SSH::empty(TraversalConfig { strategy, ordered });
                hierarchy.construct(&aabbs, false).unwrap();

                let mut packet = packet_over(targets);
                let mut stack = TraversalStack::new();
                visits.push(hierarchy.traverse4(&mut packet, &mut stack, hit_boxes(&aabbs)));
            }
            assert_eq!(visits[0], visits[1]);
        }
    }

    #[test]
    fn failed_construction_keeps_previous_hierarchy() {
        let aabbs = grid_boxes();
        let mut hierarchy = BVH::empty(TraversalConfig::default());
        hierarchy.construct(&aabbs, false).unwrap();

        assert!(hierarchy.construct(&[], false).is_err());
        assert_eq!(hierarchy.node_count(), 31);
        assert_eq!(hierarchy.prim_count(), 16);
        assert_eq!(hierarchy.computed_memory_usage(), 31 * BVHNode::MEM_SIZE);
    }

    #[test]
    fn empty_hierarchy_visits_nothing() {
        let hierarchy = SSH::empty(TraversalConfig::default());
        let mut packet = RayPacket4::from_ray(Vec3::ZERO, Vec3::X, 1.0);
        let stats = hierarchy.traverse4(&mut packet, &mut TraversalStack::new(), |_, _| {
            panic!("no leaves to test")
        });

        assert_eq!(stats.node_visits, 0);
        assert_eq!(hierarchy.computed_memory_usage(), 0);
    }
}
