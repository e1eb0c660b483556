use glam::*;
use std::time::Instant;

use crate::build::{BuildContext, BuildResult, HierarchyBuilder};
use crate::node::{Axis, HierarchyNode};
use crate::{Aabb, BVHNode, BuildError, Result, SSHNode};

/// Per-layout hooks of [`SpatialMedianCut`].
pub trait MedianCutVolume: HierarchyNode {
    /// Initializes the root node from the scene bounds.
    fn setup_root_node(&mut self, bounds: &Aabb);

    /// Stores the volume of a node given the (approximated) volume of its
    /// parent and the tight bounds of its primitives. Returns the volume the
    /// node actually represents, which bounds the volumes of its children.
    fn set_node_volume(&mut self, parent_bounds: &Aabb, geom_bounds: &Aabb, ctx: &mut BuildContext)
        -> Aabb;
}

impl MedianCutVolume for BVHNode {
    fn setup_root_node(&mut self, bounds: &Aabb) {
        self.bounds = *bounds;
        self.set_inner(0);
    }

    fn set_node_volume(&mut self, _parent: &Aabb, geom_bounds: &Aabb, _ctx: &mut BuildContext) -> Aabb {
        self.bounds = *geom_bounds;
        *geom_bounds
    }
}

impl MedianCutVolume for SSHNode {
    fn setup_root_node(&mut self, bounds: &Aabb) {
        self.set_slab(Axis::X, false, bounds.max[0]);
    }

    /// Carves the parent volume by moving one of its six faces onto the
    /// matching face of the geometry bounds, keeping the carve with the
    /// smallest surface area. Ties keep the earliest candidate in x-min,
    /// x-max, y-min, y-max, z-min, z-max order.
    fn set_node_volume(&mut self, parent: &Aabb, geom_bounds: &Aabb, ctx: &mut BuildContext) -> Aabb {
        let mut node_bounds = *parent;
        node_bounds.min[0] = geom_bounds.min[0];
        let mut area = node_bounds.surface_area();
        self.set_slab(Axis::X, true, geom_bounds.min[0]);

        for &axis in Axis::ALL.iter() {
            let a = axis.index();
            for &near in [true, false].iter() {
                let mut candidate = *parent;
                let plane = if near {
                    candidate.min[a] = geom_bounds.min[a];
                    geom_bounds.min[a]
                } else {
                    candidate.max[a] = geom_bounds.max[a];
                    geom_bounds.max[a]
                };

                let candidate_area = candidate.surface_area();
                if candidate_area < area {
                    area = candidate_area;
                    node_bounds = candidate;
                    self.set_slab(axis, near, plane);
                }
            }
        }

        if ctx.collect_stats {
            ctx.record_surface_ratio(
                node_bounds.surface_area_precise(),
                geom_bounds.surface_area_precise(),
            );
        }

        node_bounds
    }
}

/// Recursive top-down builder splitting every node at the spatial midpoint of
/// the longest axis of its geometry bounds, down to one primitive per leaf.
#[derive(Debug, Copy, Clone, Default)]
pub struct SpatialMedianCut;

impl SpatialMedianCut {
    pub fn new() -> SpatialMedianCut {
        SpatialMedianCut
    }

    /// Largest primitive count whose `2N - 1` node indices fit the layout.
    pub fn max_primitives<N: HierarchyNode>() -> usize {
        N::MAX_INDEX as usize / 2 + 1
    }

    fn check_capacity<N: HierarchyNode>(count: usize) -> Result<()> {
        if count == 0 {
            return Err(BuildError::Empty);
        }

        let max = Self::max_primitives::<N>();
        if count > max {
            return Err(BuildError::TooManyPrimitives { count, max });
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn subdivide<N: MedianCutVolume>(
        nodes: &mut [N],
        index: usize,
        parent_bounds: &Aabb,
        geom_bounds: &Aabb,
        prim_indices: &mut [u32],
        aabbs: &[Aabb],
        centers: &[Vec3],
        depth: usize,
        ctx: &mut BuildContext,
    ) {
        debug_assert!(!prim_indices.is_empty());
        ctx.height = ctx.height.max(depth);

        let node_bounds = nodes[index].set_node_volume(parent_bounds, geom_bounds, ctx);
        debug_assert!({
            let tight = geom_bounds.surface_area();
            tight - node_bounds.surface_area() <= tight * 1e-4
        });

        if prim_indices.len() == 1 {
            ctx.leaf_nodes += 1;
            nodes[index].set_leaf(prim_indices[0]);
            debug_assert!(nodes[index].is_leaf());
            debug_assert_eq!(nodes[index].geom_index(), prim_indices[0]);
            return;
        }

        ctx.inner_nodes += 1;
        let child = ctx.allocate_children();
        nodes[index].set_inner(child as u32);
        debug_assert!(!nodes[index].is_leaf());
        debug_assert_eq!(nodes[index].child_id() as usize, child);

        let lengths = geom_bounds.lengths();
        let axis = if lengths.x > lengths.y {
            if lengths.x > lengths.z {
                Axis::X
            } else {
                Axis::Z
            }
        } else if lengths.y > lengths.z {
            Axis::Y
        } else {
            Axis::Z
        };
        nodes[index].set_split_axis(axis);

        let a = axis.index();
        let mut near_half = *geom_bounds;
        near_half.max[a] = (geom_bounds.min[a] + geom_bounds.max[a]) * 0.5;

        let mut split = 0;
        for i in 0..prim_indices.len() {
            if near_half.contains(centers[prim_indices[i] as usize]) {
                prim_indices.swap(i, split);
                split += 1;
            }
        }

        // Clustered geometry may land entirely on one side. The scan above left
        // the order untouched in that case, so halving by count is well defined.
        if split == 0 || split == prim_indices.len() {
            ctx.fallback_splits += 1;
            split = prim_indices.len() / 2;
        }

        let (near, far) = prim_indices.split_at_mut(split);
        let near_bounds = near.iter().fold(Aabb::new(), |bb, &i| bb.union_of(&aabbs[i as usize]));
        let far_bounds = far.iter().fold(Aabb::new(), |bb, &i| bb.union_of(&aabbs[i as usize]));

        Self::subdivide(nodes, child, &node_bounds, &near_bounds, near, aabbs, centers, depth + 1, ctx);
        Self::subdivide(nodes, child + 1, &node_bounds, &far_bounds, far, aabbs, centers, depth + 1, ctx);
    }
}

impl<N: MedianCutVolume> HierarchyBuilder<N> for SpatialMedianCut {
    fn build(&self, aabbs: &[Aabb], collect_stats: bool) -> Result<BuildResult<N>> {
        Self::check_capacity::<N>(aabbs.len())?;

        let timer = Instant::now();
        let bounds = aabbs.iter().fold(Aabb::new(), |bb, b| bb.union_of(b));
        let centers: Vec<Vec3> = aabbs.iter().map(|bb| bb.center()).collect();
        let mut prim_indices: Vec<u32> = (0..aabbs.len() as u32).collect();

        let mut ctx = BuildContext::new(aabbs.len(), collect_stats);
        let mut nodes = vec![N::default(); ctx.node_count()];
        nodes[0].setup_root_node(&bounds);

        Self::subdivide(
            &mut nodes,
            0,
            &bounds,
            &bounds,
            &mut prim_indices,
            aabbs,
            &centers,
            0,
            &mut ctx,
        );

        debug_assert_eq!(ctx.leaf_nodes, aabbs.len());
        debug_assert_eq!(ctx.inner_nodes, aabbs.len() - 1);
        debug_assert_eq!(ctx.first_free, ctx.node_count());

        let stats = ctx.finish(timer.elapsed());
        Ok(BuildResult { nodes, bounds, stats })
    }
}
