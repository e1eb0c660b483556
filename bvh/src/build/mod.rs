pub mod spatial_median_cut;

pub use spatial_median_cut::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::node::HierarchyNode;
use crate::{Aabb, Result};

pub struct BuildResult<N: HierarchyNode> {
    pub nodes: Vec<N>,
    pub bounds: Aabb,
    pub stats: BuildStats,
}

pub trait HierarchyBuilder<N: HierarchyNode> {
    fn build(&self, aabbs: &[Aabb], collect_stats: bool) -> Result<BuildResult<N>>;
}

/// Summary of one construction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    pub inner_nodes: usize,
    pub leaf_nodes: usize,
    pub height: usize,
    /// Inner nodes whose spatial split put every primitive on one side.
    pub fallback_splits: usize,
    /// Mean ratio of approximated to tight node surface area, only computed
    /// by node layouts that approximate their volume and only when statistics
    /// are enabled.
    pub surface_approx_ratio: Option<f64>,
    pub construction_time: Duration,
}

impl BuildStats {
    pub fn node_count(&self) -> usize {
        self.inner_nodes + self.leaf_nodes
    }
}

/// Mutable state threaded through a recursive build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub first_free: usize,
    pub inner_nodes: usize,
    pub leaf_nodes: usize,
    pub height: usize,
    pub fallback_splits: usize,
    pub collect_stats: bool,
    node_count: usize,
    surface_ratio: f64,
    surface_ratio_samples: usize,
}

impl BuildContext {
    pub fn new(prim_count: usize, collect_stats: bool) -> BuildContext {
        BuildContext {
            // the root occupies slot 0
            first_free: 1,
            inner_nodes: 0,
            leaf_nodes: 0,
            height: 0,
            fallback_splits: 0,
            collect_stats,
            node_count: (2 * prim_count).saturating_sub(1),
            surface_ratio: 0.0,
            surface_ratio_samples: 0,
        }
    }

    /// Total number of nodes the finished tree will contain.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Reserves two adjacent slots and returns the index of the first one.
    pub fn allocate_children(&mut self) -> usize {
        let first = self.first_free;
        self.first_free += 2;
        debug_assert!(self.first_free <= self.node_count);
        first
    }

    /// Accumulates one node's approximated vs. tight surface area.
    pub fn record_surface_ratio(&mut self, approx_area: f64, tight_area: f64) {
        let n = self.node_count.max(1) as f64;
        if approx_area > 0.0 && tight_area > 0.0 {
            self.surface_ratio += (approx_area / tight_area) / n;
        } else {
            self.surface_ratio += 1.0 / n;
        }
        self.surface_ratio_samples += 1;
    }

    pub fn finish(self, construction_time: Duration) -> BuildStats {
        BuildStats {
            inner_nodes: self.inner_nodes,
            leaf_nodes: self.leaf_nodes,
            height: self.height,
            fallback_splits: self.fallback_splits,
            surface_approx_ratio: if self.surface_ratio_samples > 0 {
                Some(self.surface_ratio)
            } else {
                None
            },
            construction_time,
        }
    }
}
