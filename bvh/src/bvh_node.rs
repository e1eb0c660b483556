use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::node::{Axis, HierarchyNode};
use crate::simd::{Float4, Mask4};
use crate::{Aabb, RayPacket4};

// Low two bits: `0b11` marks a leaf, otherwise the split axis of an inner node.
const FLAG_BITS: u32 = 2;
const FLAG_MASK: u32 = 0b11;
const LEAF_FLAG: u32 = 0b11;

/// Node storing the full, tight box around its subtree.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct BVHNode {
    pub bounds: Aabb,
    packed: u32,
}

impl Display for BVHNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_leaf() {
            write!(f, "leaf {} {}", self.geom_index(), self.bounds)
        } else {
            write!(f, "inner {} {}", self.child_id(), self.bounds)
        }
    }
}

impl Default for BVHNode {
    fn default() -> Self {
        BVHNode::new()
    }
}

impl BVHNode {
    pub fn new() -> BVHNode {
        BVHNode {
            bounds: Aabb::new(),
            packed: 0,
        }
    }

    #[inline(always)]
    fn pack(index: u32) -> u32 {
        debug_assert!(index <= Self::MAX_INDEX, "index {} does not fit", index);
        (index << FLAG_BITS) & !FLAG_MASK
    }

    #[inline(always)]
    fn unpack(&self) -> u32 {
        (self.packed & !FLAG_MASK) >> FLAG_BITS
    }
}

impl HierarchyNode for BVHNode {
    const MEM_SIZE: usize = std::mem::size_of::<BVHNode>();
    const MAX_INDEX: u32 = u32::MAX >> FLAG_BITS;

    #[inline(always)]
    fn is_leaf(&self) -> bool {
        self.packed & FLAG_MASK == LEAF_FLAG
    }

    #[inline(always)]
    fn geom_index(&self) -> u32 {
        self.unpack()
    }

    #[inline(always)]
    fn child_id(&self) -> u32 {
        self.unpack()
    }

    fn set_leaf(&mut self, geom_index: u32) {
        self.packed = Self::pack(geom_index) | LEAF_FLAG;
    }

    fn set_inner(&mut self, child_id: u32) {
        self.packed = Self::pack(child_id);
    }

    #[inline(always)]
    fn split_axis(&self) -> Axis {
        debug_assert!(!self.is_leaf());
        Axis::from_index((self.packed & FLAG_MASK) as usize)
    }

    fn set_split_axis(&mut self, axis: Axis) {
        self.packed = (self.packed & !FLAG_MASK) | axis as u32;
    }

    #[inline(always)]
    fn update_active_ray_segment(
        &self,
        packet: &RayPacket4,
        reverse: &[Mask4; 3],
        t_near: Float4,
        t_far: Float4,
    ) -> (Float4, Float4) {
        self.bounds.clip_interval(packet, reverse, t_near, t_far)
    }
}
