use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::simd::{Float4, Mask4};
use crate::RayPacket4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn from_index(index: usize) -> Axis {
        match index {
            0 => Axis::X,
            1 => Axis::Y,
            2 => Axis::Z,
            _ => panic!("Invalid axis: {}", index),
        }
    }
}

/// Storage contract shared by every node layout of the flat node array.
///
/// A node is either a leaf referencing exactly one primitive, or an inner
/// node referencing its first child `c`. The second child always lives at
/// `c + 1` and is never stored. Packing is pure bit arithmetic and round
/// trips exactly: `set_leaf(i)` implies `geom_index() == i`.
pub trait HierarchyNode: Debug + Copy + Default + Send + Sync {
    /// Bytes one node occupies in the node array.
    const MEM_SIZE: usize;

    /// Largest primitive or child index the payload bits can hold.
    const MAX_INDEX: u32;

    fn is_leaf(&self) -> bool;

    /// Primitive index of a leaf.
    fn geom_index(&self) -> u32;

    /// Index of the first child of an inner node.
    fn child_id(&self) -> u32;

    fn set_leaf(&mut self, geom_index: u32);

    fn set_inner(&mut self, child_id: u32);

    /// Axis the primitives of an inner node were split along.
    fn split_axis(&self) -> Axis;

    /// Must be called after [`HierarchyNode::set_inner`], which resets the axis bits.
    fn set_split_axis(&mut self, axis: Axis);

    /// Narrows the per-lane active segment `[t_near, t_far]` to the volume
    /// this node stores.
    ///
    /// This is the only layout specific step of the traversal. `reverse` holds,
    /// per axis, the lanes with a negative reciprocal direction.
    fn update_active_ray_segment(
        &self,
        packet: &RayPacket4,
        reverse: &[Mask4; 3],
        t_near: Float4,
        t_far: Float4,
    ) -> (Float4, Float4);
}
