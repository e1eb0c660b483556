use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::node::{Axis, HierarchyNode};
use crate::simd::{Float4, Mask4};
use crate::RayPacket4;

// Flag layout, least significant bits first:
//   bits 0-1  slab axis
//   bit  2    leaf
//   bit  3    near: the slab replaced the minimum face of the parent volume
//   bits 4-5  split axis
//   bits 6-31 primitive or first child index
const SLAB_AXIS_MASK: u32 = 0b00_0011;
const LEAF_FLAG: u32 = 0b00_0100;
const NEAR_FLAG: u32 = 0b00_1000;
const SPLIT_AXIS_SHIFT: u32 = 4;
const SPLIT_AXIS_MASK: u32 = 0b11_0000;
const FLAG_BITS: u32 = 6;
const FLAG_MASK: u32 = 0b11_1111;

/// Node storing a single axis aligned plane.
///
/// The volume of a node is the volume of its parent carved by one half-space,
/// so only one face can be tightened per level.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct SSHNode {
    pub plane: f32,
    packed: u32,
}

impl Display for SSHNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let side = if self.is_near() { "min" } else { "max" };
        if self.is_leaf() {
            write!(
                f,
                "leaf {} ({:?} {} = {})",
                self.geom_index(),
                self.slab_axis(),
                side,
                self.plane
            )
        } else {
            write!(
                f,
                "inner {} ({:?} {} = {})",
                self.child_id(),
                self.slab_axis(),
                side,
                self.plane
            )
        }
    }
}

impl Default for SSHNode {
    fn default() -> Self {
        SSHNode::new()
    }
}

impl SSHNode {
    pub fn new() -> SSHNode {
        SSHNode {
            plane: 0.0,
            packed: 0,
        }
    }

    /// Replaces the slab; leaf flag, split axis and index are kept.
    pub fn set_slab(&mut self, axis: Axis, near: bool, plane: f32) {
        let mut flags = axis as u32;
        if near {
            flags |= NEAR_FLAG;
        }

        self.packed = (self.packed & !(SLAB_AXIS_MASK | NEAR_FLAG)) | flags;
        self.plane = plane;
    }

    #[inline(always)]
    pub fn slab_axis(&self) -> Axis {
        Axis::from_index((self.packed & SLAB_AXIS_MASK) as usize)
    }

    #[inline(always)]
    pub fn is_near(&self) -> bool {
        self.packed & NEAR_FLAG != 0
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

impl HierarchyNode for SSHNode {
    const MEM_SIZE: usize = std::mem::size_of::<SSHNode>();
    const MAX_INDEX: u32 = u32::MAX >> FLAG_BITS;

    #[inline(always)]
    fn is_leaf(&self) -> bool {
        self.packed & LEAF_FLAG != 0
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
        let slab = self.packed & (SLAB_AXIS_MASK | NEAR_FLAG);
        self.packed = Self::pack(geom_index) | slab | LEAF_FLAG;
    }

    fn set_inner(&mut self, child_id: u32) {
        let slab = self.packed & (SLAB_AXIS_MASK | NEAR_FLAG);
        self.packed = Self::pack(child_id) | slab;
    }

    #[inline(always)]
    fn split_axis(&self) -> Axis {
        Axis::from_index(((self.packed & SPLIT_AXIS_MASK) >> SPLIT_AXIS_SHIFT) as usize)
    }

    fn set_split_axis(&mut self, axis: Axis) {
        self.packed = (self.packed & !SPLIT_AXIS_MASK) | ((axis as u32) << SPLIT_AXIS_SHIFT);
    }

    /// Clips against the single plane. Works for packets with mixed direction
    /// signs: a near (minimum) plane is an entry for forward lanes and an exit
    /// for reversed lanes, a far (maximum) plane the other way round.
    #[inline(always)]
    fn update_active_ray_segment(
        &self,
        packet: &RayPacket4,
        reverse: &[Mask4; 3],
        t_near: Float4,
        t_far: Float4,
    ) -> (Float4, Float4) {
        let axis = self.slab_axis().index();
        let reverse = reverse[axis];

        let t = (Float4::splat(self.plane) - packet.origin().axis(axis))
            * packet.inv_direction().axis(axis);

        if self.is_near() {
            (
                Float4::select(reverse | t.cmple(t_near), t_near, t),
                Float4::select(reverse & t.cmplt(t_far), t, t_far),
            )
        } else {
            (
                Float4::select(reverse & t.cmpgt(t_near), t, t_near),
                Float4::select(reverse | t.cmpge(t_far), t_far, t),
            )
        }
    }
}
