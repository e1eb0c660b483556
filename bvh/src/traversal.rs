use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::node::{Axis, HierarchyNode};
use crate::simd::{Float4, LaneMask, Mask4};
use crate::RayPacket4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalStrategy {
    /// Explicit stack of pending nodes, see [`TraversalStack`].
    Iterative,
    /// One nested call per visited inner node.
    Recursive,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalConfig {
    pub strategy: TraversalStrategy,
    /// Visit the nearer child first and reject nodes lying behind the current closest hits.
    pub ordered: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            strategy: TraversalStrategy::Iterative,
            ordered: true,
        }
    }
}

impl TraversalConfig {
    pub fn all() -> [TraversalConfig; 4] {
        [
            TraversalConfig { strategy: TraversalStrategy::Iterative, ordered: true },
            TraversalConfig { strategy: TraversalStrategy::Iterative, ordered: false },
            TraversalConfig { strategy: TraversalStrategy::Recursive, ordered: true },
            TraversalConfig { strategy: TraversalStrategy::Recursive, ordered: false },
        ]
    }
}

/// Work counters of one or more traversals.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    pub node_visits: u64,
    pub triangle_tests: u64,
}

impl TraversalStats {
    /// Average node visits and primitive tests per ray for `rays` traced rays.
    pub fn per_ray(&self, rays: usize) -> (f64, f64) {
        if rays == 0 {
            return (0.0, 0.0);
        }

        let rays = rays as f64;
        (self.node_visits as f64 / rays, self.triangle_tests as f64 / rays)
    }
}

impl Add for TraversalStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            node_visits: self.node_visits + rhs.node_visits,
            triangle_tests: self.triangle_tests + rhs.triangle_tests,
        }
    }
}

impl AddAssign for TraversalStats {
    fn add_assign(&mut self, rhs: Self) {
        self.node_visits += rhs.node_visits;
        self.triangle_tests += rhs.triangle_tests;
    }
}

impl Sum for TraversalStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |a, b| a + b)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct StackFrame {
    pub node: u32,
    pub t_near: Float4,
    pub t_far: Float4,
}

/// Pending nodes of an iterative traversal.
///
/// A stack must not be shared between concurrent traversals; give every
/// worker its own and reuse it across packets.
#[derive(Debug, Clone, Default)]
pub struct TraversalStack {
    frames: Vec<StackFrame>,
}

impl TraversalStack {
    pub fn new() -> TraversalStack {
        TraversalStack { frames: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> TraversalStack {
        TraversalStack {
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Makes room for at least `depth` frames, e.g. the height of a hierarchy.
    pub fn reserve(&mut self, depth: usize) {
        let len = self.frames.len();
        if depth > len {
            self.frames.reserve(depth - len);
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    #[inline(always)]
    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

#[inline(always)]
fn rejected(packet: &RayPacket4, t_near: Float4, t_far: Float4, ordered: bool) -> bool {
    t_near.cmpgt(t_far).all_true() || (ordered && t_near.cmpgt(packet.t4()).all_true())
}

/// Children are stored near side first; the far one is entered first when
/// most lanes travel towards negative coordinates along the split axis.
#[inline(always)]
fn child_order(reverse: &[Mask4; 3], axis: Axis, child: u32, ordered: bool) -> (u32, u32) {
    if ordered && reverse[axis.index()].count() >= 3 {
        (child + 1, child)
    } else {
        (child, child + 1)
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn traverse_iterative<N, I>(
    nodes: &[N],
    packet: &mut RayPacket4,
    reverse: &[Mask4; 3],
    mut t_near: Float4,
    mut t_far: Float4,
    ordered: bool,
    stack: &mut TraversalStack,
    intersection_test: &mut I,
) -> TraversalStats
where
    N: HierarchyNode,
    I: FnMut(usize, &mut RayPacket4),
{
    let mut stats = TraversalStats::default();
    let mut current = 0;
    stack.clear();

    loop {
        let node = &nodes[current as usize];
        let (n, f) = node.update_active_ray_segment(packet, reverse, t_near, t_far);
        t_near = n;
        t_far = f;
        stats.node_visits += 1;

        let hit = !rejected(packet, t_near, t_far, ordered);
        if hit && !node.is_leaf() {
            let (first, second) = child_order(reverse, node.split_axis(), node.child_id(), ordered);
            stack.push(StackFrame {
                node: second,
                t_near,
                t_far,
            });
            current = first;
            continue;
        }

        if hit {
            intersection_test(node.geom_index() as usize, packet);
            stats.triangle_tests += 1;
        }

        match stack.pop() {
            Some(frame) => {
                current = frame.node;
                t_near = frame.t_near;
                t_far = frame.t_far;
            }
            None => return stats,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn traverse_recursive<N, I>(
    nodes: &[N],
    index: u32,
    packet: &mut RayPacket4,
    reverse: &[Mask4; 3],
    t_near: Float4,
    t_far: Float4,
    ordered: bool,
    intersection_test: &mut I,
    stats: &mut TraversalStats,
) where
    N: HierarchyNode,
    I: FnMut(usize, &mut RayPacket4),
{
    let node = &nodes[index as usize];
    let (t_near, t_far) = node.update_active_ray_segment(packet, reverse, t_near, t_far);
    stats.node_visits += 1;

    if rejected(packet, t_near, t_far, ordered) {
        return;
    }

    if node.is_leaf() {
        intersection_test(node.geom_index() as usize, packet);
        stats.triangle_tests += 1;
        return;
    }

    let (first, second) = child_order(reverse, node.split_axis(), node.child_id(), ordered);
    traverse_recursive(nodes, first, packet, reverse, t_near, t_far, ordered, intersection_test, stats);
    traverse_recursive(nodes, second, packet, reverse, t_near, t_far, ordered, intersection_test, stats);
}
