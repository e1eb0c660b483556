use bvh::{RayPacket4, TraversalStack, TraversalStats};
use rayon::prelude::*;

use crate::Scene;

/// Intersects all `packets` in parallel. Every worker keeps a private
/// traversal stack; the per-packet results equal sequential `intersect` calls.
pub fn intersect_batch<S>(scene: &S, packets: &mut [RayPacket4]) -> TraversalStats
where
    S: Scene + ?Sized,
{
    packets
        .par_iter_mut()
        .map_init(TraversalStack::new, |stack, packet| {
            scene.intersect_with_stack(packet, stack)
        })
        .reduce(TraversalStats::default, |a, b| a + b)
}
