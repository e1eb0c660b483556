use bvh::{Aabb, Bounds, Hierarchy, HierarchyNode, TraversalConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::objects::Triangle;
use crate::{HierarchyScene, Result, SceneError, SceneNode};

pub trait SerializableObject<T: Serialize + DeserializeOwned> {
    fn serialize<S: AsRef<Path>>(&self, path: S) -> Result<()>;
    fn deserialize<S: AsRef<Path>>(path: S) -> Result<T>;
}

impl<N> SerializableObject<Hierarchy<N>> for Hierarchy<N>
where
    N: HierarchyNode + Serialize + DeserializeOwned,
{
    fn serialize<S: AsRef<Path>>(&self, path: S) -> Result<()> {
        let encoded: Vec<u8> = bincode::serialize(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(encoded.as_ref())?;
        Ok(())
    }

    fn deserialize<S: AsRef<Path>>(path: S) -> Result<Hierarchy<N>> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let object: Hierarchy<N> = bincode::deserialize_from(reader)?;
        Ok(object)
    }
}

/// Rejects node arrays a traversal could not walk: the array must hold
/// `2N - 1` nodes, children must follow their parent and stay in range, and
/// leaves must reference existing triangles.
fn check_links<N: HierarchyNode>(hierarchy: &Hierarchy<N>, prim_count: usize) -> Result<()> {
    let nodes = hierarchy.nodes();
    if nodes.len() != 2 * prim_count - 1 {
        return Err(SceneError::InvalidCache(format!(
            "{} nodes for {} triangles",
            nodes.len(),
            prim_count
        )));
    }

    for (index, node) in nodes.iter().enumerate() {
        if node.is_leaf() {
            if node.geom_index() as usize >= prim_count {
                return Err(SceneError::InvalidCache(format!(
                    "leaf {} references triangle {}",
                    index,
                    node.geom_index()
                )));
            }
        } else {
            let child = node.child_id() as usize;
            if child <= index || child + 1 >= nodes.len() {
                return Err(SceneError::InvalidCache(format!(
                    "node {} references children {} and {}",
                    index,
                    child,
                    child + 1
                )));
            }
        }
    }

    Ok(())
}

impl<N> HierarchyScene<N>
where
    N: SceneNode + Serialize + DeserializeOwned,
{
    /// Writes the built hierarchy. Triangles are not part of the cache.
    pub fn save_hierarchy<S: AsRef<Path>>(&self, path: S) -> Result<()> {
        <Hierarchy<N> as SerializableObject<Hierarchy<N>>>::serialize(&self.hierarchy, path)
    }

    /// Restores a scene from a cached hierarchy built over `triangles`.
    pub fn from_cached<S: AsRef<Path>>(
        path: S,
        triangles: Arc<[Triangle]>,
        traversal: TraversalConfig,
    ) -> Result<Self> {
        if triangles.is_empty() {
            return Err(SceneError::EmptyScene);
        }

        let mut hierarchy = <Hierarchy<N> as SerializableObject<Hierarchy<N>>>::deserialize(path)?;
        if hierarchy.prim_count() != triangles.len() {
            return Err(SceneError::CacheMismatch {
                cached: hierarchy.prim_count(),
                actual: triangles.len(),
            });
        }
        check_links(&hierarchy, triangles.len())?;

        let bounds = triangles
            .iter()
            .fold(Aabb::new(), |bb, t| bb.union_of(&t.bounds()));
        if hierarchy.bounds() != bounds {
            return Err(SceneError::InvalidCache(format!(
                "cached bounds {} differ from scene bounds {}",
                hierarchy.bounds(),
                bounds
            )));
        }

        hierarchy.config = traversal;
        log::debug!("loaded cached {} with {} nodes", N::KIND, hierarchy.node_count());

        let mut scene = HierarchyScene::new(traversal, false);
        scene.hierarchy = hierarchy;
        scene.triangles = triangles;
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scene, SingleSlabHierarchy};
    use bvh::{RayPacket4, SSHNode};
    use glam::*;

    fn fan() -> Arc<[Triangle]> {
        (0..12)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::PI / 6.0;
                let next = angle + std::f32::consts::PI / 6.0;
                Triangle::flat(
                    i,
                    Vec3::ZERO,
                    Vec3::new(angle.cos(), angle.sin(), 0.1 * i as f32),
                    Vec3::new(next.cos(), next.sin(), 0.1 * i as f32),
                )
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn cached_scene_intersects_like_built_one() {
        let path = std::env::temp_dir().join("prt_scene_cache_test.ssh");
        let mut built = SingleSlabHierarchy::new(TraversalConfig::default(), false);
        built.construct(fan()).unwrap();
        built.save_hierarchy(&path).unwrap();

        let cached = SingleSlabHierarchy::from_cached(&path, fan(), TraversalConfig::default()).unwrap();
        assert_eq!(cached.hierarchy().nodes(), built.hierarchy().nodes());
        assert_eq!(cached.bounds(), built.bounds());

        let directions = [
            Vec3::new(0.5, 0.1, -1.0),
            Vec3::new(-0.3, 0.4, -1.0),
            Vec3::new(0.0, -0.6, -1.0),
            Vec3::new(3.0, 3.0, -1.0),
        ];
        let mut a = RayPacket4::from_origin(Vec3::new(0.0, 0.0, 3.0), directions, 1e34);
        let mut b = a;
        built.intersect(&mut a);
        cached.intersect(&mut b);
        assert_eq!(a.hit, b.hit);
        assert_eq!(a.t, b.t);

        let mismatch = SingleSlabHierarchy::from_cached(&path, fan()[..3].to_vec().into(), TraversalConfig::default());
        assert!(matches!(
            mismatch,
            Err(SceneError::CacheMismatch { cached: 12, actual: 3 })
        ));

        std::fs::remove_file(&path).ok();
    }

    /// Same field order as `Hierarchy`, so bincode reads it back as one.
    #[derive(Serialize)]
    struct RawHierarchy<'a> {
        nodes: &'a [SSHNode],
        bounds: Aabb,
        height: usize,
        config: TraversalConfig,
    }

    fn write_raw(path: &Path, nodes: &[SSHNode], built: &SingleSlabHierarchy) {
        let raw = RawHierarchy {
            nodes,
            bounds: built.bounds(),
            height: built.hierarchy().height(),
            config: TraversalConfig::default(),
        };
        std::fs::write(path, bincode::serialize(&raw).unwrap()).unwrap();
    }

    #[test]
    fn broken_child_links_are_rejected() {
        let path = std::env::temp_dir().join("prt_scene_cache_links.ssh");
        let mut built = SingleSlabHierarchy::new(TraversalConfig::default(), false);
        built.construct(fan()).unwrap();

        let mut nodes = built.hierarchy().nodes().to_vec();
        write_raw(&path, &nodes, &built);
        assert!(SingleSlabHierarchy::from_cached(&path, fan(), TraversalConfig::default()).is_ok());

        // second child would sit past the end of the array
        nodes[0].set_inner(nodes.len() as u32 - 1);
        write_raw(&path, &nodes, &built);
        let result = SingleSlabHierarchy::from_cached(&path, fan(), TraversalConfig::default());
        assert!(matches!(result, Err(SceneError::InvalidCache(_))));

        // child pointing back at its parent
        let mut nodes = built.hierarchy().nodes().to_vec();
        let child = nodes[0].child_id() as usize;
        if !nodes[child].is_leaf() {
            nodes[child].set_inner(0);
        } else {
            nodes[child].set_leaf(12);
        }
        write_raw(&path, &nodes, &built);
        let result = SingleSlabHierarchy::from_cached(&path, fan(), TraversalConfig::default());
        assert!(matches!(result, Err(SceneError::InvalidCache(_))));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn cache_of_other_scene_is_rejected() {
        let path = std::env::temp_dir().join("prt_scene_cache_other.ssh");
        let mut built = SingleSlabHierarchy::new(TraversalConfig::default(), false);
        built.construct(fan()).unwrap();
        built.save_hierarchy(&path).unwrap();

        let moved: Arc<[Triangle]> = fan()
            .iter()
            .map(|t| {
                let [a, b, c] = t.vertices();
                let offset = Vec3::new(5.0, 0.0, 0.0);
                Triangle::flat(t.material, a + offset, b + offset, c + offset)
            })
            .collect::<Vec<_>>()
            .into();

        let result = SingleSlabHierarchy::from_cached(&path, moved, TraversalConfig::default());
        assert!(matches!(result, Err(SceneError::InvalidCache(_))));

        let empty = SingleSlabHierarchy::from_cached(&path, Vec::new().into(), TraversalConfig::default());
        assert!(matches!(empty, Err(SceneError::EmptyScene)));

        std::fs::remove_file(&path).ok();
    }
}
