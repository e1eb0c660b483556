use bvh::TraversalConfig;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::SceneError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneKind {
    /// Hierarchy of full bounding boxes.
    Bvh,
    /// Hierarchy of single slabs.
    Ssh,
    /// Recognized but not implemented; creating one fails.
    Kd,
    /// Linear scan over every triangle.
    Simple,
}

impl Display for SceneKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SceneKind::Bvh => "BVH",
            SceneKind::Ssh => "SSH",
            SceneKind::Kd => "kd-tree",
            SceneKind::Simple => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for SceneKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bvh" => Ok(SceneKind::Bvh),
            "ssh" => Ok(SceneKind::Ssh),
            "kd" | "kd-tree" => Ok(SceneKind::Kd),
            "none" | "simple" => Ok(SceneKind::Simple),
            _ => Err(SceneError::UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub kind: SceneKind,
    pub traversal: TraversalConfig,
    /// Compute construction diagnostics such as the slab surface ratio.
    pub collect_stats: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            kind: SceneKind::Bvh,
            traversal: TraversalConfig::default(),
            collect_stats: true,
        }
    }
}

impl SceneConfig {
    pub fn new(kind: SceneKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_traversal(mut self, traversal: TraversalConfig) -> Self {
        self.traversal = traversal;
        self
    }
}
