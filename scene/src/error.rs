use bvh::BuildError;
use thiserror::Error;

use crate::config::SceneKind;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene contains no triangles")]
    EmptyScene,
    #[error("{0} is not supported yet")]
    Unsupported(SceneKind),
    #[error("unknown scene type: {0:?}")]
    UnknownKind(String),
    #[error("could not build hierarchy: {0}")]
    Build(#[from] BuildError),
    #[error("cached hierarchy covers {cached} triangles, scene has {actual}")]
    CacheMismatch { cached: usize, actual: usize },
    #[error("cached hierarchy is unusable: {0}")]
    InvalidCache(String),
    #[cfg(feature = "object_caching")]
    #[error("cache i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "object_caching")]
    #[error("cache (de)serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;
