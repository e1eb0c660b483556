pub mod batch;
pub mod config;
pub mod error;
pub mod hierarchy_scene;
pub mod objects;
pub mod scene;
pub mod simple_scene;

#[cfg(feature = "object_caching")]
pub mod cache;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use hierarchy_scene::*;
pub use objects::*;
pub use scene::*;
pub use simple_scene::*;

#[cfg(feature = "object_caching")]
pub use cache::*;
