pub mod aabb;
pub mod build;
pub mod bvh_node;
pub mod error;
pub mod hierarchy;
pub mod node;
pub mod ray;
pub mod simd;
pub mod ssh_node;
pub mod traversal;

pub use aabb::*;
pub use build::*;
pub use bvh_node::*;
pub use error::*;
pub use hierarchy::*;
pub use node::*;
pub use ray::*;
pub use ssh_node::*;
pub use traversal::*;
