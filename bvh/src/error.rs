use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("cannot build a hierarchy over zero primitives")]
    Empty,
    #[error("{count} primitives exceed the node index capacity of {max}")]
    TooManyPrimitives { count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, BuildError>;
