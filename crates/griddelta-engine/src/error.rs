use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Deliberately narrow: fetch failures are recovered inside the engine
/// (logged, degraded to empty results) and budget exhaustion is a normal
/// termination condition reflected in result counts. What remains is caller
/// programming errors, which fail fast.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A `DatasetState` violates an invariant only state capture should be
    /// able to guarantee (e.g. duplicate sheet ids).
    #[error("malformed dataset state: {0}")]
    MalformedState(String),
}

pub type Result<T> = std::result::Result<T, DiffError>;
