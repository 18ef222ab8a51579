//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Every slot is taken
    #[error("registry full: {capacity} clients already registered")]
    CapacityExceeded { capacity: usize },
}
