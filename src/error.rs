use thiserror::Error;

/// Errors reported by the container operations. Every failure is synchronous
/// and leaves the structure unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TansuError {
    /// Lookup or removal missed: the key is not present in the table
    #[error("key not found")]
    KeyNotFound,

    /// Peek/poll/pop on a container with no elements
    #[error("container is empty")]
    Empty,

    /// Index past the end of the list (after negative-index resolution)
    #[error("index {0} out of range")]
    IndexOutOfRange(i64),

    /// Insertion with the key type's designated empty value
    #[error("invalid key")]
    InvalidKey,
}

pub type Result<T> = std::result::Result<T, TansuError>;
