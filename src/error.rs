use core::fmt;

use thiserror::Error;

/// Failure to insert an element. The element is handed back to the caller,
/// ownership only moves into the list on success.
#[derive(Error, PartialEq, Eq)]
pub enum InsertError<T> {
    /// The node for the element could not be allocated
    #[error("failed to allocate list node")]
    AllocFailed(T),
    /// The list lock was not acquired within the given timeout
    #[error("timed out waiting for list lock")]
    Timeout(T),
}

impl<T> InsertError<T> {
    /// Get back the element that was not inserted.
    pub fn into_inner(self) -> T {
        match self {
            InsertError::AllocFailed(elt) | InsertError::Timeout(elt) => elt,
        }
    }
}

// like std's SendError, don't require T: Debug
impl<T> fmt::Debug for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::AllocFailed(_) => f.write_str("AllocFailed(..)"),
            InsertError::Timeout(_) => f.write_str("Timeout(..)"),
        }
    }
}

/// The list lock was not acquired within the given timeout.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("timed out waiting for list lock")]
pub struct LockTimeout;
