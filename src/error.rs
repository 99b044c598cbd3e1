//! Status outcomes shared by every container.

use thiserror::Error;

/// Legacy status code for a completed operation.
pub const SUCCESS: i32 = 0;

/// Failure (or no-op) outcome of a fallible container operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Error)]
pub enum StashError {
    /// Nothing to do: the container was empty or already at the target shape.
    #[error("container is empty or already at target")]
    Empty,
    #[error("key already present")]
    KeyExists,
    #[error("key not found")]
    KeyNotFound,
    #[error("index out of bounds")]
    OutOfBounds,
    /// Allocation failed, or the container record is not usable.
    #[error("out of memory")]
    OutOfMemory,
}

impl StashError {
    /// Small signed status code, compatible with byte-level callers.
    ///
    /// Negative codes are failures; positive codes are benign no-ops.
    pub const fn code(self) -> i32 {
        match self {
            StashError::KeyNotFound => -3,
            StashError::OutOfBounds => -2,
            StashError::OutOfMemory => -1,
            StashError::Empty => 1,
            StashError::KeyExists => 2,
        }
    }
}

pub type Result<T, E = StashError> = core::result::Result<T, E>;

/// Collapses a result into its status code.
pub fn status<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_legacy_values() {
        assert_eq!(StashError::KeyNotFound.code(), -3);
        assert_eq!(StashError::OutOfBounds.code(), -2);
        assert_eq!(StashError::OutOfMemory.code(), -1);
        assert_eq!(StashError::Empty.code(), 1);
        assert_eq!(StashError::KeyExists.code(), 2);
        assert_eq!(status(&Ok::<_, StashError>(())), SUCCESS);
        assert_eq!(status::<()>(&Err(StashError::Empty)), 1);
    }

    #[test]
    fn display_is_lowercase_message() {
        assert_eq!(StashError::KeyExists.to_string(), "key already present");
        assert_eq!(StashError::OutOfMemory.to_string(), "out of memory");
    }
}
