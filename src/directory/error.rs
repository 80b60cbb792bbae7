//! Directory error types

/// Error type for room lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No room is mapped to the public identifier
    NotFound(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::NotFound(id) => write!(f, "Room not found: {}", id),
        }
    }
}

impl std::error::Error for DirectoryError {}
