//! Registry error types
//!
//! Error types for track registry operations.

use crate::rtc::RtcError;

use super::track::TrackId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The remote track's codec cannot be forwarded
    CodecUnsupported {
        /// Track the publisher tried to add
        track: TrackId,
        /// MIME type reported by the remote track
        mime_type: String,
    },
    /// The backend failed to allocate the local track
    TrackAllocation(TrackId, RtcError),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::CodecUnsupported { track, mime_type } => {
                write!(f, "Codec unsupported for track {}: {}", track, mime_type)
            }
            RegistryError::TrackAllocation(track, err) => {
                write!(f, "Failed to allocate track {}: {}", track, err)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
