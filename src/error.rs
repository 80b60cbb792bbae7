//! Crate-wide error type
//!
//! Each module owns its error enum; [`Error`] wraps them for callers that
//! cross module boundaries (signaling sessions, the HTTP listener).

use crate::directory::DirectoryError;
use crate::peer::WriteError;
use crate::registry::RegistryError;
use crate::rtc::RtcError;
use crate::session::SignalError;
use crate::transport::TransportError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or listener error
    Io(std::io::Error),
    /// WebRTC engine error
    Rtc(RtcError),
    /// Track registry error
    Registry(RegistryError),
    /// Malformed signaling message
    Signal(SignalError),
    /// Signaling transport error
    Transport(TransportError),
    /// Room lookup error
    Directory(DirectoryError),
    /// Signaling write error
    Write(WriteError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Rtc(e) => write!(f, "{}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Signal(e) => write!(f, "{}", e),
            Error::Transport(e) => write!(f, "{}", e),
            Error::Directory(e) => write!(f, "{}", e),
            Error::Write(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Rtc(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Signal(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Directory(e) => Some(e),
            Error::Write(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<RtcError> for Error {
    fn from(err: RtcError) -> Self {
        Error::Rtc(err)
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Error::Registry(err)
    }
}

impl From<SignalError> for Error {
    fn from(err: SignalError) -> Self {
        Error::Signal(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err)
    }
}

impl From<DirectoryError> for Error {
    fn from(err: DirectoryError) -> Self {
        Error::Directory(err)
    }
}

impl From<WriteError> for Error {
    fn from(err: WriteError) -> Self {
        Error::Write(err)
    }
}
