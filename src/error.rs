//! Unified error type for the bootstrap firmware.
//!
//! Every fatal bootstrap failure funnels into [`Error`], so the orchestrator
//! can return a single type and the binary can decide how to idle.  All
//! variants are `Copy`; the wrapped subsystem errors live next to the port
//! or module that produces them.

use core::fmt;

use crate::app::ports::{LinkError, ProtocolError, StorageError};
use crate::config::ConfigError;
use crate::identity::IdentityError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible bootstrap step funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persistent key-value storage could not be initialised or accessed.
    Storage(StorageError),
    /// The link driver refused to start or reported a hard failure.
    Link(LinkError),
    /// The protocol client failed to initialise, start or connect.
    Protocol(ProtocolError),
    /// Device identity strings did not fit their buffers.
    Identity(IdentityError),
    /// Configuration is invalid.
    Config(ConfigError),
    /// A runtime resource (thread, channel) could not be allocated.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Identity(e) => write!(f, "identity: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
