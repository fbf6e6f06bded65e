//! Port traits: the boundary between the bootstrap core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator / ConnectivityMonitor
//! ```
//!
//! The radio driver, the protocol client and the key-value store are
//! external collaborators.  The core consumes them through these traits via
//! generics, so it never touches ESP-IDF directly and runs unchanged
//! against the simulation adapters and the test mocks.

use core::fmt;

use crate::app::protocol::ProtocolBootstrapAdapter;
use crate::config::BootstrapConfig;
use crate::events::LinkEventSender;
use crate::identity::{DeviceIdentity, MacAddress};

// ───────────────────────────────────────────────────────────────
// Link driver (driven adapter: core → radio)
// ───────────────────────────────────────────────────────────────

/// Wi-Fi station driver.
///
/// Events flow back asynchronously through the [`LinkEventSender`] handed
/// to [`start`](LinkDriver::start); no method here waits for the link.
pub trait LinkDriver {
    /// Bring the radio up in station mode.  The driver posts
    /// [`LinkEvent::Started`](crate::events::LinkEvent::Started) once ready.
    fn start(&mut self, events: LinkEventSender) -> Result<(), LinkError>;

    /// Request association with the configured access point.
    fn connect(&mut self) -> Result<(), LinkError>;

    /// Station-interface hardware address.
    fn mac_address(&self) -> Result<MacAddress, LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Protocol client (driven adapter: core → MQTT/Homie stack)
// ───────────────────────────────────────────────────────────────

/// Device-management protocol client.
///
/// Lifecycle events are delivered to the [`ProtocolBootstrapAdapter`]
/// passed to [`init`](ProtocolClient::init); the adapter's verdict is
/// returned to the client's own dispatcher.
pub trait ProtocolClient {
    /// Configured-but-not-running client.
    type Handle;
    /// Running client; dropping it stops the client.
    type Session;

    fn init(
        &mut self,
        config: &BootstrapConfig,
        identity: &DeviceIdentity,
        events: ProtocolBootstrapAdapter,
    ) -> Result<Self::Handle, ProtocolError>;

    fn start(&mut self, handle: Self::Handle) -> Result<Self::Session, ProtocolError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: core ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// [`init`](StoragePort::init) must succeed before any other call; the
/// other methods return [`StorageError::NotInitialised`] until then.
/// Keys are namespaced to prevent collisions between subsystems.
pub trait StoragePort {
    /// Initialise the backing partition, erasing it if its layout is stale.
    fn init(&mut self) -> Result<(), StorageError>;

    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`LinkDriver`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Radio driver could not be created or configured.
    DriverInit,
    /// `start` was called twice.
    AlreadyStarted,
    /// `connect` before `start`.
    NotStarted,
    /// The driver rejected the connect request.
    ConnectRejected,
    /// The hardware address could not be read.
    MacUnavailable,
}

/// Errors from [`ProtocolClient`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    InitFailed,
    StartFailed,
    /// The bounded protocol-readiness wait ran out of attempts.
    ConnectTimeout,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Partition could not be initialised.
    InitFailed,
    /// Accessed before [`StoragePort::init`].
    NotInitialised,
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DriverInit => write!(f, "WiFi driver init failed"),
            Self::AlreadyStarted => write!(f, "WiFi already started"),
            Self::NotStarted => write!(f, "WiFi not started"),
            Self::ConnectRejected => write!(f, "connect request rejected"),
            Self::MacUnavailable => write!(f, "MAC address unavailable"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed => write!(f, "protocol client init failed"),
            Self::StartFailed => write!(f, "protocol client start failed"),
            Self::ConnectTimeout => write!(f, "gave up waiting for broker connection"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed => write!(f, "storage init failed"),
            Self::NotInitialised => write!(f, "storage not initialised"),
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
