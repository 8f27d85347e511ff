use std::fmt;

/// Platform capability a scan or connect needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Scan,
    Connect,
}

/// Failures surfaced by a BLE transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The platform refused the scan or connect grant.
    Unauthorized(Permission),
    /// The transport gave up waiting on the radio.
    Timeout,
    /// The radio is switched off.
    PoweredOff,
    /// The handle refers to a transport object that no longer exists.
    DeadObject,
    /// An established link went away.
    Disconnected,
    ConnectionFailed(String),
    /// The advertisement stream closed underneath the caller.
    ScanEnded,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Unauthorized(Permission::Scan) => write!(f, "BLE scan permission denied"),
            TransportError::Unauthorized(Permission::Connect) => {
                write!(f, "BLE connect permission denied")
            }
            TransportError::Timeout => write!(f, "BLE operation timed out"),
            TransportError::PoweredOff => write!(f, "Bluetooth radio is off"),
            TransportError::DeadObject => write!(f, "Transport object is dead"),
            TransportError::Disconnected => write!(f, "Link disconnected"),
            TransportError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::ScanEnded => write!(f, "Scan ended unexpectedly"),
        }
    }
}

impl std::error::Error for TransportError {}
