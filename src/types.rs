use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Observable phase of the acquisition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Scanning = 1,
    Connecting = 2,
    Connected = 3,
    Reconnecting = 4,
    Reconnected = 5,
    Cancelled = 6,
    Timeout = 7,
    SecurityFailure = 8,
    Failure = 9,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 10] = [
        ConnectionState::Idle,
        ConnectionState::Scanning,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Reconnecting,
        ConnectionState::Reconnected,
        ConnectionState::Cancelled,
        ConnectionState::Timeout,
        ConnectionState::SecurityFailure,
        ConnectionState::Failure,
    ];

    /// Terminal states end an attempt; a held-open connection is not terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionState::Cancelled
                | ConnectionState::Timeout
                | ConnectionState::SecurityFailure
                | ConnectionState::Failure
        )
    }

    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Reconnected)
    }

    /// Text shown by the status view.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Scanning => "Scanning...",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Cancelled => "Cancelled",
            ConnectionState::Reconnecting => "Reconnecting...",
            ConnectionState::Reconnected => "Reconnected",
            ConnectionState::Timeout => "Timeout",
            ConnectionState::Failure => "Exception occurred",
            ConnectionState::SecurityFailure => "Security Exception",
        }
    }

    pub(crate) fn from_repr(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 48-bit BLE device address, written `AA:BB:CC:DD:EE:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParseError(String);

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid BLE address: {:?}", self.0)
    }
}

impl std::error::Error for AddressParseError {}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| AddressParseError(s.to_string()))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| AddressParseError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceAddress> for String {
    fn from(address: DeviceAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

pub const DEFAULT_TARGET_ADDRESS: DeviceAddress =
    DeviceAddress::new([0xF4, 0x37, 0xB6, 0x19, 0x89, 0xAC]);
pub const DEFAULT_MANUFACTURER_ID: u16 = 1529;
