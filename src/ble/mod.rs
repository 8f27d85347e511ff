//! Transport seam between the acquisition core and a BLE stack.
//!
//! The core only needs three things from a radio: a scan that yields
//! advertisements, a connect that yields a session, and a way to give the
//! session back. Anything else (GATT, bonding) stays on the other side.

pub mod error;
pub mod matcher;
pub mod simulated;

pub use error::{Permission, TransportError};
pub use matcher::TargetMatcher;
pub use simulated::{SimulatedDevice, SimulatedRadio};

use crate::types::DeviceAddress;

/// Transport-level filter narrowing which advertisements get delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFilter {
    pub manufacturer_id: u16,
}

impl ScanFilter {
    pub const fn manufacturer(manufacturer_id: u16) -> Self {
        Self { manufacturer_id }
    }

    pub fn accepts<D>(&self, advertisement: &Advertisement<D>) -> bool {
        advertisement.manufacturer_id == Some(self.manufacturer_id)
    }
}

/// One received advertisement.
#[derive(Debug, Clone)]
pub struct Advertisement<D> {
    pub device: D,
    pub address: DeviceAddress,
    pub connectable: bool,
    pub manufacturer_id: Option<u16>,
    pub name: Option<String>,
}

/// A BLE radio able to scan and open connections.
#[allow(async_fn_in_trait)]
pub trait BleTransport {
    type Device;
    type Scan: AdvertisementStream<Device = Self::Device>;
    type Session: ConnectionSession;

    /// Start scanning. Dropping the returned stream stops the radio scan.
    fn scan(&self, filter: &ScanFilter) -> Result<Self::Scan, TransportError>;

    async fn connect(&self, device: &Self::Device) -> Result<Self::Session, TransportError>;
}

/// Lazy, non-restartable sequence of advertisements.
#[allow(async_fn_in_trait)]
pub trait AdvertisementStream {
    type Device;

    async fn next(&mut self) -> Result<Advertisement<Self::Device>, TransportError>;
}

/// Live handle to an established connection.
#[allow(async_fn_in_trait)]
pub trait ConnectionSession {
    /// Free the radio resources behind this session.
    fn release(&mut self) -> Result<(), TransportError>;

    /// Resolves once the link is lost.
    async fn closed(&mut self) -> TransportError;
}
