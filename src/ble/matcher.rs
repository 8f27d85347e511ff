//! Decides whether an advertisement is the device we are after.

use super::Advertisement;
use crate::types::DeviceAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetMatcher {
    target: DeviceAddress,
}

impl TargetMatcher {
    pub fn new(target: DeviceAddress) -> Self {
        Self { target }
    }

    pub fn target(&self) -> DeviceAddress {
        self.target
    }

    /// Manufacturer filtering already happened in the transport, so only
    /// connectability and the address are checked here.
    pub fn matches<D>(&self, advertisement: &Advertisement<D>) -> bool {
        advertisement.connectable && advertisement.address == self.target
    }
}
