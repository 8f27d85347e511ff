//! In-process BLE radio used by the host demo and the test suite.
//!
//! Advertisements are injected through a channel, the radio can be switched
//! off and on (which invalidates every live session the way a real stack
//! drops its binder objects), grants can be revoked and connects can be made
//! to fail or hang.

use super::{
    Advertisement, AdvertisementStream, BleTransport, ConnectionSession, Permission, ScanFilter,
    TransportError,
};
use crate::types::DeviceAddress;
use embassy_futures::select::{select, Either};
use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex},
    channel::Channel,
};
use embassy_time::{Duration, Timer};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub type AdvertisementChannel =
    Channel<CriticalSectionRawMutex, Advertisement<SimulatedDevice>, 16>;

const RADIO_POLL_MS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedDevice {
    pub address: DeviceAddress,
}

/// What the next connect request does.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectBehavior {
    Accept,
    Fail(TransportError),
    /// Never completes; only cancellation or a deadline gets the caller out.
    Hang,
}

struct RadioInner {
    advertisements: AdvertisementChannel,
    powered: AtomicBool,
    // bumped on every power-off; sessions from an older generation are dead
    generation: AtomicU32,
    scan_granted: AtomicBool,
    connect_granted: AtomicBool,
    connect_behavior: BlockingMutex<CriticalSectionRawMutex, RefCell<ConnectBehavior>>,
    connect_delay_ms: AtomicU64,
    active_scans: AtomicUsize,
    live_sessions: AtomicUsize,
    dead_releases: AtomicUsize,
}

impl RadioInner {
    fn is_current(&self, generation: u32) -> bool {
        self.powered.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

#[derive(Clone)]
pub struct SimulatedRadio {
    inner: Arc<RadioInner>,
}

impl Default for SimulatedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRadio {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RadioInner {
                advertisements: Channel::new(),
                powered: AtomicBool::new(true),
                generation: AtomicU32::new(0),
                scan_granted: AtomicBool::new(true),
                connect_granted: AtomicBool::new(true),
                connect_behavior: BlockingMutex::new(RefCell::new(ConnectBehavior::Accept)),
                connect_delay_ms: AtomicU64::new(0),
                active_scans: AtomicUsize::new(0),
                live_sessions: AtomicUsize::new(0),
                dead_releases: AtomicUsize::new(0),
            }),
        }
    }

    /// Build an advertisement as this radio would report it.
    pub fn advert(
        address: DeviceAddress,
        connectable: bool,
        manufacturer_id: u16,
    ) -> Advertisement<SimulatedDevice> {
        Advertisement {
            device: SimulatedDevice { address },
            address,
            connectable,
            manufacturer_id: Some(manufacturer_id),
            name: None,
        }
    }

    /// Queue an advertisement for delivery to the running scan.
    pub fn advertise(&self, advertisement: Advertisement<SimulatedDevice>) -> bool {
        match self.inner.advertisements.try_send(advertisement) {
            Ok(()) => true,
            Err(_) => {
                warn!("Advertisement queue full - dropping advertisement");
                false
            }
        }
    }

    pub fn power_off(&self) {
        info!("📴 Bluetooth radio off");
        self.inner.powered.store(false, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.live_sessions.store(0, Ordering::SeqCst);
    }

    pub fn power_on(&self) {
        info!("📶 Bluetooth radio on");
        self.inner.powered.store(true, Ordering::SeqCst);
    }

    pub fn is_powered(&self) -> bool {
        self.inner.powered.load(Ordering::SeqCst)
    }

    pub fn set_scan_granted(&self, granted: bool) {
        self.inner.scan_granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_connect_granted(&self, granted: bool) {
        self.inner.connect_granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        self.inner
            .connect_behavior
            .lock(|cell| *cell.borrow_mut() = behavior);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.inner
            .connect_delay_ms
            .store(delay.as_millis(), Ordering::SeqCst);
    }

    pub fn active_scans(&self) -> usize {
        self.inner.active_scans.load(Ordering::SeqCst)
    }

    pub fn live_sessions(&self) -> usize {
        self.inner.live_sessions.load(Ordering::SeqCst)
    }

    /// Releases that hit an already-dead session.
    pub fn dead_releases(&self) -> usize {
        self.inner.dead_releases.load(Ordering::SeqCst)
    }
}

impl BleTransport for SimulatedRadio {
    type Device = SimulatedDevice;
    type Scan = SimulatedScan;
    type Session = SimulatedSession;

    fn scan(&self, filter: &ScanFilter) -> Result<SimulatedScan, TransportError> {
        if !self.is_powered() {
            return Err(TransportError::PoweredOff);
        }
        if !self.inner.scan_granted.load(Ordering::SeqCst) {
            return Err(TransportError::Unauthorized(Permission::Scan));
        }

        // only advertisements received while this scan listens are reported
        self.inner.advertisements.clear();
        self.inner.active_scans.fetch_add(1, Ordering::SeqCst);
        debug!(
            "📡 Scan started (manufacturer id {})",
            filter.manufacturer_id
        );

        Ok(SimulatedScan {
            inner: Arc::clone(&self.inner),
            filter: *filter,
            generation: self.inner.generation.load(Ordering::SeqCst),
        })
    }

    async fn connect(&self, device: &SimulatedDevice) -> Result<SimulatedSession, TransportError> {
        if !self.is_powered() {
            return Err(TransportError::PoweredOff);
        }
        if !self.inner.connect_granted.load(Ordering::SeqCst) {
            return Err(TransportError::Unauthorized(Permission::Connect));
        }

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let delay_ms = self.inner.connect_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            Timer::after(Duration::from_millis(delay_ms)).await;
        }

        let behavior = self.inner.connect_behavior.lock(|cell| cell.borrow().clone());
        match behavior {
            ConnectBehavior::Accept => {
                if !self.inner.is_current(generation) {
                    return Err(TransportError::ConnectionFailed(
                        "radio reset during connect".to_string(),
                    ));
                }
                self.inner.live_sessions.fetch_add(1, Ordering::SeqCst);
                debug!("🔗 Link up with {}", device.address);
                Ok(SimulatedSession {
                    inner: Arc::clone(&self.inner),
                    generation,
                    released: false,
                })
            }
            ConnectBehavior::Fail(error) => Err(error),
            ConnectBehavior::Hang => core::future::pending().await,
        }
    }
}

pub struct SimulatedScan {
    inner: Arc<RadioInner>,
    filter: ScanFilter,
    generation: u32,
}

impl AdvertisementStream for SimulatedScan {
    type Device = SimulatedDevice;

    async fn next(&mut self) -> Result<Advertisement<SimulatedDevice>, TransportError> {
        loop {
            if !self.inner.is_current(self.generation) {
                return Err(TransportError::PoweredOff);
            }

            let poll = Timer::after(Duration::from_millis(RADIO_POLL_MS));
            match select(self.inner.advertisements.receive(), poll).await {
                Either::First(advertisement) => {
                    if self.filter.accepts(&advertisement) {
                        return Ok(advertisement);
                    }
                    debug!(
                        "Dropping advertisement from {} (manufacturer {:?})",
                        advertisement.address, advertisement.manufacturer_id
                    );
                }
                Either::Second(()) => {}
            }
        }
    }
}

impl Drop for SimulatedScan {
    fn drop(&mut self) {
        self.inner.active_scans.fetch_sub(1, Ordering::SeqCst);
        debug!("🛑 Scan stopped");
    }
}

pub struct SimulatedSession {
    inner: Arc<RadioInner>,
    generation: u32,
    released: bool,
}

impl ConnectionSession for SimulatedSession {
    fn release(&mut self) -> Result<(), TransportError> {
        if self.released || !self.inner.is_current(self.generation) {
            self.released = true;
            self.inner.dead_releases.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::DeadObject);
        }

        self.released = true;
        self.inner.live_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn closed(&mut self) -> TransportError {
        loop {
            if self.released || !self.inner.is_current(self.generation) {
                return TransportError::Disconnected;
            }
            Timer::after(Duration::from_millis(RADIO_POLL_MS)).await;
        }
    }
}
