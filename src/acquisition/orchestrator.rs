//! Connection orchestrator: one scan → connect → hold-open attempt.
//!
//! An attempt runs until it reaches a terminal outcome or until the
//! `cancelled` future handed in by the owning scope resolves. Cancellation
//! drops the in-progress sequence at whatever await point it is parked on
//! (scan, connect or held open), which closes the scan and releases the
//! session before the terminal state is published.

use super::error::AttemptError;
use super::session::HeldSession;
use crate::ble::{AdvertisementStream, BleTransport, ScanFilter, TargetMatcher};
use crate::system::config::{AcquisitionConfig, ConfigManager};
use crate::system::state::StateSink;
use crate::types::{ConnectionState, DeviceAddress};
use core::future::Future;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex};
use embassy_time::with_timeout;
use log::{debug, error, info, warn};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ConnectionOrchestrator<T: BleTransport> {
    transport: T,
    config: ConfigManager,
    remembered: BlockingMutex<CriticalSectionRawMutex, Cell<Option<DeviceAddress>>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl<T: BleTransport> ConnectionOrchestrator<T> {
    pub fn new(transport: T, config: ConfigManager) -> Self {
        Self {
            transport,
            config,
            remembered: BlockingMutex::new(Cell::new(None)),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Address of the last device a scan matched, if any.
    pub fn remembered_target(&self) -> Option<DeviceAddress> {
        self.remembered.lock(|cell| cell.get())
    }

    fn remember(&self, address: DeviceAddress) {
        self.remembered.lock(|cell| cell.set(Some(address)));
    }

    pub fn attempts_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_attempts_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Run one attempt and report every transition to `sink`.
    ///
    /// Returns the reason the attempt ended; the matching terminal state has
    /// already been emitted by then. Nothing is retried here.
    pub async fn run_attempt<S, C>(&self, reconnection: bool, sink: &S, cancelled: C) -> AttemptError
    where
        S: StateSink + ?Sized,
        C: Future<Output = ()>,
    {
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);
        let reporter = Reporter::new(sink);

        if reconnection {
            info!(
                "🔄 Reconnecting to device with address: {:?}",
                self.remembered_target()
            );
            reporter.emit(ConnectionState::Reconnecting);
        } else {
            info!("🔍 Starting new connection");
            reporter.emit(ConnectionState::Scanning);
        }

        let outcome = match select(self.acquire_and_hold(reconnection, &reporter), cancelled).await {
            Either::First(error) => error,
            Either::Second(()) => AttemptError::Cancelled,
        };

        match &outcome {
            AttemptError::Cancelled => info!("Attempt cancelled"),
            AttemptError::Unauthorized => error!("🚫 {}", outcome),
            other => warn!("❌ Attempt ended: {}", other),
        }
        reporter.emit(outcome.terminal_state());
        outcome
    }

    async fn acquire_and_hold<S>(&self, reconnection: bool, reporter: &Reporter<'_, S>) -> AttemptError
    where
        S: StateSink + ?Sized,
    {
        let config = self.config.get_config().await;

        let acquired = match config.attempt_timeout() {
            Some(limit) => {
                match with_timeout(limit, self.scan_and_connect(&config, reconnection, reporter)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("⏱️ No connection within {}ms", limit.as_millis());
                        Err(AttemptError::DeadlineExceeded)
                    }
                }
            }
            None => self.scan_and_connect(&config, reconnection, reporter).await,
        };

        let mut session = match acquired {
            Ok(session) => session,
            Err(error) => return error,
        };

        reporter.emit(if reconnection {
            ConnectionState::Reconnected
        } else {
            ConnectionState::Connected
        });
        info!("✅ Connected to {} - holding connection open", config.target_address);

        let lost = session.hold_open().await;
        warn!("Connection to {} lost: {}", config.target_address, lost);
        AttemptError::from(lost)
    }

    async fn scan_and_connect<S>(
        &self,
        config: &AcquisitionConfig,
        reconnection: bool,
        reporter: &Reporter<'_, S>,
    ) -> Result<HeldSession<T::Session>, AttemptError>
    where
        S: StateSink + ?Sized,
    {
        let filter = ScanFilter::manufacturer(config.manufacturer_id);
        let matcher = TargetMatcher::new(config.target_address);

        let mut scan = self.transport.scan(&filter)?;
        reporter.emit(ConnectionState::Scanning);

        let advertisement = loop {
            let advertisement = scan.next().await?;
            debug!(
                "Scan found device {} ({})",
                advertisement.name.as_deref().unwrap_or("<unnamed>"),
                advertisement.address
            );
            if matcher.matches(&advertisement) {
                break advertisement;
            }
            debug!("Found other device - continuing scan");
        };
        // first match ends the scan
        drop(scan);

        info!("🎯 Found our device {}", advertisement.address);
        self.remember(advertisement.address);
        reporter.emit(if reconnection {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        });

        let session = self.transport.connect(&advertisement.device).await?;
        Ok(HeldSession::new(session))
    }
}

/// Forwards states to the sink, dropping a repeat of the previous one.
///
/// A fresh attempt announces `Scanning` on start and again once the scan is
/// open. Observers of the register only see the latest value, but a sink that
/// records every emission (a log, a history strip) would show the phase twice.
struct Reporter<'a, S: StateSink + ?Sized> {
    sink: &'a S,
    last: Cell<Option<ConnectionState>>,
}

impl<'a, S: StateSink + ?Sized> Reporter<'a, S> {
    fn new(sink: &'a S) -> Self {
        Self {
            sink,
            last: Cell::new(None),
        }
    }

    fn emit(&self, state: ConnectionState) {
        if self.last.replace(Some(state)) == Some(state) {
            return;
        }
        self.sink.emit(state);
    }
}

struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        if now > 1 {
            error!("{} attempts in flight at once", now);
        }
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
