//! Last-value observable connection state.

use crate::types::ConnectionState;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use log::{debug, info};
use std::sync::atomic::{AtomicU8, Ordering};

/// Receives every state an attempt produces.
pub trait StateSink {
    fn emit(&self, state: ConnectionState);
}

impl<F> StateSink for F
where
    F: Fn(ConnectionState),
{
    fn emit(&self, state: ConnectionState) {
        self(state)
    }
}

/// Single-writer, many-reader register. Reads never block; a slow observer
/// only ever sees the newest value.
pub struct StateRegister {
    current: AtomicU8,
    changed: Signal<CriticalSectionRawMutex, ConnectionState>,
}

impl Default for StateRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl StateRegister {
    pub const fn new() -> Self {
        Self {
            current: AtomicU8::new(ConnectionState::Idle as u8),
            changed: Signal::new(),
        }
    }

    pub fn current(&self) -> ConnectionState {
        ConnectionState::from_repr(self.current.load(Ordering::Acquire))
            .unwrap_or(ConnectionState::Idle)
    }

    /// Wait for the next write. Writes that land before the observer wakes
    /// collapse into the latest one.
    pub async fn next_change(&self) -> ConnectionState {
        self.changed.wait().await
    }
}

impl StateSink for StateRegister {
    fn emit(&self, state: ConnectionState) {
        let previous = self.current.swap(state as u8, Ordering::AcqRel);
        if previous != state as u8 {
            info!("Connection state updated: {:?}", state);
        } else {
            debug!("Connection state rewritten: {:?}", state);
        }
        self.changed.signal(state);
    }
}
