//! Owning wrapper around a transport session.
//!
//! A platform stack can tear a session down on its own (radio toggled off)
//! and the owning scope can then be torn down twice in quick succession.
//! Releasing here is therefore idempotent and never fails: the first call is
//! forwarded, later calls do nothing, and a transport complaint about an
//! already-dead object is logged and swallowed.

use crate::ble::{ConnectionSession, TransportError};
use log::{debug, warn};

pub struct HeldSession<S: ConnectionSession> {
    session: S,
    released: bool,
}

impl<S: ConnectionSession> HeldSession<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if self.released {
            debug!("Session already released - ignoring");
            return;
        }
        self.released = true;

        match self.session.release() {
            Ok(()) => debug!("🔌 Session released"),
            Err(TransportError::DeadObject) => {
                warn!("Session transport already gone - nothing left to release")
            }
            Err(e) => warn!("Failed to release session cleanly: {}", e),
        }
    }

    /// Keep the link up until the transport reports it lost.
    pub async fn hold_open(&mut self) -> TransportError {
        self.session.closed().await
    }
}

impl<S: ConnectionSession> Drop for HeldSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}
