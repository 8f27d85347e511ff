//! Owns the scope an attempt runs in.
//!
//! The host only toggles an [`Activation`] handle. The supervisor turns each
//! level it observes into a gate event and runs at most one attempt per
//! active period; the next attempt cannot start before the previous
//! `run_attempt` future has returned, so two attempts never overlap.

use super::lifecycle::{GateAction, GatePhase, LifecycleEvent, LifecycleGate};
use super::state::StateRegister;
use crate::acquisition::{AttemptError, ConnectionOrchestrator};
use crate::ble::BleTransport;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use log::{debug, info};
use std::sync::Arc;

/// Latest host level. A burst of toggles collapses into the last value; the
/// gate ignores a level that matches the phase it is already in.
pub type ActivationLevel = Signal<CriticalSectionRawMutex, bool>;

/// Host-side switch for the active period.
#[derive(Clone)]
pub struct Activation {
    level: Arc<ActivationLevel>,
}

impl Default for Activation {
    fn default() -> Self {
        Self::new()
    }
}

impl Activation {
    pub fn new() -> Self {
        Self {
            level: Arc::new(Signal::new()),
        }
    }

    pub fn set_active(&self, active: bool) {
        debug!("Activation level: {}", if active { "ON" } else { "OFF" });
        self.level.signal(active);
    }

    pub fn activate(&self) {
        self.set_active(true);
    }

    pub fn deactivate(&self) {
        self.set_active(false);
    }

    async fn next_event(&self) -> LifecycleEvent {
        LifecycleEvent::from_edge(self.level.wait().await)
    }
}

pub struct AttemptSupervisor<T: BleTransport> {
    orchestrator: Arc<ConnectionOrchestrator<T>>,
    register: Arc<StateRegister>,
    activation: Activation,
    gate: LifecycleGate,
}

impl<T: BleTransport> AttemptSupervisor<T> {
    pub fn new(
        orchestrator: Arc<ConnectionOrchestrator<T>>,
        register: Arc<StateRegister>,
        activation: Activation,
    ) -> Self {
        Self {
            orchestrator,
            register,
            activation,
            gate: LifecycleGate::new(),
        }
    }

    pub fn phase(&self) -> GatePhase {
        self.gate.phase()
    }

    pub fn attempts_started(&self) -> u32 {
        self.gate.attempts_started()
    }

    /// Serve activation changes forever.
    pub async fn run(&mut self) {
        info!("Attempt supervisor started");
        loop {
            self.step().await;
        }
    }

    /// Consume one level change; if it opens an active period, run that period's
    /// attempt until it is cancelled or ends on its own.
    pub async fn step(&mut self) {
        let event = self.activation.next_event().await;
        if self.gate.apply(event) == GateAction::StartAttempt {
            self.run_active_period().await;
        }
    }

    async fn run_active_period(&mut self) {
        let reconnection = self.orchestrator.remembered_target().is_some();

        let gate = &mut self.gate;
        let activation = &self.activation;
        let cancelled = async move {
            loop {
                let event = activation.next_event().await;
                if gate.apply(event) == GateAction::CancelAttempt {
                    break;
                }
            }
        };

        let outcome = self
            .orchestrator
            .run_attempt(reconnection, &*self.register, cancelled)
            .await;

        if outcome != AttemptError::Cancelled {
            self.gate.apply(LifecycleEvent::AttemptEnded);
        }
    }
}
