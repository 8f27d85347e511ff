//! Activation gate: decides what each host activation edge means.
//!
//! States: inactive, running (an attempt is in flight), settled (still
//! active, but the attempt already ended on its own). A fresh attempt only
//! starts on an off → on edge, never twice within one active period.

use log::{debug, info};
use statig::blocking::IntoStateMachineExt as _;
use statig::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Activated,
    Deactivated,
    AttemptEnded,
}

impl LifecycleEvent {
    pub fn from_edge(active: bool) -> Self {
        if active {
            LifecycleEvent::Activated
        } else {
            LifecycleEvent::Deactivated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    Ignore,
    StartAttempt,
    CancelAttempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Inactive,
    Running,
    Settled,
}

#[derive(Debug)]
struct LifecycleMachine {
    phase: GatePhase,
    attempts_started: u32,
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self {
            phase: GatePhase::Inactive,
            attempts_started: 0,
        }
    }
}

struct DispatchContext {
    action: GateAction,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            action: GateAction::Ignore,
        }
    }
}

#[state_machine(initial = "State::inactive()")]
impl LifecycleMachine {
    #[state]
    fn inactive(&mut self, context: &mut DispatchContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Activated => {
                self.phase = GatePhase::Running;
                self.attempts_started += 1;
                context.action = GateAction::StartAttempt;
                Transition(State::running())
            }
            LifecycleEvent::Deactivated => {
                // second stop for a scope that is already gone
                debug!("Deactivated while inactive - ignoring");
                Handled
            }
            LifecycleEvent::AttemptEnded => Handled,
        }
    }

    #[state]
    fn running(&mut self, context: &mut DispatchContext, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Deactivated => {
                self.phase = GatePhase::Inactive;
                context.action = GateAction::CancelAttempt;
                Transition(State::inactive())
            }
            LifecycleEvent::AttemptEnded => {
                info!("Attempt finished - waiting for next activation");
                self.phase = GatePhase::Settled;
                Transition(State::settled())
            }
            LifecycleEvent::Activated => {
                debug!("Already active - attempt in flight");
                Handled
            }
        }
    }

    #[state]
    fn settled(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Deactivated => {
                self.phase = GatePhase::Inactive;
                Transition(State::inactive())
            }
            _ => Handled,
        }
    }
}

pub struct LifecycleGate {
    machine: statig::blocking::StateMachine<LifecycleMachine>,
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self {
            machine: LifecycleMachine::default().state_machine(),
        }
    }

    pub fn apply(&mut self, event: LifecycleEvent) -> GateAction {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        context.action
    }

    pub fn phase(&self) -> GatePhase {
        self.machine.inner().phase
    }

    pub fn attempts_started(&self) -> u32 {
        self.machine.inner().attempts_started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_starts_attempt() {
        let mut gate = LifecycleGate::new();
        assert_eq!(gate.phase(), GatePhase::Inactive);
        assert_eq!(gate.apply(LifecycleEvent::Activated), GateAction::StartAttempt);
        assert_eq!(gate.phase(), GatePhase::Running);
        assert_eq!(gate.attempts_started(), 1);
    }

    #[test]
    fn test_deactivation_cancels_running_attempt() {
        let mut gate = LifecycleGate::new();
        gate.apply(LifecycleEvent::Activated);
        assert_eq!(gate.apply(LifecycleEvent::Deactivated), GateAction::CancelAttempt);
        assert_eq!(gate.phase(), GatePhase::Inactive);
    }

    #[test]
    fn test_duplicate_deactivation_is_ignored() {
        let mut gate = LifecycleGate::new();
        gate.apply(LifecycleEvent::Activated);
        gate.apply(LifecycleEvent::Deactivated);
        assert_eq!(gate.apply(LifecycleEvent::Deactivated), GateAction::Ignore);
        assert_eq!(gate.apply(LifecycleEvent::Deactivated), GateAction::Ignore);
        assert_eq!(gate.phase(), GatePhase::Inactive);
    }

    #[test]
    fn test_duplicate_activation_does_not_start_second_attempt() {
        let mut gate = LifecycleGate::new();
        gate.apply(LifecycleEvent::Activated);
        assert_eq!(gate.apply(LifecycleEvent::Activated), GateAction::Ignore);
        assert_eq!(gate.attempts_started(), 1);
    }

    #[test]
    fn test_settled_attempt_needs_off_on_cycle() {
        let mut gate = LifecycleGate::new();
        gate.apply(LifecycleEvent::Activated);
        assert_eq!(gate.apply(LifecycleEvent::AttemptEnded), GateAction::Ignore);
        assert_eq!(gate.phase(), GatePhase::Settled);

        assert_eq!(gate.apply(LifecycleEvent::Activated), GateAction::Ignore);
        assert_eq!(gate.apply(LifecycleEvent::Deactivated), GateAction::Ignore);
        assert_eq!(gate.phase(), GatePhase::Inactive);
        assert_eq!(gate.apply(LifecycleEvent::Activated), GateAction::StartAttempt);
        assert_eq!(gate.attempts_started(), 2);
    }

    #[test]
    fn test_edge_mapping() {
        assert_eq!(LifecycleEvent::from_edge(true), LifecycleEvent::Activated);
        assert_eq!(LifecycleEvent::from_edge(false), LifecycleEvent::Deactivated);
    }
}
