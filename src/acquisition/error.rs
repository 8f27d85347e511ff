use crate::ble::TransportError;
use crate::types::ConnectionState;
use std::fmt;

/// Why an attempt ended. Every variant maps to exactly one terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    Unauthorized,
    DeadlineExceeded,
    Cancelled,
    Transport(TransportError),
}

impl AttemptError {
    pub fn terminal_state(&self) -> ConnectionState {
        match self {
            AttemptError::Unauthorized => ConnectionState::SecurityFailure,
            AttemptError::DeadlineExceeded => ConnectionState::Timeout,
            AttemptError::Cancelled => ConnectionState::Cancelled,
            AttemptError::Transport(_) => ConnectionState::Failure,
        }
    }
}

impl From<TransportError> for AttemptError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unauthorized(_) => AttemptError::Unauthorized,
            TransportError::Timeout => AttemptError::DeadlineExceeded,
            other => AttemptError::Transport(other),
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttemptError::Unauthorized => write!(f, "Bluetooth permission not granted"),
            AttemptError::DeadlineExceeded => write!(f, "Attempt deadline exceeded"),
            AttemptError::Cancelled => write!(f, "Attempt cancelled"),
            AttemptError::Transport(e) => write!(f, "Transport failure: {}", e),
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Transport(e) => Some(e),
            _ => None,
        }
    }
}
