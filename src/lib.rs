pub mod acquisition;
pub mod ble;
pub mod display;
pub mod system;
pub mod types;

pub use acquisition::{AttemptError, ConnectionOrchestrator};
pub use system::{Activation, AttemptSupervisor, StateRegister, StateSink};
pub use types::*;
