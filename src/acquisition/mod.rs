pub mod error;
pub mod orchestrator;
pub mod session;

pub use error::*;
pub use orchestrator::*;
pub use session::*;
