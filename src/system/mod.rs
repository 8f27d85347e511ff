pub mod config;
pub mod lifecycle;
pub mod state;
pub mod supervisor;

pub use config::*;
pub use lifecycle::*;
pub use state::*;
pub use supervisor::*;
