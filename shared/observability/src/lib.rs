//! Observability for the auth core.
//!
//! - Tracing subscriber setup with JSON or pretty output
//! - Structured auth domain events (registration, login, token checks)

pub mod domain_events;
pub mod init;

pub use domain_events::*;
pub use init::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};
