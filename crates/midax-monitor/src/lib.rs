//! Logging and session monitoring.

mod logging;
mod phase;

pub use logging::setup_logging;
pub use phase::watch_phases;
