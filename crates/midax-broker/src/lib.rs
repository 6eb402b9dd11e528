//! Execution boundaries.

mod paper;

pub use paper::{Deal, PaperBroker};
