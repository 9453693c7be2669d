//! Utility modules

pub mod logging;
pub mod metrics;
pub mod workspace;
