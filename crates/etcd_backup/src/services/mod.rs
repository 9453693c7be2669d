//! Pipeline stages and their orchestration

pub mod archiver;
pub mod orchestrator;
pub mod snapshot;
