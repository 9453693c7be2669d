//! Domain types

pub mod types;
