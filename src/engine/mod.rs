//! Scan engine.
//!
//! `scanner` runs the per-market analysis and alert pipeline;
//! `scheduler` drives it on a fixed interval with serialized runs.

pub mod scanner;
pub mod scheduler;
