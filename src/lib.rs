//! Polyscout — AI-Powered Prediction Market Edge Scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod platforms;
pub mod llm;
pub mod alerts;
pub mod engine;
pub mod portfolio;
pub mod heartbeat;
