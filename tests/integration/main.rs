//! Integration tests for the scan pipeline.

mod mocks;
mod scan_scenarios;
