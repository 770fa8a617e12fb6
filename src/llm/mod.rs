//! LLM integration for edge detection.
//!
//! Defines the `EdgeAnalyzer` trait and the OpenRouter implementation.

pub mod openrouter;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{EdgeAnalysis, Market};

/// Abstraction over AI market analyzers.
///
/// Implementors send a market's question and odds to a reasoning
/// service and parse an edge assessment from the response.
#[async_trait]
pub trait EdgeAnalyzer: Send + Sync {
    /// Analyze a single market for a potential mispricing.
    async fn analyze(&self, market: &Market) -> Result<EdgeAnalysis>;

    /// Model identifier string.
    fn model_name(&self) -> &str;
}
