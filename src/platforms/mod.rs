//! Market data sources.
//!
//! Defines the `MarketSource` trait and provides the Polymarket Gamma
//! client. The trait exists so the scan engine can be tested against
//! deterministic in-memory sources.

pub mod polymarket;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Market;

/// Abstraction over prediction market data providers.
///
/// Implementors fetch active markets in descending volume order.
/// Read-only; no execution methods belong here.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Fetch up to `limit` active markets, highest volume first.
    async fn fetch_active(&self, limit: usize) -> Result<Vec<Market>>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}
