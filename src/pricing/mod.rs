// Pricing module - market data lookup behind a swappable source

pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;

pub use yahoo::YahooSource;

/// One daily closing price observation.
#[derive(Debug, Clone, Serialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Abstraction over the external market-data service.
///
/// The production implementation talks to Yahoo Finance; tests substitute
/// an in-memory source. Absence of data for an unknown or delisted
/// instrument is a normal outcome (empty series), not an error; errors are
/// reserved for transport and API failures. Callers that can degrade
/// gracefully catch both and fall back to a deterministic value.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Daily closing prices over an inclusive date range, ascending by date.
    async fn closes_between(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyClose>>;

    /// Most recent close within a window, if any.
    async fn latest_close_in(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Decimal>> {
        let closes = self.closes_between(symbol, from, to).await?;
        Ok(closes.last().map(|p| p.close))
    }
}
