use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::pricing::{DailyClose, PriceSource};

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

type RangeKey = (String, NaiveDate, NaiveDate);

/// Price source backed by the Yahoo Finance v8 chart API.
///
/// Keeps an in-process cache keyed by (symbol, from, to) so an identical
/// window is only fetched once per run.
pub struct YahooSource {
    client: Client,
    cache: Mutex<HashMap<RangeKey, Vec<DailyClose>>>,
}

impl YahooSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; FolioBot/1.0)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        info!(
            "Fetching daily closes for {} from {} to {}",
            symbol, from, to
        );

        let from_timestamp = from
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("Invalid from date"))?
            .and_utc()
            .timestamp();

        let to_timestamp = to
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| anyhow!("Invalid to date"))?
            .and_utc()
            .timestamp();

        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            symbol, from_timestamp, to_timestamp
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Yahoo Finance")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Yahoo Finance returned error status: {}",
                response.status()
            ));
        }

        let data: YahooChartResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo Finance response")?;

        if let Some(error) = data.chart.error {
            return Err(anyhow!(
                "Yahoo Finance API error: {} - {}",
                error.code,
                error.description
            ));
        }

        let result = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| anyhow!("No data returned from Yahoo Finance"))?;

        // An instrument with no observations in range comes back without
        // timestamps; that is an empty series, not a failure.
        let timestamps = match result.timestamp {
            Some(ts) => ts,
            None => return Ok(Vec::new()),
        };

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No quote data"))?;

        let closes = quote.close.unwrap_or_default();

        let mut prices = Vec::new();

        for (i, &timestamp) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(timestamp, 0)
                .ok_or_else(|| anyhow!("Invalid timestamp"))?
                .date_naive();

            // Null closes mark holidays and halted sessions; skip them.
            let close = match closes.get(i).and_then(|&v| v) {
                Some(v) => v,
                None => continue,
            };

            prices.push(DailyClose {
                date,
                close: Decimal::from_f64_retain(close)
                    .ok_or_else(|| anyhow!("Invalid close price"))?,
            });
        }

        debug!("Fetched {} daily closes for {}", prices.len(), symbol);
        Ok(prices)
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn closes_between(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        let key = (symbol.to_string(), from, to);

        {
            let cache = self.cache.lock().unwrap();
            if let Some(series) = cache.get(&key) {
                debug!("Using cached closes for {} {}..{}", symbol, from, to);
                return Ok(series.clone());
            }
        }

        let prices = self.fetch_closes(symbol, from, to).await?;

        let mut cache = self.cache.lock().unwrap();
        cache.insert(key, prices.clone());
        Ok(prices)
    }
}
