//! Snapshot cleaning.
//!
//! Resolves every missing numeric field in the raw snapshots. Fill values
//! are computed against the immutable raw tables first and applied in a
//! second pass, so no table is mutated while it is being iterated and each
//! fill rule can be tested in isolation.
//!
//! Fill rules:
//! - quantity: missing parses as no position, filled with zero;
//! - market price: most recent close in the five calendar days ending at
//!   the snapshot date; zero when the lookup fails or returns nothing;
//! - cost basis: constant per instrument across months. First non-missing
//!   cell across any month wins; instruments with none fall back to the
//!   close from the week following one month before the earliest snapshot,
//!   then to the instrument's first cleaned market price, then to zero.
//!
//! The cash sentinel never reaches the price source: its market price and
//! cost basis are meaningless and fill as zero.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::pricing::PriceSource;
use crate::schema::SnapshotSchema;
use crate::snapshots::{Holding, RawSnapshots, SnapshotCollection};
use crate::utils::subtract_one_month;

/// Trailing window consulted for a missing month-end market price.
const PRICE_LOOKBACK_DAYS: i64 = 5;

/// Counts of fills applied during cleaning.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanStats {
    pub quantity_fills: usize,
    pub price_fills: usize,
    pub cost_fills: usize,
}

/// Produce cleaned snapshots with no missing numeric fields.
pub async fn clean_snapshots(
    raw: &RawSnapshots,
    schema: &SnapshotSchema,
    prices: &dyn PriceSource,
) -> Result<(SnapshotCollection, CleanStats)> {
    let mut stats = CleanStats::default();

    let price_fills = compute_price_fills(raw, schema, prices).await;
    let cost_by_instrument =
        resolve_cost_bases(raw, schema, prices, &price_fills).await;

    let mut cleaned = BTreeMap::new();

    for (date, rows) in &raw.0 {
        let mut holdings = Vec::with_capacity(rows.len());

        for (idx, row) in rows.iter().enumerate() {
            let quantity = match row.quantity {
                Some(q) => q,
                None => {
                    stats.quantity_fills += 1;
                    Decimal::ZERO
                }
            };

            let market_price = match row.market_price {
                Some(p) => p,
                None => {
                    stats.price_fills += 1;
                    price_fills
                        .get(&(*date, idx))
                        .copied()
                        .unwrap_or(Decimal::ZERO)
                }
            };

            let unit_cost = match row.unit_cost {
                Some(c) => c,
                None => {
                    stats.cost_fills += 1;
                    cost_by_instrument
                        .get(&row.instrument)
                        .copied()
                        .unwrap_or(Decimal::ZERO)
                }
            };

            holdings.push(Holding {
                instrument: row.instrument.clone(),
                quantity,
                unit_cost,
                market_price,
            });
        }

        cleaned.insert(*date, holdings);
    }

    info!(
        "Cleaned {} snapshots ({} quantity, {} price, {} cost fills)",
        cleaned.len(),
        stats.quantity_fills,
        stats.price_fills,
        stats.cost_fills
    );

    Ok((SnapshotCollection::new(cleaned), stats))
}

/// Pass 1: a fill value for every missing market price, keyed by
/// (snapshot date, row index).
async fn compute_price_fills(
    raw: &RawSnapshots,
    schema: &SnapshotSchema,
    prices: &dyn PriceSource,
) -> BTreeMap<(NaiveDate, usize), Decimal> {
    let mut fills = BTreeMap::new();

    for (date, rows) in &raw.0 {
        for (idx, row) in rows.iter().enumerate() {
            if row.market_price.is_some() {
                continue;
            }

            let fill = if schema.is_cash(&row.instrument) {
                // The cash row's price column is unused; nothing to look up.
                Decimal::ZERO
            } else {
                lookup_month_end_price(prices, &row.instrument, *date).await
            };

            fills.insert((*date, idx), fill);
        }
    }

    fills
}

/// Most recent close in the trailing window ending at the snapshot date,
/// or zero when the source has nothing to offer.
async fn lookup_month_end_price(
    prices: &dyn PriceSource,
    instrument: &str,
    date: NaiveDate,
) -> Decimal {
    let from = date - Duration::days(PRICE_LOOKBACK_DAYS);

    match prices.latest_close_in(instrument, from, date).await {
        Ok(Some(close)) => {
            debug!("Filled {} price at {} with {}", instrument, date, close);
            close
        }
        Ok(None) => {
            warn!(
                "No market data for {} near {}, valuing at 0",
                instrument, date
            );
            Decimal::ZERO
        }
        Err(e) => {
            warn!(
                "Price lookup failed for {} near {} ({}), valuing at 0",
                instrument, date, e
            );
            Decimal::ZERO
        }
    }
}

/// Pass 2: one cost basis per instrument.
///
/// The cost basis reflects the original purchase price and does not move
/// between months, so it resolves per instrument rather than per cell.
async fn resolve_cost_bases(
    raw: &RawSnapshots,
    schema: &SnapshotSchema,
    prices: &dyn PriceSource,
    price_fills: &BTreeMap<(NaiveDate, usize), Decimal>,
) -> BTreeMap<String, Decimal> {
    let mut costs: BTreeMap<String, Option<Decimal>> = BTreeMap::new();

    // First non-missing cost basis across any month, ascending date order.
    for rows in raw.0.values() {
        for row in rows {
            let entry = costs.entry(row.instrument.clone()).or_insert(None);
            if entry.is_none() {
                *entry = row.unit_cost;
            }
        }
    }

    let mut resolved = BTreeMap::new();

    for (instrument, cost) in costs {
        let cost = match cost {
            Some(c) => c,
            None if schema.is_cash(&instrument) => Decimal::ZERO,
            None => fallback_cost_basis(raw, prices, price_fills, &instrument).await,
        };

        resolved.insert(instrument, cost);
    }

    resolved
}

/// Cost basis for an instrument that never reports one: the close from the
/// week following one month before the earliest snapshot, else the first
/// cleaned market price seen for the instrument, else zero.
async fn fallback_cost_basis(
    raw: &RawSnapshots,
    prices: &dyn PriceSource,
    price_fills: &BTreeMap<(NaiveDate, usize), Decimal>,
    instrument: &str,
) -> Decimal {
    if let Some(first_date) = raw.first_date() {
        let window_start = subtract_one_month(first_date) + Duration::days(1);
        let window_end = window_start + Duration::days(6);

        match prices.closes_between(instrument, window_start, window_end).await {
            Ok(closes) if !closes.is_empty() => {
                let close = closes[0].close;
                debug!(
                    "Cost basis for {} from pre-window close {} on {}",
                    instrument, close, closes[0].date
                );
                return close;
            }
            Ok(_) => {
                warn!(
                    "No pre-window market data for {}, falling back to first snapshot price",
                    instrument
                );
            }
            Err(e) => {
                warn!(
                    "Cost basis lookup failed for {} ({}), falling back to first snapshot price",
                    instrument, e
                );
            }
        }
    }

    first_market_price(raw, price_fills, instrument).unwrap_or(Decimal::ZERO)
}

/// First cleaned market price for an instrument across snapshots, in
/// ascending date order.
fn first_market_price(
    raw: &RawSnapshots,
    price_fills: &BTreeMap<(NaiveDate, usize), Decimal>,
    instrument: &str,
) -> Option<Decimal> {
    for (date, rows) in &raw.0 {
        for (idx, row) in rows.iter().enumerate() {
            if row.instrument != instrument {
                continue;
            }

            let price = row
                .market_price
                .or_else(|| price_fills.get(&(*date, idx)).copied());
            if let Some(price) = price {
                return Some(price);
            }
        }
    }

    None
}
