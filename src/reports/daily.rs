//! Daily portfolio value and liquidity series.
//!
//! Monthly snapshots only give point-in-time valuations. To chart value
//! and liquidity continuously, each month's holdings are held constant for
//! every day of the month the snapshot reports and valued at that day's
//! external price. Quantities are never interpolated; only prices move
//! between days.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::pricing::PriceSource;
use crate::schema::SnapshotSchema;
use crate::snapshots::SnapshotCollection;
use crate::utils::subtract_one_month;

/// One calendar day of the expanded series.
#[derive(Debug, Clone)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Portfolio value, cash included.
    pub total: Decimal,
    /// Cash balance held that day.
    pub cash: Decimal,
    /// cash / total; undefined (not zero, not infinity) when total is zero.
    pub liquidity: Option<Decimal>,
}

/// The expanded series, one point per calendar day between the first and
/// last snapshot dates inclusive.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub points: Vec<DailyPoint>,
}

impl DailySeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Expand monthly snapshots onto a daily calendar.
///
/// Daily closes are fetched per non-cash instrument from one month before
/// the first snapshot through the last snapshot date, so the first days of
/// the window already have a price to carry forward. Days without an
/// observation inherit the most recent prior close, so a trading holiday
/// carries over the last known valuation rather than registering a gap. A
/// per-instrument lookup failure degrades to an empty series with a
/// warning, the same best-effort policy the cleaner applies.
pub async fn expand_daily(
    snapshots: &SnapshotCollection,
    schema: &SnapshotSchema,
    prices: &dyn PriceSource,
) -> Result<DailySeries> {
    let (Some(first), Some(last)) = (snapshots.first_date(), snapshots.last_date()) else {
        return Ok(DailySeries::default());
    };

    let instruments: Vec<String> = snapshots
        .instruments()
        .into_iter()
        .filter(|i| !schema.is_cash(i))
        .collect();

    let fetch_from = subtract_one_month(first);
    let mut close_series: BTreeMap<String, BTreeMap<NaiveDate, Decimal>> = BTreeMap::new();

    for instrument in &instruments {
        let closes = match prices.closes_between(instrument, fetch_from, last).await {
            Ok(closes) => closes,
            Err(e) => {
                warn!(
                    "Daily price lookup failed for {} ({}), valuing at 0",
                    instrument, e
                );
                Vec::new()
            }
        };

        debug!("{} daily closes for {}", closes.len(), instrument);
        close_series.insert(
            instrument.clone(),
            closes.into_iter().map(|p| (p.date, p.close)).collect(),
        );
    }

    let mut points = Vec::new();

    for day in first.iter_days().take_while(|d| *d <= last) {
        // Month-end holdings describe the whole month, applied retroactively.
        let Some((_, holdings)) = snapshots.governing(day) else {
            break;
        };

        let cash: Decimal = holdings
            .iter()
            .filter(|h| schema.is_cash(&h.instrument))
            .map(|h| h.quantity)
            .sum();

        let mut total = cash;

        for instrument in &instruments {
            let quantity = holdings
                .iter()
                .find(|h| &h.instrument == instrument)
                .map(|h| h.quantity)
                .unwrap_or(Decimal::ZERO);

            if quantity == Decimal::ZERO {
                continue;
            }

            // Most recent close on or before this day; an instrument with
            // no observation yet contributes nothing.
            let close = close_series
                .get(instrument)
                .and_then(|series| series.range(..=day).next_back())
                .map(|(_, close)| *close)
                .unwrap_or(Decimal::ZERO);

            total += close * quantity;
        }

        let liquidity = if total == Decimal::ZERO {
            None
        } else {
            Some(cash / total)
        };

        points.push(DailyPoint {
            date: day,
            total,
            cash,
            liquidity,
        });
    }

    Ok(DailySeries { points })
}
