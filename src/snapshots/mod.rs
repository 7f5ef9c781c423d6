//! Snapshot data model.
//!
//! A snapshot is the holdings table reported for one month-end date. The
//! collection maps parsed calendar dates to immutable tables, ordered by
//! date at construction; ordering is never re-derived from string
//! comparison.

pub mod excel;
pub mod export;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// One holdings row as loaded from the workbook; numeric fields may be
/// missing until the cleaner resolves them.
#[derive(Debug, Clone)]
pub struct RawHolding {
    pub instrument: String,
    pub quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub market_price: Option<Decimal>,
}

/// One holdings row with every numeric field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub instrument: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub market_price: Decimal,
}

/// Raw snapshots keyed by reporting date, as parsed from the workbook.
#[derive(Debug, Clone, Default)]
pub struct RawSnapshots(pub BTreeMap<NaiveDate, Vec<RawHolding>>);

impl RawSnapshots {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Earliest reporting date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.keys().next().copied()
    }
}

/// Cleaned snapshots keyed by reporting date.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCollection(BTreeMap<NaiveDate, Vec<Holding>>);

impl SnapshotCollection {
    pub fn new(snapshots: BTreeMap<NaiveDate, Vec<Holding>>) -> Self {
        Self(snapshots)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<Holding>)> {
        self.0.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.keys().next_back().copied()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&[Holding]> {
        self.0.get(&date).map(|rows| rows.as_slice())
    }

    /// Snapshot governing a calendar day: the nearest reporting date on or
    /// after that day. A month-end snapshot describes its whole month, so
    /// holdings are applied retroactively.
    pub fn governing(&self, date: NaiveDate) -> Option<(NaiveDate, &[Holding])> {
        self.0
            .range(date..)
            .next()
            .map(|(d, rows)| (*d, rows.as_slice()))
    }

    /// Every instrument identifier ever seen across all snapshots, sorted.
    pub fn instruments(&self) -> BTreeSet<String> {
        self.0
            .values()
            .flatten()
            .map(|h| h.instrument.clone())
            .collect()
    }

    /// The holding for an instrument in a given snapshot, if present.
    pub fn holding(&self, date: NaiveDate, instrument: &str) -> Option<&Holding> {
        self.0
            .get(&date)?
            .iter()
            .find(|h| h.instrument == instrument)
    }
}
