//! Integration tests for the snapshot pipeline
//!
//! These tests verify end-to-end functionality:
//! - Workbook loading with numeric coercion
//! - Missing-value fills (market price, cost basis, quantity)
//! - Valuation and unrealized gain/loss matrices
//! - Daily expansion and liquidity
//! - Cleaned-data export round-trip
//!
//! Fixture workbooks are generated with rust_xlsxwriter into temp dirs;
//! market data comes from an in-memory price source, never the network.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use folio::cleaning::clean_snapshots;
use folio::pricing::{DailyClose, PriceSource};
use folio::reports::daily::expand_daily;
use folio::reports::pnl::unrealized_pnl;
use folio::reports::valuation::{asset_values, TOTAL_ROW};
use folio::schema::SnapshotSchema;
use folio::snapshots::excel::load_snapshots;
use folio::snapshots::export::write_workbook;
use folio::snapshots::SnapshotCollection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rust_xlsxwriter::Workbook;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// In-memory price source with canned daily closes.
struct FakeSource {
    series: HashMap<String, Vec<DailyClose>>,
}

impl FakeSource {
    fn empty() -> Self {
        Self {
            series: HashMap::new(),
        }
    }

    fn with(series: &[(&str, &[(NaiveDate, Decimal)])]) -> Self {
        Self {
            series: series
                .iter()
                .map(|(symbol, points)| {
                    (
                        symbol.to_string(),
                        points
                            .iter()
                            .map(|(date, close)| DailyClose {
                                date: *date,
                                close: *close,
                            })
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn closes_between(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyClose>> {
        Ok(self
            .series
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= from && p.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A cell of a fixture sheet.
enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

/// Write a fixture workbook; each sheet gets the standard header row.
fn create_workbook(path: &Path, sheets: &[(&str, Vec<Vec<Cell>>)]) {
    let mut workbook = Workbook::new();

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();

        let headers = ["Stock", "Quantity", "UnitCost", "MarketPrice"];
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }

        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let (r, c) = ((row_idx + 1) as u32, col_idx as u16);
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(r, c, *text).unwrap();
                    }
                    Cell::Number(value) => {
                        worksheet.write_number(r, c, *value).unwrap();
                    }
                    Cell::Blank => {}
                }
            }
        }
    }

    workbook.save(path).unwrap();
}

/// Fixture matching the reference scenario: June holds XYZ and Cash, July
/// holds only Cash.
fn june_july_workbook(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("holdings.xlsx");
    create_workbook(
        &path,
        &[
            (
                "2023-06-30",
                vec![
                    vec![
                        Cell::Text("XYZ"),
                        Cell::Number(10.0),
                        Cell::Number(100.0),
                        Cell::Number(110.0),
                    ],
                    vec![
                        Cell::Text("Cash"),
                        Cell::Number(500.0),
                        Cell::Blank,
                        Cell::Blank,
                    ],
                ],
            ),
            (
                "2023-07-31",
                vec![vec![
                    Cell::Text("Cash"),
                    Cell::Number(700.0),
                    Cell::Blank,
                    Cell::Blank,
                ]],
            ),
        ],
    );
    path
}

async fn load_and_clean(path: &Path, source: &dyn PriceSource) -> SnapshotCollection {
    let schema = SnapshotSchema::default();
    let raw = load_snapshots(path, &schema).unwrap();
    let (cleaned, _) = clean_snapshots(&raw, &schema, source).await.unwrap();
    cleaned
}

#[tokio::test]
async fn coerces_decorated_strings_and_fills_every_missing_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdings.xlsx");
    create_workbook(
        &path,
        &[(
            "2023-06-30",
            vec![
                // Decorated strings parse; the missing price comes from the
                // trailing five-day window.
                vec![
                    Cell::Text("XYZ"),
                    Cell::Text("\"10\""),
                    Cell::Text("$100.25"),
                    Cell::Blank,
                ],
                // Unknown instrument: price lookup finds nothing, values 0.
                vec![
                    Cell::Text("GONE"),
                    Cell::Number(3.0),
                    Cell::Number(50.0),
                    Cell::Text("nan"),
                ],
                vec![
                    Cell::Text("cash"),
                    Cell::Text("+500"),
                    Cell::Blank,
                    Cell::Blank,
                ],
            ],
        )],
    );

    let source = FakeSource::with(&[(
        "XYZ",
        &[
            (d(2023, 6, 27), dec!(108)),
            (d(2023, 6, 29), dec!(110.50)),
        ],
    )]);
    let cleaned = load_and_clean(&path, &source).await;

    let xyz = cleaned.holding(d(2023, 6, 30), "XYZ").unwrap();
    assert_eq!(xyz.quantity, dec!(10));
    assert_eq!(xyz.unit_cost, dec!(100.25));
    assert_eq!(xyz.market_price, dec!(110.50));

    let gone = cleaned.holding(d(2023, 6, 30), "GONE").unwrap();
    assert_eq!(gone.market_price, Decimal::ZERO);

    // The lowercase sentinel collapses to the canonical spelling and never
    // hits the price source.
    let cash = cleaned.holding(d(2023, 6, 30), "Cash").unwrap();
    assert_eq!(cash.quantity, dec!(500));
    assert_eq!(cash.unit_cost, Decimal::ZERO);
    assert_eq!(cash.market_price, Decimal::ZERO);
}

#[tokio::test]
async fn cost_basis_resolves_from_pre_window_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdings.xlsx");
    create_workbook(
        &path,
        &[(
            "2023-06-30",
            vec![vec![
                Cell::Text("NEW"),
                Cell::Number(5.0),
                Cell::Blank,
                Cell::Number(60.0),
            ]],
        )],
    );

    // Earliest snapshot 2023-06-30; the fallback window is the week
    // starting 2023-05-31. The first close in it wins.
    let source = FakeSource::with(&[(
        "NEW",
        &[(d(2023, 6, 1), dec!(42)), (d(2023, 6, 5), dec!(44))],
    )]);
    let cleaned = load_and_clean(&path, &source).await;

    let new = cleaned.holding(d(2023, 6, 30), "NEW").unwrap();
    assert_eq!(new.unit_cost, dec!(42));
}

#[tokio::test]
async fn june_scenario_valuation_and_pnl() {
    let dir = TempDir::new().unwrap();
    let path = june_july_workbook(&dir);
    let cleaned = load_and_clean(&path, &FakeSource::empty()).await;
    let schema = SnapshotSchema::default();

    let values = asset_values(&cleaned, &schema);
    assert_eq!(values.value("XYZ", d(2023, 6, 30)), Some(dec!(1100)));
    assert_eq!(values.value("Cash", d(2023, 6, 30)), Some(dec!(500)));
    assert_eq!(values.value(TOTAL_ROW, d(2023, 6, 30)), Some(dec!(1600)));

    let pnl = unrealized_pnl(&cleaned, &schema);
    assert_eq!(pnl.value("XYZ", d(2023, 6, 30)), Some(dec!(100)));
    assert_eq!(pnl.value("Cash", d(2023, 6, 30)), Some(dec!(500)));
}

#[tokio::test]
async fn instrument_absent_from_a_month_reports_zero() {
    let dir = TempDir::new().unwrap();
    let path = june_july_workbook(&dir);
    let cleaned = load_and_clean(&path, &FakeSource::empty()).await;
    let schema = SnapshotSchema::default();

    let values = asset_values(&cleaned, &schema);
    assert_eq!(values.value("XYZ", d(2023, 7, 31)), Some(dec!(0)));

    let pnl = unrealized_pnl(&cleaned, &schema);
    assert_eq!(pnl.value("XYZ", d(2023, 7, 31)), Some(dec!(0)));
}

#[tokio::test]
async fn total_row_matches_column_sums() {
    let dir = TempDir::new().unwrap();
    let path = june_july_workbook(&dir);
    let cleaned = load_and_clean(&path, &FakeSource::empty()).await;

    let values = asset_values(&cleaned, &SnapshotSchema::default());

    for (col, date) in values.columns().to_vec().into_iter().enumerate() {
        let sum: Decimal = values
            .rows()
            .filter(|(label, _)| *label != TOTAL_ROW)
            .map(|(_, row)| row[col])
            .sum();
        assert_eq!(values.value(TOTAL_ROW, date), Some(sum));
    }
}

#[tokio::test]
async fn daily_series_applies_monthly_holdings_without_interpolation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdings.xlsx");
    create_workbook(
        &path,
        &[
            (
                "2023-06-30",
                vec![
                    vec![
                        Cell::Text("XYZ"),
                        Cell::Number(10.0),
                        Cell::Number(100.0),
                        Cell::Number(110.0),
                    ],
                    vec![
                        Cell::Text("Cash"),
                        Cell::Number(500.0),
                        Cell::Number(0.0),
                        Cell::Number(0.0),
                    ],
                ],
            ),
            (
                "2023-07-31",
                vec![
                    vec![
                        Cell::Text("XYZ"),
                        Cell::Number(4.0),
                        Cell::Number(100.0),
                        Cell::Number(120.0),
                    ],
                    vec![
                        Cell::Text("Cash"),
                        Cell::Number(800.0),
                        Cell::Number(0.0),
                        Cell::Number(0.0),
                    ],
                ],
            ),
        ],
    );

    let source = FakeSource::with(&[(
        "XYZ",
        &[
            (d(2023, 6, 29), dec!(110)),
            (d(2023, 7, 3), dec!(120)),
        ],
    )]);
    let cleaned = load_and_clean(&path, &source).await;
    let schema = SnapshotSchema::default();

    let series = expand_daily(&cleaned, &schema, &source).await.unwrap();

    // Every calendar day from 2023-06-30 through 2023-07-31.
    assert_eq!(series.len(), 32);

    // 2023-07-10 sits mid-month: July's 4 shares at the carried 120 close,
    // never a blend of June's 10 and July's 4.
    let jul10 = series
        .points
        .iter()
        .find(|p| p.date == d(2023, 7, 10))
        .unwrap();
    assert_eq!(jul10.total, dec!(800) + dec!(4) * dec!(120));
    assert_eq!(jul10.cash, dec!(800));
    assert_eq!(
        jul10.liquidity,
        Some(dec!(800) / (dec!(800) + dec!(4) * dec!(120)))
    );
}

#[tokio::test]
async fn export_round_trip_is_numerically_identical() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdings.xlsx");
    create_workbook(
        &path,
        &[
            (
                "2023-06-30",
                vec![
                    vec![
                        Cell::Text("XYZ"),
                        Cell::Number(10.0),
                        Cell::Text("$100.25"),
                        Cell::Blank,
                    ],
                    vec![
                        Cell::Text("cash"),
                        Cell::Number(500.0),
                        Cell::Blank,
                        Cell::Blank,
                    ],
                ],
            ),
            (
                "2023-07-31",
                vec![vec![
                    Cell::Text("XYZ"),
                    Cell::Number(8.0),
                    Cell::Text("$100.25"),
                    Cell::Number(115.5),
                ]],
            ),
        ],
    );

    let source = FakeSource::with(&[(
        "XYZ",
        &[(d(2023, 6, 29), dec!(110.5))],
    )]);
    let schema = SnapshotSchema::default();
    let cleaned = load_and_clean(&path, &source).await;

    let exported = dir.path().join("cleaned_data.xlsx");
    write_workbook(&cleaned, &schema, &exported).unwrap();

    // Re-importing cleaned data is idempotent: the cleaner finds nothing
    // left to fill and values match exactly.
    let raw = load_snapshots(&exported, &schema).unwrap();
    let (reloaded, stats) = clean_snapshots(&raw, &schema, &FakeSource::empty())
        .await
        .unwrap();

    assert_eq!(stats.quantity_fills, 0);
    assert_eq!(stats.price_fills, 0);
    assert_eq!(stats.cost_fills, 0);

    assert_eq!(cleaned.len(), reloaded.len());
    for (date, holdings) in cleaned.iter() {
        let reloaded_rows = reloaded.get(*date).unwrap();
        assert_eq!(holdings.as_slice(), reloaded_rows, "mismatch at {}", date);
    }
}

#[test]
fn load_rejects_undated_sheet_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holdings.xlsx");
    create_workbook(
        &path,
        &[(
            "Sheet1",
            vec![vec![
                Cell::Text("XYZ"),
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(1.0),
            ]],
        )],
    );

    let err = load_snapshots(&path, &SnapshotSchema::default()).unwrap_err();
    assert!(err.to_string().contains("not a reporting date"));
}
