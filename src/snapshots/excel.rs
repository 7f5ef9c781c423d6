use anyhow::{Context, Result};
use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::FolioError;
use crate::schema::SnapshotSchema;
use crate::snapshots::{RawHolding, RawSnapshots};

/// Currency decoration characters tolerated in numeric cells.
static DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'+$ ]"#).expect("valid regex"));

/// Resolved column indexes for one sheet.
#[derive(Debug, Clone, Copy)]
struct ColumnMapping {
    instrument: usize,
    quantity: usize,
    unit_cost: usize,
    market_price: usize,
}

impl ColumnMapping {
    /// Create a column mapping by scanning a candidate header row.
    /// Headers match the schema names case-insensitively after trimming.
    fn from_header(schema: &SnapshotSchema, header: &[Data]) -> Option<Self> {
        let find = |name: &str| {
            header.iter().position(|cell| {
                cell.get_string()
                    .map(|text| text.trim().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
        };

        Some(Self {
            instrument: find(&schema.instrument_col)?,
            quantity: find(&schema.quantity_col)?,
            unit_cost: find(&schema.unit_cost_col)?,
            market_price: find(&schema.market_price_col)?,
        })
    }
}

/// Fail fast when the input path cannot possibly hold a workbook.
fn validate_workbook_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(FolioError::InvalidInput(format!("workbook not found: {}", path.display()))
            .into());
    }

    if !path.is_file() {
        return Err(FolioError::InvalidInput(format!(
            "not a regular file: {}",
            path.display()
        ))
        .into());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !matches!(extension.as_str(), "xlsx" | "xls") {
        return Err(FolioError::InvalidInput(format!(
            "unsupported file extension: {:?} (expected .xlsx or .xls)",
            extension
        ))
        .into());
    }

    Ok(())
}

/// Load raw snapshots from a multi-sheet workbook.
///
/// Sheet names are reporting dates (`YYYY-MM-DD`); each sheet carries the
/// schema's columns. Numeric cells may be decorated strings; unparsable
/// values load as missing for the cleaner to resolve.
pub fn load_snapshots<P: AsRef<Path>>(path: P, schema: &SnapshotSchema) -> Result<RawSnapshots> {
    let path = path.as_ref();
    validate_workbook_path(path)?;

    info!("Opening snapshot workbook: {}", path.display());

    let mut workbook: Xlsx<_> = open_workbook(path).context("Failed to open Excel file")?;

    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(FolioError::InvalidInput("workbook has no sheets".to_string()).into());
    }

    let mut snapshots = RawSnapshots::default();

    for sheet_name in sheet_names {
        let date = NaiveDate::parse_from_str(sheet_name.trim(), "%Y-%m-%d").map_err(|_| {
            FolioError::InvalidInput(format!(
                "sheet name is not a reporting date (YYYY-MM-DD): {:?}",
                sheet_name
            ))
        })?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .context("Failed to read worksheet")?;

        let holdings = parse_sheet(schema, &sheet_name, range.rows())?;
        debug!("Sheet {} holds {} rows", sheet_name, holdings.len());
        snapshots.0.insert(date, holdings);
    }

    info!("Loaded {} snapshots", snapshots.len());
    Ok(snapshots)
}

/// Parse one sheet's rows into raw holdings.
fn parse_sheet<'a, I>(schema: &SnapshotSchema, sheet_name: &str, rows: I) -> Result<Vec<RawHolding>>
where
    I: Iterator<Item = &'a [Data]>,
{
    let mut mapping: Option<ColumnMapping> = None;
    let mut holdings = Vec::new();

    for row in rows {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        // The first non-empty row must be the header.
        let Some(cols) = mapping else {
            match ColumnMapping::from_header(schema, row) {
                Some(found) => {
                    mapping = Some(found);
                    continue;
                }
                None => {
                    return Err(FolioError::InvalidInput(format!(
                        "sheet {:?} is missing required columns ({}, {}, {}, {})",
                        sheet_name,
                        schema.instrument_col,
                        schema.quantity_col,
                        schema.unit_cost_col,
                        schema.market_price_col
                    ))
                    .into());
                }
            }
        };

        let instrument = row
            .get(cols.instrument)
            .map(|cell| cell.to_string())
            .unwrap_or_default();
        let instrument = instrument.trim();

        if instrument.is_empty() {
            continue;
        }

        holdings.push(RawHolding {
            instrument: schema.canonical_instrument(instrument),
            quantity: row.get(cols.quantity).and_then(parse_numeric),
            unit_cost: row.get(cols.unit_cost).and_then(parse_numeric),
            market_price: row.get(cols.market_price).and_then(parse_numeric),
        });
    }

    Ok(holdings)
}

/// Coerce a cell to a number.
///
/// Strings are stripped of decoration characters (quotes, plus and dollar
/// signs, spaces) before parsing; anything still unparsable (including a
/// literal "nan") is missing, never an error.
fn parse_numeric(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64_retain(*f),
        Data::Empty => None,
        _ => {
            let text = cell.to_string();
            let stripped = DECORATION.replace_all(&text, "");

            if stripped.is_empty() || stripped.eq_ignore_ascii_case("nan") {
                return None;
            }

            match Decimal::from_str(&stripped) {
                Ok(value) => Some(value),
                Err(_) => {
                    debug!("Unparsable numeric cell {:?}, treating as missing", text);
                    None
                }
            }
        }
    }
}
