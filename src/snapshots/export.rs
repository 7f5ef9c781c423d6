use anyhow::{anyhow, Context, Result};
use rust_decimal::prelude::ToPrimitive;
use std::path::Path;
use tracing::info;

use crate::schema::SnapshotSchema;
use crate::snapshots::SnapshotCollection;

/// Default output name for the cleaned workbook.
pub const CLEANED_DATA_FILE: &str = "cleaned_data.xlsx";

/// Persist cleaned snapshots as a multi-sheet workbook, one sheet per
/// reporting date, same column layout as the input.
pub fn write_workbook<P: AsRef<Path>>(
    snapshots: &SnapshotCollection,
    schema: &SnapshotSchema,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = rust_xlsxwriter::Workbook::new();

    for (date, holdings) in snapshots.iter() {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(date.format("%Y-%m-%d").to_string())
            .context("Failed to name worksheet")?;

        let headers = [
            schema.instrument_col.as_str(),
            schema.quantity_col.as_str(),
            schema.unit_cost_col.as_str(),
            schema.market_price_col.as_str(),
        ];
        for (col, header) in headers.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .context("Failed to write header")?;
        }

        for (idx, holding) in holdings.iter().enumerate() {
            let row = (idx + 1) as u32;
            worksheet
                .write_string(row, 0, &holding.instrument)
                .context("Failed to write instrument")?;
            worksheet
                .write_number(row, 1, to_f64(holding.quantity)?)
                .context("Failed to write quantity")?;
            worksheet
                .write_number(row, 2, to_f64(holding.unit_cost)?)
                .context("Failed to write cost basis")?;
            worksheet
                .write_number(row, 3, to_f64(holding.market_price)?)
                .context("Failed to write market price")?;
        }
    }

    workbook
        .save(path)
        .context("Failed to save cleaned workbook")?;

    info!(
        "Exported {} cleaned snapshots to {}",
        snapshots.len(),
        path.display()
    );
    Ok(())
}

fn to_f64(value: rust_decimal::Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| anyhow!("value out of range for worksheet cell: {}", value))
}
