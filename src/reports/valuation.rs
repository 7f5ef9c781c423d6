//! Month-end asset values.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::reports::MonthlyMatrix;
use crate::schema::SnapshotSchema;
use crate::snapshots::SnapshotCollection;

/// Label of the aggregate row summing every instrument per month.
pub const TOTAL_ROW: &str = "Total";

/// Market value of each holding at each month end.
///
/// value = market price x quantity; the cash row's quantity is already a
/// value and passes through unpriced. Every instrument ever seen gets a
/// row; months without a position hold zero. A final aggregate row carries
/// the portfolio total per month.
pub fn asset_values(snapshots: &SnapshotCollection, schema: &SnapshotSchema) -> MonthlyMatrix {
    let columns: Vec<NaiveDate> = snapshots.dates().collect();
    let mut rows = Vec::new();
    let mut totals = vec![Decimal::ZERO; columns.len()];

    for instrument in snapshots.instruments() {
        let values: Vec<Decimal> = columns
            .iter()
            .map(|date| {
                snapshots
                    .holding(*date, &instrument)
                    .map(|h| holding_value(schema, &instrument, h.quantity, h.market_price))
                    .unwrap_or(Decimal::ZERO)
            })
            .collect();

        for (total, value) in totals.iter_mut().zip(&values) {
            *total += *value;
        }

        rows.push((instrument, values));
    }

    rows.push((TOTAL_ROW.to_string(), totals));

    MonthlyMatrix::new(columns, rows)
}

fn holding_value(
    schema: &SnapshotSchema,
    instrument: &str,
    quantity: Decimal,
    market_price: Decimal,
) -> Decimal {
    if schema.is_cash(instrument) {
        quantity
    } else {
        market_price * quantity
    }
}
