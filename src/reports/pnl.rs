//! Month-end unrealized gain/loss.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::reports::MonthlyMatrix;
use crate::schema::SnapshotSchema;
use crate::snapshots::{Holding, SnapshotCollection};

/// Unrealized gain/loss of each holding at each month end.
///
/// pnl = (market price - cost basis) x quantity. Cash carries no gain/loss
/// concept; its balance passes through as-is. Months without a position
/// hold zero.
pub fn unrealized_pnl(snapshots: &SnapshotCollection, schema: &SnapshotSchema) -> MonthlyMatrix {
    let columns: Vec<NaiveDate> = snapshots.dates().collect();
    let mut rows = Vec::new();

    for instrument in snapshots.instruments() {
        let values: Vec<Decimal> = columns
            .iter()
            .map(|date| {
                snapshots
                    .holding(*date, &instrument)
                    .map(|h| holding_pnl(schema, h))
                    .unwrap_or(Decimal::ZERO)
            })
            .collect();

        rows.push((instrument, values));
    }

    MonthlyMatrix::new(columns, rows)
}

fn holding_pnl(schema: &SnapshotSchema, holding: &Holding) -> Decimal {
    if schema.is_cash(&holding.instrument) {
        holding.quantity
    } else {
        (holding.market_price - holding.unit_cost) * holding.quantity
    }
}
