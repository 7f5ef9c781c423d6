// Reports module - monthly matrices and the daily series

pub mod daily;
pub mod pnl;
pub mod valuation;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// An (instrument x month) matrix of monetary values.
///
/// Rows keep insertion order (sorted instruments, aggregate rows last);
/// columns are the reporting dates in ascending order. Derived entirely
/// from the snapshot collection and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MonthlyMatrix {
    columns: Vec<NaiveDate>,
    rows: Vec<(String, Vec<Decimal>)>,
}

impl MonthlyMatrix {
    pub(crate) fn new(columns: Vec<NaiveDate>, rows: Vec<(String, Vec<Decimal>)>) -> Self {
        debug_assert!(rows.iter().all(|(_, values)| values.len() == columns.len()));
        Self { columns, rows }
    }

    /// Reporting dates, ascending.
    pub fn columns(&self) -> &[NaiveDate] {
        &self.columns
    }

    /// Row labels and values, in display order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Decimal])> {
        self.rows
            .iter()
            .map(|(label, values)| (label.as_str(), values.as_slice()))
    }

    /// Value for a row label at a reporting date.
    pub fn value(&self, label: &str, date: NaiveDate) -> Option<Decimal> {
        let col = self.columns.iter().position(|d| *d == date)?;
        let (_, values) = self.rows.iter().find(|(l, _)| l == label)?;
        values.get(col).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_value_lookup() {
        let matrix = MonthlyMatrix::new(
            vec![d(2023, 6, 30), d(2023, 7, 31)],
            vec![("XYZ".to_string(), vec![dec!(1100), dec!(0)])],
        );

        assert_eq!(matrix.value("XYZ", d(2023, 6, 30)), Some(dec!(1100)));
        assert_eq!(matrix.value("XYZ", d(2023, 7, 31)), Some(dec!(0)));
        assert_eq!(matrix.value("XYZ", d(2023, 8, 31)), None);
        assert_eq!(matrix.value("ABC", d(2023, 6, 30)), None);
    }
}
