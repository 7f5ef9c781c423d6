use clap::Parser;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Monthly portfolio snapshot cleaner and reporting tool")]
#[command(
    long_about = "Load a workbook of month-end portfolio snapshots, repair missing \
numeric fields from market data, print month-by-month value and unrealized \
gain/loss tables, and render daily value and liquidity charts."
)]
pub struct Cli {
    /// Path to the holdings workbook (.xlsx, one sheet per month-end date)
    pub file: String,

    /// Write the cleaned snapshots to cleaned_data.xlsx
    #[arg(long)]
    pub export_clean_data: bool,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
