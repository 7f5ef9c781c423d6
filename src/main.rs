mod cli;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::info;

use cli::Cli;
use folio::pricing::YahooSource;
use folio::reports::MonthlyMatrix;
use folio::schema::SnapshotSchema;
use folio::snapshots::export;
use folio::utils::format_amount;
use folio::{charts, cleaning, reports, snapshots};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let schema = SnapshotSchema::default();

    let raw = snapshots::excel::load_snapshots(&cli.file, &schema)?;
    println!(
        "\n{} Loaded {} snapshots from {}",
        "✓".green().bold(),
        raw.len(),
        cli.file
    );

    let source = YahooSource::new()?;

    let (cleaned, stats) = cleaning::clean_snapshots(&raw, &schema, &source).await?;
    println!(
        "{} Cleaned data ({} quantity, {} price, {} cost basis fills)",
        "✓".green().bold(),
        stats.quantity_fills,
        stats.price_fills,
        stats.cost_fills
    );

    if cli.export_clean_data {
        export::write_workbook(&cleaned, &schema, Path::new(export::CLEANED_DATA_FILE))?;
        println!(
            "{} Cleaned snapshots written to {}",
            "✓".green().bold(),
            export::CLEANED_DATA_FILE
        );
    }

    let values = reports::valuation::asset_values(&cleaned, &schema);
    println!("\n{}", "Asset value per month".bold());
    println!("{}", render_matrix(&values));

    let pnl = reports::pnl::unrealized_pnl(&cleaned, &schema);
    println!("\n{}", "Unrealized gain/loss per month".bold());
    println!("{}", render_matrix(&pnl));

    let daily = reports::daily::expand_daily(&cleaned, &schema, &source).await?;
    info!("Expanded {} daily points", daily.len());

    let (value_path, liquidity_path) = charts::write_charts(&daily, Path::new("."))?;
    println!(
        "\n{} Charts written: {}, {}",
        "✓".green().bold(),
        value_path.display(),
        liquidity_path.display()
    );

    Ok(())
}

/// Render a monthly matrix as a table, reporting dates as column headers.
fn render_matrix(matrix: &MonthlyMatrix) -> String {
    let mut builder = Builder::default();

    let mut header = vec![String::new()];
    header.extend(matrix.columns().iter().map(|d| d.to_string()));
    builder.push_record(header);

    for (label, values) in matrix.rows() {
        let mut record = vec![label.to_string()];
        record.extend(values.iter().map(|v| format_amount(*v)));
        builder.push_record(record);
    }

    builder.build().with(Style::rounded()).to_string()
}
