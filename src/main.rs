use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cfe_estimate::batch::read_rows;
use cfe_estimate::tariff::PricingMode;
use cfe_estimate::{EstimationResult, Estimator, RateTable};

/// Estimate cost, CO2e and usage breakdown for a CSV of bills.
#[derive(Debug, Parser)]
#[command(name = "cfe-estimate", version)]
struct Cli {
    /// CSV with one bill and its survey answers per row
    bills: PathBuf,

    /// JSON rate table overriding the built-in tariff constants
    #[arg(long)]
    rates: Option<PathBuf>,

    /// Print one JSON document per bill instead of the text report
    #[arg(long)]
    json: bool,

    /// Lines to skip before the CSV header (e.g. export disclaimers)
    #[arg(long, default_value_t = 0)]
    skip_lines: usize,
}

fn print_report(label: &str, result: &EstimationResult) {
    println!("{label} (tariff {}, {} kWh):", result.tariff, result.consumption_kwh);

    if let PricingMode::HighRate(reason) = result.cost_breakdown.mode {
        println!("   Whole consumption at the high-consumption rate ({reason:?})");
    }
    for charge in &result.cost_breakdown.charges {
        println!(
            "   {:<13} {:>5} kWh @ ${}/kWh = ${:.2}",
            charge.name, charge.kwh, charge.rate, charge.amount
        );
    }
    println!("   Tax: ${:.2}", result.cost_breakdown.tax);
    println!("   Estimated Cost: ${}", result.cost);
    println!("   Estimated Emissions: {} kg CO2e\n", result.co2e_kg);

    println!("   Usage Breakdown:");
    for entry in &result.breakdown {
        println!(
            "     {:<26} {:>6} kWh {:>5}%  ({} confidence)",
            entry.category.name(),
            entry.kwh,
            entry.percentage,
            entry.confidence
        );
    }

    println!("\n   Recommendations:");
    for (rank, rec) in result.recommendations.iter().enumerate() {
        println!(
            "     {}. {}: {} kWh, ${}, {} kg CO2e",
            rank + 1,
            rec.title,
            rec.kwh_saved,
            rec.money_saved,
            rec.co2e_avoided_kg
        );
        println!("        {}", rec.description);
    }

    println!("\n   Assumptions:");
    for note in &result.assumptions {
        println!("     - {note}");
    }
    println!("   Overall Confidence: {}\n", result.confidence);
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let rates = match &cli.rates {
        Some(path) => RateTable::from_json_file(path)?,
        None => RateTable::default(),
    };
    let estimator = Estimator::new(rates);

    let file = File::open(&cli.bills)?;
    let rows = read_rows(file, cli.skip_lines)?;

    let mut estimated = 0usize;
    for (index, row) in rows.into_iter().enumerate() {
        let line = index + 1;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "skipping invalid record");
                continue;
            }
        };
        let label = row.label.clone().unwrap_or_else(|| format!("Bill {line}"));
        let (bill, survey) = match row.into_inputs() {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(line, error = %e, "skipping invalid bill");
                continue;
            }
        };
        let result = match estimator.estimate(&bill, &survey) {
            Ok(result) => result,
            Err(e) => {
                warn!(line, error = %e, "skipping bill that could not be estimated");
                continue;
            }
        };

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_report(&label, &result);
        }
        estimated += 1;
    }

    info!(estimated, "done");
    Ok(())
}
