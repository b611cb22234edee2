use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use portfolio_rs::portfolio::AssetSeries;
use portfolio_rs::portfolio::PortfolioAnalysis;
use portfolio_rs::portfolio::PortfolioEngine;
use portfolio_rs::portfolio::PortfolioEngineConfig;
use portfolio_rs::portfolio::SharpeOptimizerConfig;
use prettytable::row;
use prettytable::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about = "Maximum-Sharpe allocation and historical VaR for aligned price series",
  after_help = "The price file needs a header `date,<asset>,<asset>,...` and ISO dates (YYYY-MM-DD)."
)]
struct Args {
  /// CSV file with one date column followed by one price column per asset
  #[arg(long)]
  prices: PathBuf,

  /// Annualized risk-free rate
  #[arg(long, default_value_t = 0.02)]
  risk_free: f64,

  /// VaR confidence level in (0, 1)
  #[arg(long, default_value_t = 0.95)]
  confidence: f64,

  /// Periods per year used for annualization
  #[arg(long, default_value_t = 252)]
  periods_per_year: u32,

  /// Optimizer iteration cap
  #[arg(long, default_value_t = 1000)]
  max_iters: u64,

  /// Optimizer stationarity tolerance
  #[arg(long, default_value_t = 1e-8)]
  tolerance: f64,
}

fn read_prices(path: &Path) -> Result<Vec<AssetSeries>> {
  let mut reader = csv::Reader::from_path(path)
    .with_context(|| format!("failed to open price file {}", path.display()))?;

  let headers = reader.headers()?.clone();
  if headers.len() < 2 {
    bail!("price file needs a date column and at least one asset column");
  }

  let mut series: Vec<AssetSeries> = headers
    .iter()
    .skip(1)
    .map(|asset| AssetSeries::new(asset.trim(), Vec::new(), Vec::new()))
    .collect();

  for (line, record) in reader.records().enumerate() {
    let record = record.with_context(|| format!("malformed CSV record {}", line + 2))?;
    let date = NaiveDate::parse_from_str(record[0].trim(), "%Y-%m-%d")
      .with_context(|| format!("invalid date '{}' on line {}", &record[0], line + 2))?;

    for (s, field) in series.iter_mut().zip(record.iter().skip(1)) {
      let price: f64 = field
        .trim()
        .parse()
        .with_context(|| format!("invalid price '{field}' for {} on {date}", s.asset))?;
      s.dates.push(date);
      s.prices.push(price);
    }
  }

  Ok(series)
}

fn print_analysis(analysis: &PortfolioAnalysis) {
  let mut weights = Table::new();
  weights.add_row(row!["Asset", "Annualized return", "Volatility", "Weight"]);
  let vols = analysis.covariance.volatilities();
  for (i, asset) in analysis.allocation.assets.iter().enumerate() {
    weights.add_row(row![
      asset,
      format!("{:.4}", analysis.expected_returns.values[i]),
      format!("{:.4}", vols[i]),
      format!("{:.4}", analysis.allocation.weights[i]),
    ]);
  }
  weights.printstd();

  let metrics = &analysis.allocation.metrics;
  let risk = &analysis.risk;
  let mut summary = Table::new();
  summary.add_row(row!["Expected return", format!("{:.4}", metrics.expected_return)]);
  summary.add_row(row!["Risk", format!("{:.4}", metrics.risk)]);
  summary.add_row(row!["Sharpe ratio", format!("{:.4}", metrics.sharpe_ratio)]);
  summary.add_row(row![
    format!("VaR ({:.0}%)", risk.confidence_level * 100.0),
    format!("{:.4}", risk.value_at_risk)
  ]);
  summary.add_row(row!["Cumulative return", format!("{:.4}", risk.total_return())]);
  summary.add_row(row![
    "Solver",
    format!(
      "{:?} after {} iterations",
      analysis.allocation.status, analysis.allocation.iterations
    )
  ]);
  summary.printstd();
}

fn main() -> Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portfolio_rs=info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let args = Args::parse();
  let prices = read_prices(&args.prices)?;
  info!(assets = prices.len(), path = %args.prices.display(), "loaded price series");

  let engine = PortfolioEngine::new(PortfolioEngineConfig {
    periods_per_year: args.periods_per_year,
    confidence_level: args.confidence,
    optimizer: SharpeOptimizerConfig {
      risk_free: args.risk_free,
      max_iters: args.max_iters,
      tolerance: args.tolerance,
      ..Default::default()
    },
  });

  let analysis = engine
    .analyze(&prices)
    .context("portfolio analysis failed")?;
  print_analysis(&analysis);

  Ok(())
}
