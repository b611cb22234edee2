//! # Portfolio Engine
//!
//! $$
//! P \;\to\; r \;\to\; (\mu, \Sigma) \;\to\; \mathbf{w}^\* \;\to\; (\mathrm{VaR}, C_t)
//! $$
//!
//! Configuration-driven orchestration of the full analysis pipeline.

use tracing::info;

use super::data::compute_returns;
use super::error::Result;
use super::metrics::risk_report;
use super::metrics::DEFAULT_CONFIDENCE;
use super::optimizers::optimize_max_sharpe;
use super::optimizers::SharpeOptimizerConfig;
use super::risk_model::compute_risk_model;
use super::risk_model::TRADING_DAYS_PER_YEAR;
use super::types::AnnualizedReturns;
use super::types::AssetSeries;
use super::types::CovarianceMatrix;
use super::types::ForecastSeries;
use super::types::ReturnSeries;
use super::types::RiskReport;
use super::types::SharpeOptimization;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioEngineConfig {
  /// Periods per year used to annualize daily statistics.
  pub periods_per_year: u32,
  /// VaR confidence level in `(0, 1)`.
  pub confidence_level: f64,
  /// Risk-free rate, bounds and solver limits.
  pub optimizer: SharpeOptimizerConfig,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      periods_per_year: TRADING_DAYS_PER_YEAR,
      confidence_level: DEFAULT_CONFIDENCE,
      optimizer: SharpeOptimizerConfig::default(),
    }
  }
}

/// Everything one pipeline run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioAnalysis {
  pub returns: Vec<ReturnSeries>,
  pub expected_returns: AnnualizedReturns,
  pub covariance: CovarianceMatrix,
  pub allocation: SharpeOptimization,
  pub risk: RiskReport,
}

/// Single entry point for the returns → risk model → optimizer → risk metrics pipeline.
///
/// Holds configuration only, so one engine can serve concurrent callers.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Run the full analysis on aligned price series.
  pub fn analyze(&self, prices: &[AssetSeries]) -> Result<PortfolioAnalysis> {
    let returns = compute_returns(prices)?;
    self.analyze_returns(returns)
  }

  /// Run the full analysis on forecast paths, using their point estimates as prices.
  pub fn analyze_forecasts(&self, forecasts: &[ForecastSeries]) -> Result<PortfolioAnalysis> {
    let prices: Vec<AssetSeries> = forecasts.iter().map(AssetSeries::from).collect();
    self.analyze(&prices)
  }

  /// Run the analysis from already computed return series.
  pub fn analyze_returns(&self, returns: Vec<ReturnSeries>) -> Result<PortfolioAnalysis> {
    let (expected_returns, covariance) = compute_risk_model(&returns, self.config.periods_per_year)?;
    let allocation = optimize_max_sharpe(&expected_returns, &covariance, &self.config.optimizer)?;
    let risk = risk_report(&returns, &allocation.weights, self.config.confidence_level)?;

    info!(
      assets = allocation.assets.len(),
      expected_return = allocation.metrics.expected_return,
      risk = allocation.metrics.risk,
      sharpe = allocation.metrics.sharpe_ratio,
      value_at_risk = risk.value_at_risk,
      status = ?allocation.status,
      "portfolio analysis complete"
    );

    Ok(PortfolioAnalysis {
      returns,
      expected_returns,
      covariance,
      allocation,
      risk,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Days;
  use chrono::NaiveDate;

  use super::*;
  use crate::portfolio::error::PortfolioError;
  use crate::portfolio::types::ForecastPoint;

  fn prices() -> Vec<AssetSeries> {
    let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..40u64)
      .map(|i| start.checked_add_days(Days::new(i)).unwrap())
      .collect();
    let path = |base: f64, drift: f64, amp: f64, phase: f64| -> Vec<f64> {
      (0..40)
        .map(|i| {
          let t = f64::from(i);
          base * (1.0 + drift * t + amp * (t * 0.7 + phase).sin())
        })
        .collect()
    };

    vec![
      AssetSeries::new("TSLA", dates.clone(), path(400.0, 0.004, 0.05, 0.0)),
      AssetSeries::new("BND", dates.clone(), path(72.0, 0.0002, 0.003, 1.0)),
      AssetSeries::new("SPY", dates, path(600.0, 0.001, 0.01, 2.0)),
    ]
  }

  #[test]
  fn analyze_runs_full_pipeline() {
    let engine = PortfolioEngine::default();
    let analysis = engine.analyze(&prices()).unwrap();

    assert_eq!(analysis.allocation.assets, vec!["TSLA", "BND", "SPY"]);
    assert_eq!(analysis.returns[0].len(), 39);
    assert_eq!(analysis.risk.cumulative_returns.len(), 39);
    let sum: f64 = analysis.allocation.weights.iter().sum();
    assert!((sum - 1.0).abs() < 1e-6);
  }

  #[test]
  fn forecasts_are_analyzed_like_prices() {
    let engine = PortfolioEngine::default();
    let forecasts: Vec<ForecastSeries> = prices()
      .into_iter()
      .map(|s| {
        let points = s
          .dates
          .iter()
          .zip(&s.prices)
          .map(|(&date, &point)| ForecastPoint {
            date,
            point,
            lower: Some(point * 0.9),
            upper: Some(point * 1.1),
          })
          .collect();
        ForecastSeries::new(s.asset, points)
      })
      .collect();

    let from_forecasts = engine.analyze_forecasts(&forecasts).unwrap();
    let from_prices = engine.analyze(&prices()).unwrap();
    assert_eq!(from_forecasts, from_prices);
  }

  #[test]
  fn errors_surface_from_each_stage() {
    let engine = PortfolioEngine::default();
    assert_eq!(engine.analyze(&[]), Err(PortfolioError::EmptyInput));

    let short: Vec<AssetSeries> = prices()
      .into_iter()
      .take(2)
      .map(|s| AssetSeries::new(s.asset, s.dates[..5].to_vec(), s.prices[..5].to_vec()))
      .collect();
    assert!(matches!(
      engine.analyze(&short),
      Err(PortfolioError::InsufficientData { required: 10, actual: 4, .. })
    ));
  }
}
