//! # Risk Metrics
//!
//! $$
//! \mathrm{VaR}_{\alpha} = Q_{1-\alpha}\!\left(\{\mathbf w^\top r_t\}_t\right),\qquad
//! C_t = \prod_{s\le t} (1 + \mathbf w^\top r_s)
//! $$
//!
//! Historical-simulation Value-at-Risk and compounded cumulative returns of a
//! fixed allocation.

use chrono::NaiveDate;
use ndarray::ArrayView1;
use ndarray::Axis;
use tracing::debug;

use super::data::check_return_alignment;
use super::error::PortfolioError;
use super::error::Result;
use super::risk_model::returns_matrix;
use super::types::ReturnSeries;
use super::types::RiskReport;

/// Fewer portfolio returns than this make the empirical percentile unreliable.
pub const MIN_VAR_OBSERVATIONS: usize = 10;

/// Default VaR confidence level.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Per-date portfolio returns `w·r_t`, paired with their dates.
pub fn portfolio_returns(returns: &[ReturnSeries], weights: &[f64]) -> Result<Vec<(NaiveDate, f64)>> {
  check_return_alignment(returns)?;
  if weights.len() != returns.len() {
    return Err(PortfolioError::DimensionMismatch(format!(
      "{} weights for {} assets",
      weights.len(),
      returns.len()
    )));
  }

  let w = ArrayView1::from(weights);
  let matrix = returns_matrix(returns);
  let daily = matrix
    .axis_iter(Axis(1))
    .map(|column| column.dot(&w));

  Ok(returns[0].dates.iter().copied().zip(daily).collect())
}

/// Percentile of `values` with linear interpolation between order statistics.
///
/// `q` is a fraction in `[0, 1]`. The rank is `q * (n - 1)`.
pub(crate) fn percentile_linear(values: &mut [f64], q: f64) -> f64 {
  values.sort_by(|a, b| a.total_cmp(b));
  let rank = q * (values.len() - 1) as f64;
  let lower = rank.floor() as usize;
  let upper = rank.ceil() as usize;
  let frac = rank - lower as f64;
  values[lower] + (values[upper] - values[lower]) * frac
}

/// Historical Value-at-Risk at `confidence_level`.
///
/// Returned as the `(1 - confidence_level)` percentile of the portfolio return
/// distribution, so a loss shows up as a negative number. Requires at least
/// [`MIN_VAR_OBSERVATIONS`] observations.
pub fn value_at_risk(returns: &[ReturnSeries], weights: &[f64], confidence_level: f64) -> Result<f64> {
  if !(confidence_level > 0.0 && confidence_level < 1.0) {
    return Err(PortfolioError::invalid(
      "confidence_level",
      format!("{confidence_level} is not in (0, 1)"),
    ));
  }

  let mut sample: Vec<f64> = portfolio_returns(returns, weights)?
    .into_iter()
    .map(|(_, r)| r)
    .collect();

  if sample.len() < MIN_VAR_OBSERVATIONS {
    return Err(PortfolioError::InsufficientData {
      asset: None,
      required: MIN_VAR_OBSERVATIONS,
      actual: sample.len(),
    });
  }

  let var = percentile_linear(&mut sample, 1.0 - confidence_level);
  debug!(
    confidence_level,
    observations = sample.len(),
    value_at_risk = var,
    "historical VaR"
  );

  Ok(var)
}

/// Compounded growth of one unit invested at `weights`, one value per return date.
pub fn cumulative_returns(returns: &[ReturnSeries], weights: &[f64]) -> Result<Vec<(NaiveDate, f64)>> {
  let daily = portfolio_returns(returns, weights)?;

  Ok(
    daily
      .into_iter()
      .scan(1.0, |acc, (date, r)| {
        *acc *= 1.0 + r;
        Some((date, *acc))
      })
      .collect(),
  )
}

/// VaR and cumulative-return curve for one allocation.
pub fn risk_report(returns: &[ReturnSeries], weights: &[f64], confidence_level: f64) -> Result<RiskReport> {
  Ok(RiskReport {
    value_at_risk: value_at_risk(returns, weights, confidence_level)?,
    confidence_level,
    cumulative_returns: cumulative_returns(returns, weights)?,
  })
}
