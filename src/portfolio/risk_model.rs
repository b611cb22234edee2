//! # Risk Model
//!
//! $$
//! \mu_i = k\,\bar r_i,\qquad \Sigma_{ij} = k\,\widehat{\operatorname{Cov}}(r_i, r_j)
//! $$
//!
//! Annualized expected returns and sample covariance from aligned return series,
//! with `k` the number of periods per year.
//!
//! Estimates from short windows (a few dozen observations) carry large sampling
//! error. They are returned as computed; a warning is logged below
//! [`SHORT_WINDOW_WARNING`] observations.

use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use tracing::debug;
use tracing::warn;

use super::data::check_return_alignment;
use super::error::PortfolioError;
use super::error::Result;
use super::types::AnnualizedReturns;
use super::types::CovarianceMatrix;
use super::types::ReturnSeries;

/// Trading days per year.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Minimum observations for a sample covariance.
pub const MIN_COVARIANCE_OBSERVATIONS: usize = 2;

/// Sample sizes below this are flagged as high-variance estimates.
pub const SHORT_WINDOW_WARNING: usize = 30;

/// Stack aligned return series into an `(assets, observations)` matrix.
pub(crate) fn returns_matrix(returns: &[ReturnSeries]) -> Array2<f64> {
  let n_obs = returns.first().map(|r| r.len()).unwrap_or(0);
  Array2::from_shape_fn((returns.len(), n_obs), |(i, t)| returns[i].returns[t])
}

/// Annualized mean-return vector and covariance matrix.
///
/// Fails with [`PortfolioError::InsufficientData`] when any series has fewer than
/// two observations.
pub fn compute_risk_model(
  returns: &[ReturnSeries],
  periods_per_year: u32,
) -> Result<(AnnualizedReturns, CovarianceMatrix)> {
  if periods_per_year == 0 {
    return Err(PortfolioError::invalid(
      "periods_per_year",
      "must be positive",
    ));
  }

  check_return_alignment(returns)?;

  for series in returns {
    if series.len() < MIN_COVARIANCE_OBSERVATIONS {
      return Err(PortfolioError::InsufficientData {
        asset: Some(series.asset.clone()),
        required: MIN_COVARIANCE_OBSERVATIONS,
        actual: series.len(),
      });
    }
  }

  let n_obs = returns[0].len();
  if n_obs < SHORT_WINDOW_WARNING {
    warn!(
      observations = n_obs,
      "short return window, annualized estimates have high sampling variance"
    );
  }

  let k = f64::from(periods_per_year);
  let matrix = returns_matrix(returns);

  let mean = matrix
    .mean_axis(Axis(1))
    .ok_or(PortfolioError::EmptyInput)?;
  let cov = matrix
    .cov(1.0)
    .map_err(|e| PortfolioError::Solver(e.to_string()))?;

  let assets: Vec<String> = returns.iter().map(|r| r.asset.clone()).collect();
  let expected = AnnualizedReturns::new(assets.clone(), mean * k);
  let covariance = CovarianceMatrix::new(assets, cov * k);

  debug!(
    assets = expected.len(),
    observations = n_obs,
    periods_per_year,
    "estimated annualized risk model"
  );

  Ok((expected, covariance))
}
