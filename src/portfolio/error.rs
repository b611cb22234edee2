//! # Portfolio Errors
//!
//! Failure taxonomy shared by every stage of the portfolio pipeline.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the returns, risk model, optimizer and risk metric stages.
///
/// Every variant carries enough context (asset, sample sizes, offending values) to
/// diagnose the failure without re-running the pipeline. Non-convergence of the
/// optimizer is not an error, see [`super::types::OptimizationStatus`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
  /// No assets were supplied.
  #[error("no asset series supplied")]
  EmptyInput,

  /// The same asset identifier appears twice in one analysis.
  #[error("asset '{0}' appears more than once")]
  DuplicateAsset(String),

  /// Series do not share one common date index.
  #[error("asset '{asset}' is not aligned with '{reference}': {detail}")]
  Alignment {
    asset: String,
    reference: String,
    detail: String,
  },

  /// Dates inside one series are not strictly increasing.
  #[error("asset '{asset}' has non-increasing dates at {date}")]
  UnsortedDates { asset: String, date: NaiveDate },

  /// A price is zero, negative or not finite.
  #[error("asset '{asset}' has invalid price {price} on {date}")]
  InvalidPrice {
    asset: String,
    date: NaiveDate,
    price: f64,
  },

  /// Sample too small for a meaningful covariance or percentile estimate.
  #[error("insufficient data{}: {required} observations required, got {actual}", asset_suffix(.asset))]
  InsufficientData {
    asset: Option<String>,
    required: usize,
    actual: usize,
  },

  /// Portfolio standard deviation evaluated to zero, the Sharpe ratio is undefined.
  #[error("portfolio risk is zero (variance {variance:e}), Sharpe ratio undefined")]
  DegenerateRisk { variance: f64 },

  /// Vector or matrix dimensions (or asset labels) disagree.
  #[error("dimension mismatch: {0}")]
  DimensionMismatch(String),

  /// Box constraints admit no fully invested long-only portfolio.
  #[error("infeasible weight bounds: {0}")]
  InfeasibleBounds(String),

  /// A scalar parameter is outside its admissible range.
  #[error("invalid parameter '{name}': {reason}")]
  InvalidParameter { name: &'static str, reason: String },

  /// Failure reported by the numerical backend that is not one of the above.
  #[error("solver failure: {0}")]
  Solver(String),
}

impl PortfolioError {
  pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidParameter {
      name,
      reason: reason.into(),
    }
  }

  /// Recover a typed error from an `argmin` error, falling back to [`PortfolioError::Solver`].
  pub(crate) fn from_argmin(err: argmin::core::Error) -> Self {
    match err.downcast::<PortfolioError>() {
      Ok(inner) => inner,
      Err(other) => Self::Solver(other.to_string()),
    }
  }
}

fn asset_suffix(asset: &Option<String>) -> String {
  asset
    .as_ref()
    .map(|a| format!(" for '{a}'"))
    .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insufficient_data_message_names_asset() {
    let err = PortfolioError::InsufficientData {
      asset: Some("BND".to_string()),
      required: 2,
      actual: 1,
    };
    assert_eq!(
      err.to_string(),
      "insufficient data for 'BND': 2 observations required, got 1"
    );

    let err = PortfolioError::InsufficientData {
      asset: None,
      required: 10,
      actual: 9,
    };
    assert_eq!(
      err.to_string(),
      "insufficient data: 10 observations required, got 9"
    );
  }

  #[test]
  fn argmin_errors_round_trip_to_typed_errors() {
    let wrapped: argmin::core::Error = PortfolioError::DegenerateRisk { variance: 0.0 }.into();
    assert_eq!(
      PortfolioError::from_argmin(wrapped),
      PortfolioError::DegenerateRisk { variance: 0.0 }
    );

    let foreign = anyhow::anyhow!("line search failed");
    assert_eq!(
      PortfolioError::from_argmin(foreign),
      PortfolioError::Solver("line search failed".to_string())
    );
  }
}
