//! # Forecast Accuracy
//!
//! $$
//! \mathrm{MAE}=\frac1n\sum_{i=1}^n |y_i-\hat y_i|
//! $$
//!
//! Error metrics between realized prices and the forecast that feeds the engine.

use tracing::info;

use super::error::PortfolioError;
use super::error::Result;

/// Accuracy of a price forecast against realized prices.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct ForecastAccuracy {
  /// Mean Absolute Error
  pub mae: f64,
  /// Root Mean Squared Error
  pub rmse: f64,
  /// Mean Absolute Percentage Error (in %)
  pub mape: f64,
}

impl ForecastAccuracy {
  /// MAE, RMSE and MAPE of `forecast` against `actual`, in one pass.
  ///
  /// Points with a zero actual are left out of the MAPE average.
  pub fn evaluate(actual: &[f64], forecast: &[f64]) -> Result<Self> {
    if actual.is_empty() {
      return Err(PortfolioError::EmptyInput);
    }
    if actual.len() != forecast.len() {
      return Err(PortfolioError::DimensionMismatch(format!(
        "{} actual values vs {} forecast values",
        actual.len(),
        forecast.len()
      )));
    }

    // (Σ|e|, Σe², Σ|e|/|a| over non-zero actuals, count of those)
    let (abs_sum, sq_sum, pct_sum, pct_count) = actual.iter().zip(forecast).fold(
      (0.0, 0.0, 0.0, 0usize),
      |(abs_sum, sq_sum, pct_sum, pct_count), (&a, &f)| {
        let err = (a - f).abs();
        if a.abs() >= f64::EPSILON {
          (abs_sum + err, sq_sum + err * err, pct_sum + err / a.abs(), pct_count + 1)
        } else {
          (abs_sum + err, sq_sum + err * err, pct_sum, pct_count)
        }
      },
    );

    let n = actual.len() as f64;
    let acc = Self {
      mae: abs_sum / n,
      rmse: (sq_sum / n).sqrt(),
      mape: if pct_count == 0 {
        0.0
      } else {
        pct_sum / pct_count as f64 * 100.0
      },
    };
    info!(mae = acc.mae, rmse = acc.rmse, mape = acc.mape, "forecast accuracy");

    Ok(acc)
  }
}
