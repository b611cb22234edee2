//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Series, estimates and result containers passed between pipeline stages.

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;

/// Price history (or converted forecast) of one asset.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetSeries {
  /// Asset identifier, e.g. a ticker.
  pub asset: String,
  /// Observation dates, strictly increasing.
  pub dates: Vec<NaiveDate>,
  /// Prices, one per date.
  pub prices: Vec<f64>,
}

impl AssetSeries {
  pub fn new(asset: impl Into<String>, dates: Vec<NaiveDate>, prices: Vec<f64>) -> Self {
    Self {
      asset: asset.into(),
      dates,
      prices,
    }
  }

  /// Build a series from `(date, price)` pairs.
  pub fn from_points(asset: impl Into<String>, points: &[(NaiveDate, f64)]) -> Self {
    let (dates, prices) = points.iter().copied().unzip();
    Self::new(asset, dates, prices)
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }
}

/// Simple periodic returns of one asset.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnSeries {
  pub asset: String,
  /// Dates of the return observations (the first price date is dropped).
  pub dates: Vec<NaiveDate>,
  /// `price[t] / price[t-1] - 1`.
  pub returns: Vec<f64>,
}

impl ReturnSeries {
  pub fn new(asset: impl Into<String>, dates: Vec<NaiveDate>, returns: Vec<f64>) -> Self {
    Self {
      asset: asset.into(),
      dates,
      returns,
    }
  }

  pub fn len(&self) -> usize {
    self.returns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.returns.is_empty()
  }
}

/// One step of an externally produced price forecast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForecastPoint {
  pub date: NaiveDate,
  /// Point estimate of the price.
  pub point: f64,
  /// Lower bound of the forecast interval.
  pub lower: Option<f64>,
  /// Upper bound of the forecast interval.
  pub upper: Option<f64>,
}

/// Forecast path of one asset.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastSeries {
  pub asset: String,
  pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
  pub fn new(asset: impl Into<String>, points: Vec<ForecastPoint>) -> Self {
    Self {
      asset: asset.into(),
      points,
    }
  }

  /// Treat the point estimates as a price series.
  pub fn to_asset_series(&self) -> AssetSeries {
    AssetSeries {
      asset: self.asset.clone(),
      dates: self.points.iter().map(|p| p.date).collect(),
      prices: self.points.iter().map(|p| p.point).collect(),
    }
  }

  /// Forecast interval `(lower, upper)` per date, where both bounds are present.
  pub fn intervals(&self) -> Vec<(NaiveDate, f64, f64)> {
    self
      .points
      .iter()
      .filter_map(|p| Some((p.date, p.lower?, p.upper?)))
      .collect()
  }
}

impl From<&ForecastSeries> for AssetSeries {
  fn from(forecast: &ForecastSeries) -> Self {
    forecast.to_asset_series()
  }
}

/// Annualized mean return per asset.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnualizedReturns {
  pub assets: Vec<String>,
  pub values: Array1<f64>,
}

impl AnnualizedReturns {
  pub fn new(assets: Vec<String>, values: Array1<f64>) -> Self {
    Self { assets, values }
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  pub fn get(&self, asset: &str) -> Option<f64> {
    let idx = self.assets.iter().position(|a| a == asset)?;
    Some(self.values[idx])
  }
}

/// Annualized covariance of asset returns.
#[derive(Clone, Debug, PartialEq)]
pub struct CovarianceMatrix {
  pub assets: Vec<String>,
  pub values: Array2<f64>,
}

impl CovarianceMatrix {
  pub fn new(assets: Vec<String>, values: Array2<f64>) -> Self {
    Self { assets, values }
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Covariance of an asset pair.
  pub fn get(&self, a: &str, b: &str) -> Option<f64> {
    let i = self.assets.iter().position(|x| x == a)?;
    let j = self.assets.iter().position(|x| x == b)?;
    Some(self.values[[i, j]])
  }

  /// Annualized standard deviation per asset.
  pub fn volatilities(&self) -> Array1<f64> {
    self.values.diag().mapv(|v| v.max(0.0).sqrt())
  }

  /// Pearson correlation implied by the covariance.
  ///
  /// Pairs involving a zero-variance asset get correlation `0` off the diagonal.
  pub fn correlation(&self) -> Array2<f64> {
    let n = self.len();
    let sigma = self.volatilities();
    Array2::from_shape_fn((n, n), |(i, j)| {
      let denom = sigma[i] * sigma[j];
      if i == j {
        1.0
      } else if denom > 1e-15 {
        (self.values[[i, j]] / denom).clamp(-1.0, 1.0)
      } else {
        0.0
      }
    })
  }
}

/// Return, volatility and Sharpe ratio of a weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PortfolioMetrics {
  /// `w·μ`, annualized if the inputs are.
  pub expected_return: f64,
  /// `sqrt(wᵀΣw)`.
  pub risk: f64,
  /// `(expected_return - risk_free) / risk`.
  pub sharpe_ratio: f64,
}

/// How the optimizer stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizationStatus {
  /// Stationarity tolerance met.
  Converged,
  /// Iteration cap hit first; the weights are the best feasible point found.
  MaxIterationsReached,
}

impl OptimizationStatus {
  pub fn is_converged(&self) -> bool {
    matches!(self, Self::Converged)
  }
}

/// Output of the Sharpe optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct SharpeOptimization {
  pub assets: Vec<String>,
  /// Optimal weights in input asset order.
  pub weights: Vec<f64>,
  pub metrics: PortfolioMetrics,
  pub status: OptimizationStatus,
  /// Solver iterations performed.
  pub iterations: u64,
}

impl SharpeOptimization {
  pub fn weight(&self, asset: &str) -> Option<f64> {
    let idx = self.assets.iter().position(|a| a == asset)?;
    Some(self.weights[idx])
  }
}

/// Historical downside risk of a fixed allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskReport {
  /// Empirical `(1 - confidence_level)` percentile of portfolio returns.
  pub value_at_risk: f64,
  pub confidence_level: f64,
  /// Compounded growth of one unit, one value per return date.
  pub cumulative_returns: Vec<(NaiveDate, f64)>,
}

impl RiskReport {
  /// Total compounded return over the whole history.
  pub fn total_return(&self) -> f64 {
    self
      .cumulative_returns
      .last()
      .map(|(_, v)| v - 1.0)
      .unwrap_or(0.0)
  }
}
