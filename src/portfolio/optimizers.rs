//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}} -\frac{\mathbf{w}^\top\mu - r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! \quad\text{s.t.}\quad \mathbf 1^\top\mathbf w = 1,\ \ l_i \le w_i \le u_i
//! $$
//!
//! Maximum-Sharpe allocation under a budget and box constraints.
//!
//! The problem is solved with a spectral projected gradient method: a
//! Barzilai-Borwein scaled gradient step, an exact Euclidean projection onto the
//! feasible set and an Armijo backtracking search along the projected direction.
//! Coordinates whose bound is active are pinned exactly at that bound.
//!
//! The negative Sharpe ratio is not convex in general. With several correlated
//! assets the solver may stop at a local optimum; the result is still feasible.

use argmin::core::CostFunction;
use argmin::core::Error;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::core::IterState;
use argmin::core::OptimizationResult;
use argmin::core::Problem;
use argmin::core::Solver;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::core::KV;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::error::PortfolioError;
use super::error::Result;
use super::types::AnnualizedReturns;
use super::types::CovarianceMatrix;
use super::types::OptimizationStatus;
use super::types::PortfolioMetrics;
use super::types::SharpeOptimization;

/// Portfolio variance at or below this is treated as zero risk.
pub const MIN_VARIANCE: f64 = 1e-20;

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const STEP_MIN: f64 = 1e-10;
const STEP_MAX: f64 = 1e10;

/// Solver settings for [`optimize_max_sharpe`].
///
/// Two runs with the same configuration on the same inputs follow the same
/// iteration path and return identical results.
#[derive(Clone, Debug, PartialEq)]
pub struct SharpeOptimizerConfig {
  /// Annualized risk-free rate.
  pub risk_free: f64,
  /// Per-asset `(lower, upper)` weight bounds, `[0, 1]` for every asset if `None`.
  pub bounds: Option<Vec<(f64, f64)>>,
  /// Iteration cap.
  pub max_iters: u64,
  /// Stationarity tolerance on `‖P(w - ∇f) - w‖∞`.
  pub tolerance: f64,
}

impl Default for SharpeOptimizerConfig {
  fn default() -> Self {
    Self {
      risk_free: 0.02,
      bounds: None,
      max_iters: 1000,
      tolerance: 1e-8,
    }
  }
}

fn variance(w: ArrayView1<f64>, cov: ArrayView2<f64>) -> f64 {
  w.dot(&cov.dot(&w))
}

fn checked_risk(variance: f64) -> Result<f64> {
  if variance > MIN_VARIANCE {
    Ok(variance.sqrt())
  } else {
    Err(PortfolioError::DegenerateRisk { variance })
  }
}

/// Negative Sharpe ratio `-(w·μ - rf) / sqrt(wᵀΣw)`.
pub fn negative_sharpe(
  w: &[f64],
  mu: ArrayView1<f64>,
  cov: ArrayView2<f64>,
  risk_free: f64,
) -> Result<f64> {
  let w = ArrayView1::from(w);
  let risk = checked_risk(variance(w, cov))?;
  Ok(-(w.dot(&mu) - risk_free) / risk)
}

/// Gradient of [`negative_sharpe`] with respect to the weights.
///
/// $$
/// \nabla f = -\frac{\mu}{\sigma_p} + \frac{(\mathbf w^\top\mu - r_f)\,\Sigma\mathbf w}{\sigma_p^3}
/// $$
pub fn negative_sharpe_gradient(
  w: &[f64],
  mu: ArrayView1<f64>,
  cov: ArrayView2<f64>,
  risk_free: f64,
) -> Result<Vec<f64>> {
  let w = ArrayView1::from(w);
  let sigma_w = cov.dot(&w);
  let var = w.dot(&sigma_w);
  let risk = checked_risk(var)?;
  let excess = w.dot(&mu) - risk_free;

  let grad = mu.mapv(|m| -m / risk) + sigma_w * (excess / (var * risk));
  Ok(grad.to_vec())
}

/// Expected return, risk and Sharpe ratio of `weights`.
pub fn portfolio_metrics(
  weights: &[f64],
  expected_returns: &AnnualizedReturns,
  covariance: &CovarianceMatrix,
  risk_free: f64,
) -> Result<PortfolioMetrics> {
  check_model(expected_returns, covariance)?;
  if weights.len() != expected_returns.len() {
    return Err(PortfolioError::DimensionMismatch(format!(
      "{} weights for {} assets",
      weights.len(),
      expected_returns.len()
    )));
  }

  let w = ArrayView1::from(weights);
  let expected_return = w.dot(&expected_returns.values);
  let risk = checked_risk(variance(w, covariance.values.view()))?;

  Ok(PortfolioMetrics {
    expected_return,
    risk,
    sharpe_ratio: (expected_return - risk_free) / risk,
  })
}

/// Negative Sharpe ratio as an `argmin` problem.
#[derive(Clone, Debug)]
pub struct NegativeSharpe {
  mu: Array1<f64>,
  cov: Array2<f64>,
  risk_free: f64,
}

impl NegativeSharpe {
  pub fn new(mu: Array1<f64>, cov: Array2<f64>, risk_free: f64) -> Self {
    Self { mu, cov, risk_free }
  }
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    Ok(negative_sharpe(
      w,
      self.mu.view(),
      self.cov.view(),
      self.risk_free,
    )?)
  }
}

impl Gradient for NegativeSharpe {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, w: &Self::Param) -> std::result::Result<Self::Gradient, argmin::core::Error> {
    Ok(negative_sharpe_gradient(
      w,
      self.mu.view(),
      self.cov.view(),
      self.risk_free,
    )?)
  }
}

fn check_model(expected_returns: &AnnualizedReturns, covariance: &CovarianceMatrix) -> Result<()> {
  let n = expected_returns.len();
  if n == 0 {
    return Err(PortfolioError::EmptyInput);
  }
  if expected_returns.values.len() != n || covariance.values.dim() != (n, n) {
    return Err(PortfolioError::DimensionMismatch(format!(
      "{n} assets, {} expected returns, covariance shape {:?}",
      expected_returns.values.len(),
      covariance.values.dim()
    )));
  }
  if expected_returns.assets != covariance.assets {
    return Err(PortfolioError::DimensionMismatch(format!(
      "expected returns assets {:?} differ from covariance assets {:?}",
      expected_returns.assets, covariance.assets
    )));
  }
  Ok(())
}

fn resolve_bounds(bounds: Option<&[(f64, f64)]>, n: usize) -> Result<(Vec<f64>, Vec<f64>)> {
  let (lo, hi): (Vec<f64>, Vec<f64>) = match bounds {
    None => (vec![0.0; n], vec![1.0; n]),
    Some(b) if b.len() == n => b.iter().copied().unzip(),
    Some(b) => {
      return Err(PortfolioError::DimensionMismatch(format!(
        "{} bounds for {n} assets",
        b.len()
      )))
    }
  };

  for (i, (&l, &h)) in lo.iter().zip(&hi).enumerate() {
    if !(0.0..=1.0).contains(&l) || !(0.0..=1.0).contains(&h) || l > h {
      return Err(PortfolioError::InfeasibleBounds(format!(
        "asset {i} has bounds [{l}, {h}], need 0 <= lower <= upper <= 1"
      )));
    }
  }

  let (sum_lo, sum_hi) = (lo.iter().sum::<f64>(), hi.iter().sum::<f64>());
  if sum_lo > 1.0 + 1e-12 || sum_hi < 1.0 - 1e-12 {
    return Err(PortfolioError::InfeasibleBounds(format!(
      "bounds sum to [{sum_lo}, {sum_hi}], which excludes a fully invested portfolio"
    )));
  }

  Ok((lo, hi))
}

/// Euclidean projection of `v` onto `{w : Σw = 1, lo ≤ w ≤ hi}`.
///
/// The projection is `clip(v - θ, lo, hi)` for the unique shift `θ` at which
/// the clipped vector sums to one; `θ` is found by bisection.
pub(crate) fn project_budget_box(v: &[f64], lo: &[f64], hi: &[f64]) -> Vec<f64> {
  let clipped_sum = |theta: f64| -> f64 {
    v.iter()
      .zip(lo.iter().zip(hi))
      .map(|(&x, (&l, &h))| (x - theta).clamp(l, h))
      .sum()
  };

  let mut a = v
    .iter()
    .zip(hi)
    .map(|(x, h)| x - h)
    .fold(f64::INFINITY, f64::min);
  let mut b = v
    .iter()
    .zip(lo)
    .map(|(x, l)| x - l)
    .fold(f64::NEG_INFINITY, f64::max);

  // clipped_sum(a) = Σhi ≥ 1 and clipped_sum(b) = Σlo ≤ 1
  for _ in 0..200 {
    let mid = 0.5 * (a + b);
    if mid <= a || mid >= b {
      break;
    }
    if clipped_sum(mid) > 1.0 {
      a = mid;
    } else {
      b = mid;
    }
  }

  // clipped_sum(b) <= 1; coordinates clamped at b sit exactly on their bound
  v.iter()
    .zip(lo.iter().zip(hi))
    .map(|(&x, (&l, &h))| (x - b).clamp(l, h))
    .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn stationarity(w: &[f64], g: &[f64], lo: &[f64], hi: &[f64]) -> f64 {
  let trial: Vec<f64> = w.iter().zip(g).map(|(wi, gi)| wi - gi).collect();
  project_budget_box(&trial, lo, hi)
    .iter()
    .zip(w)
    .map(|(p, wi)| (p - wi).abs())
    .fold(0.0, f64::max)
}

/// Iteration state of [`SpectralProjectedGradient`]: weights, weight gradient and cost.
pub type SpgState = IterState<Vec<f64>, Vec<f64>, (), (), (), f64>;

/// Spectral projected gradient over `{Σw = 1, lo ≤ w ≤ hi}` as an `argmin` solver.
///
/// Each iteration takes a Barzilai-Borwein scaled gradient step, projects it onto
/// the feasible set and backtracks along the projected direction until the
/// Armijo condition holds. The run converges once `‖P(w - ∇f) - w‖∞ ≤ tolerance`,
/// or once the cost has stopped moving at rounding level while the stationarity
/// measure is below [`STALL_STATIONARITY`].
#[derive(Clone, Debug)]
pub struct SpectralProjectedGradient {
  lo: Vec<f64>,
  hi: Vec<f64>,
  tolerance: f64,
  step: f64,
  stationarity: f64,
  stalled: bool,
}

/// Stationarity below which a stalled cost counts as converged.
pub const STALL_STATIONARITY: f64 = 1e-7;

impl SpectralProjectedGradient {
  pub fn new(lo: Vec<f64>, hi: Vec<f64>, tolerance: f64) -> Self {
    Self {
      lo,
      hi,
      tolerance,
      step: 1.0,
      stationarity: f64::INFINITY,
      stalled: false,
    }
  }

  /// Last measured `‖P(w - ∇f) - w‖∞`.
  pub fn stationarity(&self) -> f64 {
    self.stationarity
  }
}

fn missing(what: &str) -> PortfolioError {
  PortfolioError::Solver(format!("spectral projected gradient: missing {what} in solver state"))
}

impl<O> Solver<O, SpgState> for SpectralProjectedGradient
where
  O: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
  const NAME: &'static str = "Spectral Projected Gradient";

  fn init(
    &mut self,
    problem: &mut Problem<O>,
    state: SpgState,
  ) -> std::result::Result<(SpgState, Option<KV>), Error> {
    let x0 = state.get_param().ok_or_else(|| missing("initial weights"))?;
    let w = project_budget_box(x0, &self.lo, &self.hi);
    let f = problem.cost(&w)?;
    let g = problem.gradient(&w)?;

    self.stationarity = stationarity(&w, &g, &self.lo, &self.hi);
    self.step = if self.stationarity > 0.0 {
      (1.0 / self.stationarity).clamp(STEP_MIN, STEP_MAX)
    } else {
      1.0
    };
    self.stalled = false;

    Ok((state.param(w).cost(f).gradient(g), None))
  }

  fn next_iter(
    &mut self,
    problem: &mut Problem<O>,
    state: SpgState,
  ) -> std::result::Result<(SpgState, Option<KV>), Error> {
    let w = state.get_param().ok_or_else(|| missing("weights"))?.clone();
    let g = state.get_gradient().ok_or_else(|| missing("gradient"))?.clone();
    let f = state.get_cost();

    let trial: Vec<f64> = w.iter().zip(&g).map(|(wi, gi)| wi - self.step * gi).collect();
    let d: Vec<f64> = project_budget_box(&trial, &self.lo, &self.hi)
      .iter()
      .zip(&w)
      .map(|(p, wi)| p - wi)
      .collect();
    let slope = dot(&g, &d);

    let mut t = 1.0;
    let mut w_new: Vec<f64> = w.iter().zip(&d).map(|(wi, di)| wi + t * di).collect();
    let mut f_new = problem.cost(&w_new)?;
    for _ in 0..MAX_BACKTRACKS {
      if f_new <= f + ARMIJO_C * t * slope {
        break;
      }
      t *= 0.5;
      w_new = w.iter().zip(&d).map(|(wi, di)| wi + t * di).collect();
      f_new = problem.cost(&w_new)?;
    }

    let g_new = problem.gradient(&w_new)?;
    let s: Vec<f64> = w_new.iter().zip(&w).map(|(a, b)| a - b).collect();
    let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
    let sy = dot(&s, &y);
    self.step = if sy > 0.0 {
      (dot(&s, &s) / sy).clamp(STEP_MIN, STEP_MAX)
    } else {
      STEP_MAX
    };

    // cost differences near |f| * eps are rounding noise
    self.stalled = f - f_new <= f64::EPSILON * f.abs().max(1.0);
    self.stationarity = stationarity(&w_new, &g_new, &self.lo, &self.hi);

    trace!(
      iteration = state.get_iter() + 1,
      cost = f_new,
      step = self.step,
      stationarity = self.stationarity,
      "projected gradient step"
    );

    Ok((state.param(w_new).cost(f_new).gradient(g_new), None))
  }

  fn terminate(&mut self, _state: &SpgState) -> TerminationStatus {
    if self.stationarity <= self.tolerance
      || (self.stalled && self.stationarity <= STALL_STATIONARITY)
    {
      TerminationStatus::Terminated(TerminationReason::SolverConverged)
    } else {
      TerminationStatus::NotTerminated
    }
  }
}

/// Weights maximizing the Sharpe ratio subject to `Σw = 1` and the box bounds.
///
/// The solve starts from equal weights. When the iteration cap is hit first the
/// best feasible point found is returned with
/// [`OptimizationStatus::MaxIterationsReached`]; callers should check
/// [`SharpeOptimization::status`] before trusting convergence.
pub fn optimize_max_sharpe(
  expected_returns: &AnnualizedReturns,
  covariance: &CovarianceMatrix,
  config: &SharpeOptimizerConfig,
) -> Result<SharpeOptimization> {
  check_model(expected_returns, covariance)?;

  if !config.risk_free.is_finite() {
    return Err(PortfolioError::invalid("risk_free", "must be finite"));
  }
  if !(config.tolerance > 0.0) {
    return Err(PortfolioError::invalid("tolerance", "must be positive"));
  }
  if expected_returns.values.iter().any(|x| !x.is_finite())
    || covariance.values.iter().any(|x| !x.is_finite())
  {
    return Err(PortfolioError::invalid(
      "risk_model",
      "expected returns and covariance must be finite",
    ));
  }

  let n = expected_returns.len();
  let (lo, hi) = resolve_bounds(config.bounds.as_deref(), n)?;

  let problem = NegativeSharpe::new(
    expected_returns.values.clone(),
    covariance.values.clone(),
    config.risk_free,
  );
  let solver = SpectralProjectedGradient::new(lo, hi, config.tolerance);
  let x0 = vec![1.0 / n as f64; n];

  let OptimizationResult {
    solver, mut state, ..
  } = Executor::new(problem, solver)
    .configure(|state| state.param(x0).max_iters(config.max_iters))
    .run()
    .map_err(PortfolioError::from_argmin)?;

  let status = match state.get_termination_reason() {
    Some(TerminationReason::SolverConverged) => OptimizationStatus::Converged,
    Some(TerminationReason::MaxItersReached) => OptimizationStatus::MaxIterationsReached,
    other => {
      return Err(PortfolioError::Solver(format!(
        "unexpected termination: {other:?}"
      )))
    }
  };
  let iterations = state.get_iter();
  let best_cost = state.get_best_cost();
  let weights = match status {
    OptimizationStatus::Converged => state.take_param(),
    OptimizationStatus::MaxIterationsReached => state.take_best_param(),
  }
  .ok_or_else(|| missing("final weights"))?;

  let metrics = portfolio_metrics(&weights, expected_returns, covariance, config.risk_free)?;

  match status {
    OptimizationStatus::Converged => debug!(
      iterations,
      stationarity = solver.stationarity(),
      sharpe = metrics.sharpe_ratio,
      "max-Sharpe solve converged"
    ),
    OptimizationStatus::MaxIterationsReached => warn!(
      iterations,
      cost = best_cost,
      stationarity = solver.stationarity(),
      "max-Sharpe solve hit the iteration cap before converging"
    ),
  }

  Ok(SharpeOptimization {
    assets: expected_returns.assets.clone(),
    weights,
    metrics,
    status,
    iterations,
  })
}
