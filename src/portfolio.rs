//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Maximum-Sharpe allocation and historical risk analytics over aligned price
//! or forecast series.

pub mod accuracy;
pub mod data;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod optimizers;
pub mod risk_model;
pub mod types;

pub use accuracy::ForecastAccuracy;
pub use data::combine_forecasts;
pub use data::compute_returns;
pub use data::simple_returns;
pub use engine::PortfolioAnalysis;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use error::PortfolioError;
pub use metrics::cumulative_returns;
pub use metrics::portfolio_returns;
pub use metrics::risk_report;
pub use metrics::value_at_risk;
pub use optimizers::negative_sharpe;
pub use optimizers::negative_sharpe_gradient;
pub use optimizers::optimize_max_sharpe;
pub use optimizers::portfolio_metrics;
pub use optimizers::NegativeSharpe;
pub use optimizers::SharpeOptimizerConfig;
pub use optimizers::SpectralProjectedGradient;
pub use risk_model::compute_risk_model;
pub use risk_model::TRADING_DAYS_PER_YEAR;
pub use types::AnnualizedReturns;
pub use types::AssetSeries;
pub use types::CovarianceMatrix;
pub use types::ForecastPoint;
pub use types::ForecastSeries;
pub use types::OptimizationStatus;
pub use types::PortfolioMetrics;
pub use types::ReturnSeries;
pub use types::RiskReport;
pub use types::SharpeOptimization;
