//! # portfolio-rs
//!
//! $$
//! \max_{\mathbf w}\ \frac{\mathbf w^\top\mu - r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! $$
//!
//! Sharpe-optimal allocation, historical Value-at-Risk and cumulative-return
//! backtests for portfolios built from price or forecast series.
//!
//! Every stage is a pure function of its inputs; see [`portfolio::PortfolioEngine`]
//! for the end-to-end pipeline.

pub mod portfolio;
