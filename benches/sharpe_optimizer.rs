use std::hint::black_box;

use chrono::Days;
use chrono::NaiveDate;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use portfolio_rs::portfolio::compute_returns;
use portfolio_rs::portfolio::compute_risk_model;
use portfolio_rs::portfolio::optimize_max_sharpe;
use portfolio_rs::portfolio::value_at_risk;
use portfolio_rs::portfolio::AssetSeries;
use portfolio_rs::portfolio::SharpeOptimizerConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;

const OBSERVATIONS: usize = 1_000;

fn prices(assets: usize, n: usize) -> Vec<AssetSeries> {
  let mut rng = StdRng::seed_from_u64(42);
  let start = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
  let dates: Vec<NaiveDate> = (0..n as u64)
    .map(|i| start.checked_add_days(Days::new(i)).unwrap())
    .collect();
  let market = Normal::new(0.0004, 0.01).unwrap();
  let market_path: Vec<f64> = (0..n).map(|_| market.sample(&mut rng)).collect();

  (0..assets)
    .map(|k| {
      let beta = 0.5 + k as f64 / assets as f64;
      let idio = Normal::new(0.0001 * k as f64, 0.005 + 0.002 * k as f64).unwrap();
      let mut price = 100.0;
      let path = market_path
        .iter()
        .enumerate()
        .map(|(i, m)| {
          if i > 0 {
            price *= 1.0 + beta * m + idio.sample(&mut rng);
          }
          price
        })
        .collect();
      AssetSeries::new(format!("A{k}"), dates.clone(), path)
    })
    .collect()
}

fn bench_risk_model(c: &mut Criterion) {
  let mut group = c.benchmark_group("RiskModel");

  for &assets in &[2, 5, 20] {
    let returns = compute_returns(&prices(assets, OBSERVATIONS)).unwrap();
    group.bench_with_input(BenchmarkId::new("annualized", assets), &returns, |b, returns| {
      b.iter(|| black_box(compute_risk_model(returns, 252).unwrap()))
    });
  }

  group.finish();
}

fn bench_optimizer(c: &mut Criterion) {
  let mut group = c.benchmark_group("SharpeOptimizer");
  let cfg = SharpeOptimizerConfig::default();

  for &assets in &[2, 5, 20] {
    let returns = compute_returns(&prices(assets, OBSERVATIONS)).unwrap();
    let (mu, cov) = compute_risk_model(&returns, 252).unwrap();
    group.bench_with_input(BenchmarkId::new("max_sharpe", assets), &(mu, cov), |b, (mu, cov)| {
      b.iter(|| black_box(optimize_max_sharpe(mu, cov, &cfg).unwrap()))
    });
  }

  group.finish();
}

fn bench_var(c: &mut Criterion) {
  let mut group = c.benchmark_group("RiskMetrics");
  let returns = compute_returns(&prices(5, OBSERVATIONS)).unwrap();
  let weights = vec![0.2; 5];

  group.bench_function("historical_var", |b| {
    b.iter(|| black_box(value_at_risk(&returns, &weights, 0.95).unwrap()))
  });

  group.finish();
}

criterion_group!(benches, bench_risk_model, bench_optimizer, bench_var);
criterion_main!(benches);
