//! # Portfolio Data Utilities
//!
//! $$
//! r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Input validation, forecast alignment and simple-return construction.

use std::collections::HashSet;

use chrono::Days;
use chrono::NaiveDate;
use tracing::debug;

use super::error::PortfolioError;
use super::error::Result;
use super::types::AssetSeries;
use super::types::ReturnSeries;

fn check_unique<'a>(assets: impl IntoIterator<Item = &'a str>) -> Result<()> {
  let mut seen = HashSet::new();
  for asset in assets {
    if !seen.insert(asset) {
      return Err(PortfolioError::DuplicateAsset(asset.to_string()));
    }
  }
  Ok(())
}

fn check_dates_increasing(asset: &str, dates: &[NaiveDate]) -> Result<()> {
  for pair in dates.windows(2) {
    if pair[1] <= pair[0] {
      return Err(PortfolioError::UnsortedDates {
        asset: asset.to_string(),
        date: pair[1],
      });
    }
  }
  Ok(())
}

/// Verify that every series shares the date index of `reference`.
pub(crate) fn check_aligned(
  reference: (&str, &[NaiveDate]),
  other: (&str, &[NaiveDate]),
) -> Result<()> {
  let (ref_asset, ref_dates) = reference;
  let (asset, dates) = other;

  if dates.len() != ref_dates.len() {
    return Err(PortfolioError::Alignment {
      asset: asset.to_string(),
      reference: ref_asset.to_string(),
      detail: format!("{} dates vs {}", dates.len(), ref_dates.len()),
    });
  }

  if let Some(pos) = dates.iter().zip(ref_dates).position(|(a, b)| a != b) {
    return Err(PortfolioError::Alignment {
      asset: asset.to_string(),
      reference: ref_asset.to_string(),
      detail: format!(
        "date {} at position {pos} differs from {}",
        dates[pos], ref_dates[pos]
      ),
    });
  }

  Ok(())
}

fn validate_series(series: &AssetSeries) -> Result<()> {
  if series.prices.len() != series.dates.len() {
    return Err(PortfolioError::DimensionMismatch(format!(
      "asset '{}' has {} dates but {} prices",
      series.asset,
      series.dates.len(),
      series.prices.len()
    )));
  }

  check_dates_increasing(&series.asset, &series.dates)?;

  for (date, &price) in series.dates.iter().zip(&series.prices) {
    if !price.is_finite() || price <= 0.0 {
      return Err(PortfolioError::InvalidPrice {
        asset: series.asset.clone(),
        date: *date,
        price,
      });
    }
  }

  Ok(())
}

/// Simple returns of a single price vector, `len = prices.len() - 1`.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
  prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Convert aligned price series into simple return series.
///
/// The first date of every series is dropped, so all outputs keep one shared
/// date index. Fails with [`PortfolioError::Alignment`] if the inputs do not
/// share identical dates.
pub fn compute_returns(prices: &[AssetSeries]) -> Result<Vec<ReturnSeries>> {
  let first = prices.first().ok_or(PortfolioError::EmptyInput)?;
  check_unique(prices.iter().map(|s| s.asset.as_str()))?;

  for series in prices {
    validate_series(series)?;
    check_aligned(
      (&first.asset, &first.dates),
      (&series.asset, &series.dates),
    )?;
  }

  let dates: Vec<NaiveDate> = first.dates.iter().skip(1).copied().collect();
  let out: Vec<ReturnSeries> = prices
    .iter()
    .map(|s| ReturnSeries::new(s.asset.clone(), dates.clone(), simple_returns(&s.prices)))
    .collect();

  debug!(
    assets = out.len(),
    observations = dates.len(),
    "computed simple returns"
  );

  Ok(out)
}

/// Check that return series are non-empty, uniquely named and share one date index.
pub(crate) fn check_return_alignment(returns: &[ReturnSeries]) -> Result<()> {
  let first = returns.first().ok_or(PortfolioError::EmptyInput)?;
  check_unique(returns.iter().map(|r| r.asset.as_str()))?;

  for series in returns {
    if series.returns.len() != series.dates.len() {
      return Err(PortfolioError::DimensionMismatch(format!(
        "asset '{}' has {} dates but {} returns",
        series.asset,
        series.dates.len(),
        series.returns.len()
      )));
    }
    check_aligned(
      (&first.asset, &first.dates),
      (&series.asset, &series.dates),
    )?;
  }

  Ok(())
}

/// Place raw forecast vectors on a shared daily calendar beginning at `start`.
///
/// Each step advances one calendar day. All vectors must have the same length.
pub fn combine_forecasts(start: NaiveDate, forecasts: &[(&str, &[f64])]) -> Result<Vec<AssetSeries>> {
  let (first_asset, first_values) = forecasts.first().ok_or(PortfolioError::EmptyInput)?;
  check_unique(forecasts.iter().map(|(a, _)| *a))?;

  let n = first_values.len();
  for (asset, values) in forecasts {
    if values.len() != n {
      return Err(PortfolioError::Alignment {
        asset: asset.to_string(),
        reference: first_asset.to_string(),
        detail: format!("{} forecast steps vs {n}", values.len()),
      });
    }
  }

  let dates = (0..n as u64)
    .map(|i| {
      start.checked_add_days(Days::new(i)).ok_or_else(|| {
        PortfolioError::invalid("start", format!("calendar overflow after {i} days"))
      })
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(
    forecasts
      .iter()
      .map(|(asset, values)| AssetSeries::new(*asset, dates.clone(), values.to_vec()))
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n as u64)
      .map(|i| start.checked_add_days(Days::new(i)).unwrap())
      .collect()
  }

  #[test]
  fn returns_drop_first_date_uniformly() {
    let idx = dates(4);
    let prices = vec![
      AssetSeries::new("TSLA", idx.clone(), vec![100.0, 110.0, 99.0, 99.0]),
      AssetSeries::new("BND", idx.clone(), vec![50.0, 50.5, 50.0, 51.0]),
    ];

    let returns = compute_returns(&prices).unwrap();
    assert_eq!(returns.len(), 2);
    assert_eq!(returns[0].dates, idx[1..].to_vec());
    assert_eq!(returns[1].dates, returns[0].dates);

    assert_abs_diff_eq!(returns[0].returns[0], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(returns[0].returns[1], -0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(returns[0].returns[2], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(returns[1].returns[0], 0.01, epsilon = 1e-12);
  }

  #[test]
  fn misaligned_dates_are_rejected() {
    let idx = dates(4);
    let mut shifted = idx.clone();
    shifted[2] = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    shifted[3] = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();

    let prices = vec![
      AssetSeries::new("SPY", idx, vec![1.0, 2.0, 3.0, 4.0]),
      AssetSeries::new("BND", shifted, vec![1.0, 2.0, 3.0, 4.0]),
    ];

    match compute_returns(&prices) {
      Err(PortfolioError::Alignment { asset, reference, .. }) => {
        assert_eq!(asset, "BND");
        assert_eq!(reference, "SPY");
      }
      other => panic!("expected alignment error, got {other:?}"),
    }
  }

  #[test]
  fn unequal_lengths_are_rejected() {
    let prices = vec![
      AssetSeries::new("SPY", dates(4), vec![1.0, 2.0, 3.0, 4.0]),
      AssetSeries::new("BND", dates(3), vec![1.0, 2.0, 3.0]),
    ];
    assert!(matches!(
      compute_returns(&prices),
      Err(PortfolioError::Alignment { .. })
    ));
  }

  #[test]
  fn invalid_inputs_are_rejected() {
    assert_eq!(compute_returns(&[]), Err(PortfolioError::EmptyInput));

    let dup = vec![
      AssetSeries::new("SPY", dates(3), vec![1.0, 2.0, 3.0]),
      AssetSeries::new("SPY", dates(3), vec![1.0, 2.0, 3.0]),
    ];
    assert_eq!(
      compute_returns(&dup),
      Err(PortfolioError::DuplicateAsset("SPY".to_string()))
    );

    let bad_price = vec![AssetSeries::new("SPY", dates(3), vec![1.0, 0.0, 3.0])];
    assert!(matches!(
      compute_returns(&bad_price),
      Err(PortfolioError::InvalidPrice { price, .. }) if price == 0.0
    ));

    let mut unsorted = dates(3);
    unsorted.swap(1, 2);
    let unsorted = vec![AssetSeries::new("SPY", unsorted, vec![1.0, 2.0, 3.0])];
    assert!(matches!(
      compute_returns(&unsorted),
      Err(PortfolioError::UnsortedDates { .. })
    ));
  }

  #[test]
  fn forecasts_share_a_daily_calendar() {
    let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let tsla = [400.0, 404.0, 402.0];
    let bnd = [72.0, 72.1, 72.2];
    let series = combine_forecasts(start, &[("TSLA", &tsla[..]), ("BND", &bnd[..])]).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].dates, series[1].dates);
    assert_eq!(
      series[0].dates.last().copied(),
      NaiveDate::from_ymd_opt(2025, 2, 3)
    );

    let short = [1.0, 2.0];
    assert!(matches!(
      combine_forecasts(start, &[("TSLA", &tsla[..]), ("BND", &short[..])]),
      Err(PortfolioError::Alignment { .. })
    ));
  }
}
