//! Two-sample hypothesis tests
//!
//! The Kolmogorov-Smirnov test covers continuous features, the chi-squared
//! homogeneity test covers categorical features. Both return the statistic
//! together with its p-value so callers decide significance themselves.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::Array1;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::{DriftwatchError, Result};

/// Statistic and p-value of one two-sample test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// The statistic is the supremum distance between the two empirical CDFs;
/// the p-value comes from the asymptotic Kolmogorov distribution with the
/// usual small-sample correction factor.
pub fn ks_test(reference: &Array1<f64>, new: &Array1<f64>) -> Result<TestStatistic> {
    let mut ref_sorted: Vec<f64> = reference.iter().copied().filter(|v| !v.is_nan()).collect();
    let mut new_sorted: Vec<f64> = new.iter().copied().filter(|v| !v.is_nan()).collect();

    if ref_sorted.is_empty() || new_sorted.is_empty() {
        return Err(DriftwatchError::StatisticalComputation(
            "KS test requires non-empty samples on both sides".to_string(),
        ));
    }

    ref_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    new_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n1 = ref_sorted.len() as f64;
    let n2 = new_sorted.len() as f64;

    // Walk both sorted samples, tracking the ECDF gap at every jump point.
    let mut i = 0;
    let mut j = 0;
    let mut statistic: f64 = 0.0;
    while i < ref_sorted.len() && j < new_sorted.len() {
        let x = ref_sorted[i].min(new_sorted[j]);
        while i < ref_sorted.len() && ref_sorted[i] <= x {
            i += 1;
        }
        while j < new_sorted.len() && new_sorted[j] <= x {
            j += 1;
        }
        statistic = statistic.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * statistic;
    let p_value = kolmogorov_sf(lambda);

    Ok(TestStatistic { statistic, p_value })
}

/// Survival function of the Kolmogorov distribution,
/// `Q(lambda) = 2 * sum_{j>=1} (-1)^{j-1} exp(-2 j^2 lambda^2)`.
fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda < 1e-10 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let term = (-2.0 * (j as f64 * lambda).powi(2)).exp();
        sum += sign * term;
        sign = -sign;
        if term < 1e-12 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Chi-squared homogeneity test on the 2 x k contingency table of category
/// counts over the union of categories observed on either side.
pub fn chi_square_test(reference: &[String], new: &[String]) -> Result<TestStatistic> {
    if reference.is_empty() || new.is_empty() {
        return Err(DriftwatchError::StatisticalComputation(
            "chi-squared test requires non-empty samples on both sides".to_string(),
        ));
    }

    let ref_counts = count_categories(reference);
    let new_counts = count_categories(new);

    let mut categories: Vec<&String> = ref_counts.keys().chain(new_counts.keys()).collect();
    categories.sort();
    categories.dedup();

    let k = categories.len();
    if k < 2 {
        return Err(DriftwatchError::StatisticalComputation(
            "chi-squared test needs at least two distinct categories".to_string(),
        ));
    }

    let ref_total = reference.len() as f64;
    let new_total = new.len() as f64;
    let grand_total = ref_total + new_total;

    let mut statistic = 0.0;
    for category in &categories {
        let observed_ref = ref_counts.get(*category).copied().unwrap_or(0) as f64;
        let observed_new = new_counts.get(*category).copied().unwrap_or(0) as f64;
        let column_total = observed_ref + observed_new;

        let expected_ref = ref_total * column_total / grand_total;
        let expected_new = new_total * column_total / grand_total;

        statistic += (observed_ref - expected_ref).powi(2) / expected_ref;
        statistic += (observed_new - expected_new).powi(2) / expected_new;
    }

    let dof = (k - 1) as f64;
    let dist = ChiSquared::new(dof).map_err(|e| {
        DriftwatchError::StatisticalComputation(format!("chi-squared distribution: {e}"))
    })?;
    let p_value = (1.0 - dist.cdf(statistic)).clamp(0.0, 1.0);

    Ok(TestStatistic { statistic, p_value })
}

fn count_categories(values: &[String]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ks_identical_samples() {
        let data = Array1::from_vec((0..50).map(|i| i as f64).collect());
        let result = ks_test(&data, &data.clone()).unwrap();

        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let reference = Array1::from_vec((0..100).map(|i| 20.0 + (i as f64) / 10.0).collect());
        let new = Array1::from_vec((0..100).map(|i| 60.0 + (i as f64) / 10.0).collect());

        let result = ks_test(&reference, &new).unwrap();

        assert_eq!(result.statistic, 1.0);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn test_ks_empty_sample_is_an_error() {
        let data = Array1::from_vec(vec![1.0, 2.0]);
        let empty = Array1::from_vec(vec![]);

        let err = ks_test(&data, &empty).unwrap_err();
        assert!(matches!(err, DriftwatchError::StatisticalComputation(_)));
    }

    #[test]
    fn test_ks_statistic_half_overlap() {
        // Reference all below 0, half the new sample above.
        let reference = Array1::from_vec(vec![-4.0, -3.0, -2.0, -1.0]);
        let new = Array1::from_vec(vec![-3.5, -2.5, 1.0, 2.0]);

        let result = ks_test(&reference, &new).unwrap();
        assert!((result.statistic - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_identical_distribution() {
        let reference = strings(&["a", "a", "b", "b", "c", "c"]);
        let new = strings(&["a", "a", "b", "b", "c", "c"]);

        let result = chi_square_test(&reference, &new).unwrap();

        assert!(result.statistic.abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chi_square_shifted_distribution() {
        let mut reference = Vec::new();
        let mut new = Vec::new();
        for _ in 0..90 {
            reference.push("a".to_string());
            new.push("b".to_string());
        }
        for _ in 0..10 {
            reference.push("b".to_string());
            new.push("a".to_string());
        }

        let result = chi_square_test(&reference, &new).unwrap();
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn test_chi_square_single_category_is_degenerate() {
        let reference = strings(&["a", "a", "a"]);
        let new = strings(&["a", "a"]);

        let err = chi_square_test(&reference, &new).unwrap_err();
        assert!(matches!(err, DriftwatchError::StatisticalComputation(_)));
    }

    #[test]
    fn test_kolmogorov_sf_bounds() {
        assert_eq!(kolmogorov_sf(0.0), 1.0);
        assert!(kolmogorov_sf(0.5) > 0.9);
        assert!(kolmogorov_sf(2.0) < 0.001);
    }
}
