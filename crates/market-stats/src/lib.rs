//! Shared statistical primitives used by signal fusion, the consensus
//! engine, and market ingestion. Adapted from the adaptive-threshold helpers
//! that used to live next to the core types, generalized to probability
//! fusion rather than price-series technicals.

use statrs::statistics::Statistics;

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n-1 denominator). Returns 0.0 for fewer than
/// two observations.
pub fn sample_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Population standard deviation (n denominator). Used for disagreement_index
/// and signal_alignment, both of which treat the current agent set as the
/// whole population rather than a sample of a larger one.
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Percentile rank of `value` within `data`, in [0, 1]. Ties count as half.
pub fn percentile_rank(value: f64, data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.5;
    }
    let count_below = data.iter().filter(|&&x| x < value).count();
    let count_equal = data.iter().filter(|&&x| (x - value).abs() < f64::EPSILON).count();
    (count_below as f64 + 0.5 * count_equal as f64) / data.len() as f64
}

/// Z-score of `value` relative to `data`. Returns 0.0 when `data` has no
/// meaningful spread.
pub fn z_score_of(value: f64, data: &[f64]) -> f64 {
    let sd = sample_std_dev(data);
    if sd < f64::EPSILON {
        return 0.0;
    }
    (value - mean(data)) / sd
}

/// Weighted mean of `values` against `weights` of the same length. Falls
/// back to an unweighted mean if the weights sum to ~0.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum.abs() < f64::EPSILON {
        return mean(values);
    }
    values
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / weight_sum
}

/// Largest pairwise absolute difference within `data`, or 0.0 if fewer than
/// two observations are present.
pub fn max_pairwise_spread(data: &[f64]) -> f64 {
    let mut max_spread = 0.0_f64;
    for i in 0..data.len() {
        for j in (i + 1)..data.len() {
            max_spread = max_spread.max((data[i] - data[j]).abs());
        }
    }
    max_spread
}

/// `statrs`-backed arithmetic mean, used where the caller already has an
/// owned vector and wants parity with the library's conventions (kept
/// alongside the hand-rolled `mean` above for call sites that pass slices
/// without allocating).
pub fn statrs_mean(data: Vec<f64>) -> f64 {
    data.mean()
}

pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_vs_sample_std_dev_differ() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(population_std_dev(&data) < sample_std_dev(&data));
    }

    #[test]
    fn percentile_rank_midpoint() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile_rank(3.0, &data) - 0.5).abs() < 0.01);
    }

    #[test]
    fn weighted_mean_matches_plain_mean_with_equal_weights() {
        let values = vec![0.4, 0.6, 0.5];
        let weights = vec![1.0, 1.0, 1.0];
        assert!((weighted_mean(&values, &weights) - mean(&values)).abs() < 1e-9);
    }

    #[test]
    fn max_pairwise_spread_finds_extremes() {
        let data = vec![0.2, 0.5, 0.9];
        assert!((max_pairwise_spread(&data) - 0.7).abs() < 1e-9);
    }
}
