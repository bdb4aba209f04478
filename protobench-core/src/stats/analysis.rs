//! Statistical analysis (percentiles, spread, CI)

use statrs::distribution::{ContinuousCDF, StudentsT};

use super::SummaryStats;

/// Calculate a percentile from sorted samples
///
/// `p` is in `[0, 100]`. Uses linear interpolation between the two closest
/// ranks: position `p / 100 * (n - 1)` in the sorted array.
pub fn percentile(sorted_samples: &[f64], p: f64) -> f64 {
    let (Some(&first), Some(&last)) = (sorted_samples.first(), sorted_samples.last()) else {
        return 0.0;
    };

    if p <= 0.0 {
        return first;
    }
    if p >= 100.0 {
        return last;
    }

    let rank = p / 100.0 * (sorted_samples.len() - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    let lower = sorted_samples[lower_idx];
    if lower_idx == upper_idx {
        return lower;
    }

    let upper = sorted_samples[upper_idx];
    lower + (rank - lower_idx as f64) * (upper - lower)
}

fn median(sorted_samples: &[f64]) -> f64 {
    let n = sorted_samples.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted_samples[n / 2],
        _ => (sorted_samples[n / 2 - 1] + sorted_samples[n / 2]) / 2.0,
    }
}

/// Population standard deviation (divides by n)
fn population_std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() <= 1 {
        return 0.0;
    }

    let variance = samples
        .iter()
        .map(|&sample| {
            let diff = sample - mean;
            diff * diff
        })
        .sum::<f64>()
        / samples.len() as f64;

    variance.sqrt()
}

/// Summarize a sequence of latency samples
///
/// Pure and deterministic. An empty input yields a zeroed digest with
/// `count = 0` and no percentiles.
pub fn compute(samples: &[f64]) -> SummaryStats {
    if samples.is_empty() {
        return SummaryStats::default();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;

    SummaryStats {
        mean,
        median: median(&sorted),
        std_dev: population_std_dev(&sorted, mean),
        min: sorted[0],
        max: sorted[count - 1],
        count,
        p50: Some(percentile(&sorted, 50.0)),
        p95: Some(percentile(&sorted, 95.0)),
        p99: Some(percentile(&sorted, 99.0)),
    }
}

/// Half-width of the confidence interval of the mean (Student's t)
///
/// For example, if mean = 0.100s and the result is 0.005s at 95% confidence,
/// the true mean is estimated to lie in [0.095s, 0.105s].
pub fn confidence_interval(samples: &[f64], confidence_level: f64) -> f64 {
    if samples.len() <= 1 {
        return 0.0;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let sample_variance =
        samples.iter().map(|&s| (s - mean) * (s - mean)).sum::<f64>() / (n - 1.0);

    let t_dist = match StudentsT::new(0.0, 1.0, n - 1.0) {
        Ok(dist) => dist,
        Err(_) => return 0.0,
    };

    // Two-tailed: 95% confidence uses the 97.5th percentile
    let alpha = 1.0 - confidence_level;
    let t_critical = match t_dist.inverse_cdf(1.0 - alpha / 2.0) {
        val if val.is_finite() => val,
        _ => return 0.0,
    };

    (t_critical * sample_variance.sqrt() / n.sqrt()).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_percentile_single() {
        assert_eq!(percentile(&[0.25], 50.0), 0.25);
        assert_eq!(percentile(&[0.25], 99.0), 0.25);
    }

    #[test]
    fn test_percentile_interpolates() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();

        // idx = 0.95 * 99 = 94.05 -> 95 + 0.05 * (96 - 95)
        assert!((percentile(&samples, 95.0) - 95.05).abs() < EPSILON);
        assert!((percentile(&samples, 50.0) - 50.5).abs() < EPSILON);
        assert!((percentile(&samples, 99.0) - 99.01).abs() < EPSILON);
    }

    #[test]
    fn test_percentile_boundaries() {
        let samples: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile(&samples, 0.0), 1.0);
        assert_eq!(percentile(&samples, 100.0), 10.0);
    }

    #[test]
    fn test_compute_empty() {
        let stats = compute(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.median, 0.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 0.0);
        assert!(stats.p50.is_none());
        assert!(stats.p95.is_none());
        assert!(stats.p99.is_none());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_compute_single_sample() {
        let stats = compute(&[1.0]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 1.0);
        assert_eq!(stats.median, 1.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.p99, Some(1.0));
    }

    #[test]
    fn test_compute_population_std_dev() {
        // Mean = 20, population variance = 200
        let stats = compute(&[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert!((stats.mean - 20.0).abs() < EPSILON);
        assert!((stats.std_dev - 200f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_compute_unsorted_input() {
        let stats = compute(&[3.0, 1.0, 4.0, 2.0]);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.p50, Some(2.5));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_percentiles_are_ordered(samples in vec(0.0f64..10.0, 1..2000)) {
            let stats = compute(&samples);
            let (p50, p95, p99) = (stats.p50.unwrap(), stats.p95.unwrap(), stats.p99.unwrap());

            prop_assert!(stats.min <= p50, "min {} > p50 {}", stats.min, p50);
            prop_assert!(p50 <= p95, "p50 {} > p95 {}", p50, p95);
            prop_assert!(p95 <= p99, "p95 {} > p99 {}", p95, p99);
            prop_assert!(p99 <= stats.max, "p99 {} > max {}", p99, stats.max);
            prop_assert_eq!(stats.count, samples.len());
        }

        #[test]
        fn prop_compute_is_deterministic(samples in vec(0.0f64..10.0, 1..2000)) {
            prop_assert_eq!(compute(&samples), compute(&samples));
        }

        #[test]
        fn prop_compute_ignores_input_order(samples in vec(0.0f64..10.0, 1..500)) {
            let mut reversed = samples.clone();
            reversed.reverse();
            let (a, b) = (compute(&samples), compute(&reversed));
            prop_assert_eq!(a.median, b.median);
            prop_assert_eq!(a.p99, b.p99);
            prop_assert!((a.mean - b.mean).abs() < EPSILON);
        }
    }

    #[test]
    fn test_confidence_interval_degenerate() {
        assert_eq!(confidence_interval(&[], 0.95), 0.0);
        assert_eq!(confidence_interval(&[0.5], 0.95), 0.0);
        assert_eq!(confidence_interval(&[0.5; 10], 0.95), 0.0);
    }

    #[test]
    fn test_confidence_interval_larger_for_higher_spread() {
        let narrow = confidence_interval(&[0.010, 0.011, 0.012, 0.013, 0.014], 0.95);
        let wide = confidence_interval(&[0.0, 0.010, 0.020, 0.030, 0.040], 0.95);
        assert!(narrow > 0.0);
        assert!(wide > narrow);
    }
}
