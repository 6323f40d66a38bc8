use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p90: f64,
}

impl DescriptiveStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;

        Some(Self {
            count,
            mean,
            min: sorted[0],
            max: sorted[count - 1],
            p50: percentile(&sorted, 0.5),
            p90: percentile(&sorted, 0.9),
        })
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let rank = fraction * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_stats() {
        assert!(DescriptiveStats::from_values(&[]).is_none());
    }

    #[test]
    fn percentiles_interpolate_between_ranks() {
        let stats = DescriptiveStats::from_values(&[40.0, 10.0, 30.0, 20.0]).expect("stats");
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 25.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.p50, 25.0);
        assert!((stats.p90 - 37.0).abs() < 1e-9);
    }

    #[test]
    fn single_value_is_every_percentile() {
        let stats = DescriptiveStats::from_values(&[12.5]).expect("stats");
        assert_eq!((stats.p50, stats.p90, stats.mean), (12.5, 12.5, 12.5));
    }
}
