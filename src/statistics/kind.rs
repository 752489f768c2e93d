//! Aggregate statistic kinds and their reference computations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-segment aggregate over a channel's pixel intensities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    #[default]
    Mean,
    Median,
}

impl StatisticKind {
    pub const ALL: [StatisticKind; 2] = [StatisticKind::Mean, StatisticKind::Median];

    pub fn name(&self) -> &'static str {
        match self {
            StatisticKind::Mean => "mean",
            StatisticKind::Median => "median",
        }
    }

    /// Select mean or median explicitly.
    pub fn from_use_mean(use_mean: bool) -> Self {
        if use_mean {
            StatisticKind::Mean
        } else {
            StatisticKind::Median
        }
    }

    /// Compute this statistic over `values`. Empty input yields NaN.
    pub fn compute(&self, values: &mut [f64]) -> f64 {
        match self {
            StatisticKind::Mean => mean(values),
            StatisticKind::Median => median(values),
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatisticKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(StatisticKind::Mean),
            "median" => Ok(StatisticKind::Median),
            other => Err(format!("Unknown statistic '{}', expected mean or median", other)),
        }
    }
}

/// Arithmetic mean, NaN for no values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median after an ascending sort: mean of the two central values for an even
/// count, the central value (index `ceil(n/2) - 1`) for an odd count. NaN for
/// no values.
pub fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_unstable_by(f64::total_cmp);
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n.div_ceil(2) - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [9.0]), 9.0);
        assert!(median(&mut []).is_nan());
    }

    #[test]
    fn test_median_sorts_unordered_input() {
        let mut values = [5.0, 1.0, 4.0, 2.0, 3.0, -1.0, 0.5];
        assert_eq!(median(&mut values), 2.0);
        assert_eq!(values, [-1.0, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Median".parse::<StatisticKind>().unwrap(), StatisticKind::Median);
        assert!("mode".parse::<StatisticKind>().is_err());
        assert_eq!(StatisticKind::Mean.to_string(), "mean");
        assert_eq!(StatisticKind::from_use_mean(false), StatisticKind::Median);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&StatisticKind::Median).unwrap();
        assert_eq!(json, "\"median\"");
    }
}
