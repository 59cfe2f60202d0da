//! Descriptive Statistics
//!
//! Pure functions over measurement values. None of them fail: empty or
//! too-short input degrades to 0.0.

use serde::Serialize;

/// Denominators with a smaller magnitude make [`pearson`] return 0.0
pub const PEARSON_EPSILON: f64 = 1e-10;

/// Arithmetic mean; 0.0 for empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divisor n-1); 0.0 for fewer than 2 values
pub fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Mean absolute deviation from the mean; 0.0 for empty input
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64
}

/// Sum of all values
pub fn total(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Sample Pearson correlation coefficient
///
/// Uses the raw-moment form
/// `(nΣxy − ΣxΣy) / sqrt((nΣx² − (Σx)²)(nΣy² − (Σy)²))`.
///
/// Returns 0.0 when the inputs differ in length, hold fewer than two pairs,
/// or either side has (near) zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }

    let n = x.len() as f64;

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    // Rounding can push the product slightly negative, giving NaN
    if denominator.is_nan() || denominator.abs() < PEARSON_EPSILON {
        return 0.0;
    }
    numerator / denominator
}

/// Count, mean, sample stdev and MAD of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub stdev: f64,
    pub mad: f64,
}

impl Summary {
    /// Summarise `values`; `None` when there is nothing to summarise
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            count: values.len(),
            mean: mean(values),
            stdev: stdev(values),
            mad: mad(values),
        })
    }
}
