//! Inequality of burden across devices.

/// Gini coefficient: half the relative mean absolute pairwise difference,
/// `Σ_i Σ_j |v_i - v_j| / (2 n² m)`.
///
/// Evaluated in `O(n log n)` through the sorted form
/// `Σ_i (2i - n + 1) v_(i) / (n² m)`. Returns 0 for an empty slice or a zero
/// mean.
///
/// # Examples
///
/// ```
/// use profile_steering::sim::fairness::gini;
///
/// assert_eq!(gini(&[]), 0.0);
/// assert_eq!(gini(&[2.0, 2.0, 2.0]), 0.0);
/// assert!((gini(&[0.0, 0.0, 0.0, 1.0]) - 0.75).abs() < 1e-12);
/// ```
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let nf = n as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (2.0 * i as f64 - nf + 1.0) * v)
        .sum();
    weighted / (nf * nf * mean)
}
