//! Result checking against a trusted single-process sort.

/// The baseline sort used to validate distributed results.
pub fn reference_sort(data: &mut [f64]) {
    data.sort_by(f64::total_cmp);
}

/// Sort `original_copy` with [`reference_sort`] and compare it element-wise
/// with `sorted`. A mismatch is reported as `false`, never as an error.
pub fn verify(sorted: &[f64], mut original_copy: Vec<f64>) -> bool {
    if sorted.len() != original_copy.len() {
        return false;
    }
    reference_sort(&mut original_copy);
    sorted
        .iter()
        .zip(&original_copy)
        .all(|(a, b)| a.total_cmp(b).is_eq())
}

/// True when every element is `<=` its successor under `f64::total_cmp`.
pub fn is_non_decreasing(data: &[f64]) -> bool {
    data.windows(2).all(|w| w[0].total_cmp(&w[1]).is_le())
}
