/// Deterministic fixed-stride subsampling.
///
/// Keeps every `step`-th item starting with the first, where
/// `step = ceil(len / cap)`, and stops once `cap` items are kept. The result
/// never exceeds `cap`, always contains `items[0]` (when non-empty) and spans
/// the whole input rather than truncating its tail.
pub fn subsample_stride<T: Clone>(items: &[T], cap: usize) -> Vec<T> {
    if items.len() <= cap {
        return items.to_vec();
    }
    if cap == 0 {
        return Vec::new();
    }
    let step = items.len().div_ceil(cap);
    items.iter().step_by(step).take(cap).cloned().collect()
}
