// src/compare/pairs.rs

/// Index pairs `(i, j)` with `i < j` for every unordered combination of `n`
/// items, in lexicographic order. Fewer than two items yields no pairs.
pub fn pair_indices(n: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            out.push((i, j));
        }
    }
    out
}

/// Every unordered pair of `items`, each ordered as in the input.
pub fn pairs<T>(items: &[T]) -> Vec<(&T, &T)> {
    pair_indices(items.len())
        .into_iter()
        .map(|(i, j)| (&items[i], &items[j]))
        .collect()
}
