//! Order-preserving merge of deduplicated results.

use std::collections::HashMap;
use std::hash::Hash;

/// Stable-sorts keyed results by the position of each key in `original_order`.
///
/// Output length equals `results.len()`. Keys absent from `original_order`
/// sort after every known key and keep their relative order. When a key
/// occurs more than once in `original_order`, its first position wins.
pub fn sort_by_original_order<K, V>(original_order: &[K], mut results: Vec<(K, V)>) -> Vec<(K, V)>
where
    K: Eq + Hash,
{
    let positions = index_positions(original_order);
    results.sort_by_key(|(key, _)| positions.get(key).copied().unwrap_or(usize::MAX));
    results
}

/// Same as [`sort_by_original_order`], dropping the keys.
pub fn merge_in_order<K, V>(original_order: &[K], results: Vec<(K, V)>) -> Vec<V>
where
    K: Eq + Hash,
{
    sort_by_original_order(original_order, results)
        .into_iter()
        .map(|(_, value)| value)
        .collect()
}

fn index_positions<K>(original_order: &[K]) -> HashMap<&K, usize>
where
    K: Eq + Hash,
{
    let mut positions = HashMap::with_capacity(original_order.len());
    for (index, key) in original_order.iter().enumerate() {
        positions.entry(key).or_insert(index);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::{merge_in_order, sort_by_original_order};

    #[test]
    fn merge_restores_caller_order() {
        let merged = merge_in_order(&[3, 1, 2], vec![(1, "one"), (2, "two"), (3, "three")]);
        assert_eq!(merged, vec!["three", "one", "two"]);
    }

    #[test]
    fn output_length_follows_results_not_original_order() {
        let merged = merge_in_order(&[5, 4, 3, 2, 1], vec![(2, 'b'), (4, 'd')]);
        assert_eq!(merged, vec!['d', 'b']);
    }

    #[test]
    fn unknown_keys_sort_last_in_stable_order() {
        let sorted = sort_by_original_order(&[2, 1], vec![(9, 'x'), (1, 'a'), (8, 'y'), (2, 'b')]);
        let keys: Vec<i32> = sorted.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![2, 1, 9, 8]);
    }

    #[test]
    fn duplicate_original_keys_use_first_position() {
        let merged = merge_in_order(&[1, 2, 1], vec![(2, 'b'), (1, 'a')]);
        assert_eq!(merged, vec!['a', 'b']);
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let merged: Vec<char> = merge_in_order::<i32, char>(&[], Vec::new());
        assert!(merged.is_empty());
    }
}
