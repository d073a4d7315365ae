//! Vertex visitation orders.
//!
//! A visitation order is a permutation of `0..n`, optionally
//! constrained by a partial order of per-vertex keys: vertices with
//! smaller keys come first, ties broken uniformly at random. Sampling
//! is rank-with-random-ties followed by an argsort on the ranks, which
//! avoids rejection sampling over topological orders.

use rand::rngs::StdRng;
use rand::Rng;

use crate::error::LologError;

/// Fisher-Yates shuffle of `vec[0..limit]`, leaving the rest in place.
///
/// The in-place `swap(i, uniform(i..limit))` variant; with
/// `limit == vec.len()` this is a full uniform shuffle.
pub fn shuffle_prefix<T>(vec: &mut [T], limit: usize, rng: &mut StdRng) {
    for i in 0..limit.saturating_sub(1) {
        let j = rng.gen_range(i..limit);
        vec.swap(i, j);
    }
}

/// 1-based ranks of `keys`, ties broken uniformly at random.
///
/// Tied keys receive each permutation of their rank block with equal
/// probability, so the returned ranks are always a permutation of
/// `1..=keys.len()`.
pub fn rank_random(keys: &[i64], rng: &mut StdRng) -> Vec<usize> {
    let n = keys.len();
    let mut idx: Vec<usize> = (0..n).collect();
    idx.sort_by_key(|&i| keys[i]);

    // Shuffle each run of equal keys so tied ranks are assigned uniformly.
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && keys[idx[end]] == keys[idx[start]] {
            end += 1;
        }
        if end - start > 1 {
            let run = &mut idx[start..end];
            let len = run.len();
            shuffle_prefix(run, len, rng);
        }
        start = end;
    }

    let mut ranks = vec![0usize; n];
    for (pos, &i) in idx.iter().enumerate() {
        ranks[i] = pos + 1;
    }
    ranks
}

/// Sample a vertex visitation order.
///
/// With no partial order this is a uniform random permutation of
/// `0..n`. Given keys, vertices are ordered by `rank_random` so the
/// order respects `<=` on the keys and every valid order of tied
/// vertices is equally likely.
pub fn generate_vertex_order(
    partial: Option<&[i64]>,
    n: usize,
    rng: &mut StdRng,
) -> Result<Vec<usize>, LologError> {
    match partial {
        None => {
            let mut order: Vec<usize> = (0..n).collect();
            shuffle_prefix(&mut order, n, rng);
            Ok(order)
        }
        Some(keys) => {
            if keys.len() != n {
                return Err(LologError::config(format!(
                    "vertex ordering has {} elements for {} vertices",
                    keys.len(),
                    n
                )));
            }
            let ranks = rank_random(keys, rng);
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by_key(|&i| ranks[i]);
            Ok(order)
        }
    }
}

/// Whether `order` is a permutation of `0..n`.
pub fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &v in order {
        if v >= n || seen[v] {
            return false;
        }
        seen[v] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_ranks_are_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let keys = vec![5, 5, 1, 3, 3, 3];
        let ranks = rank_random(&keys, &mut rng);
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6]);
        // Vertex 2 has the unique smallest key.
        assert_eq!(ranks[2], 1);
        // The two 5s occupy the top two ranks.
        assert!(ranks[0] >= 5 && ranks[1] >= 5);
    }

    #[test]
    fn test_order_deterministic_without_ties() {
        let mut rng = StdRng::seed_from_u64(1);
        let keys = vec![40, 10, 30, 20];
        for _ in 0..20 {
            let order = generate_vertex_order(Some(&keys), 4, &mut rng).unwrap();
            assert_eq!(order, vec![1, 3, 2, 0]);
        }
    }

    #[test]
    fn test_partial_order_respected_with_ties() {
        let mut rng = StdRng::seed_from_u64(3);
        let keys = vec![1, 1, 2, 2];
        let mut first_zero = 0;
        let draws = 2000;
        for _ in 0..draws {
            let order = generate_vertex_order(Some(&keys), 4, &mut rng).unwrap();
            // {0,1} always precede {2,3}.
            assert!(order[0] < 2 && order[1] < 2);
            assert!(order[2] >= 2 && order[3] >= 2);
            if order[0] == 0 {
                first_zero += 1;
            }
        }
        // Within the tied pair either ordering has probability 0.5.
        let frac = first_zero as f64 / draws as f64;
        assert!((frac - 0.5).abs() < 0.05, "tie fraction {}", frac);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_vertex_order(Some(&[1, 2]), 4, &mut rng).is_err());
    }

    #[test]
    fn test_shuffle_prefix_preserves_suffix() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut v: Vec<usize> = (0..10).collect();
        shuffle_prefix(&mut v, 4, &mut rng);
        assert_eq!(&v[4..], &[4, 5, 6, 7, 8, 9]);
        let mut head: Vec<usize> = v[..4].to_vec();
        head.sort();
        assert_eq!(head, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_full_shuffle_reaches_all_permutations() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let mut v = vec![0usize, 1, 2];
            shuffle_prefix(&mut v, 3, &mut rng);
            seen.insert(v);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[2, 0, 1], 3));
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
    }
}
