//! Property-based invariants for the graph, ranker, and sampler.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use lolog_rust::latent::order::{generate_vertex_order, rank_random, shuffle_prefix};
use lolog_rust::latent::terms::Edges;
use lolog_rust::latent::Term;
use lolog_rust::{Graph, LatentOrderSampler, Model};

proptest! {
    /// Toggling any dyad twice restores the exact edge set.
    #[test]
    fn toggle_twice_is_identity(
        n in 2usize..12,
        dyads in prop::collection::vec((0usize..12, 0usize..12), 0..30),
        u in 0usize..12,
        v in 0usize..12,
    ) {
        prop_assume!(u < n && v < n && u != v);
        let mut g = Graph::new(n, false);
        for (a, b) in dyads {
            if a < n && b < n && a != b {
                g.toggle(a, b);
            }
        }
        let before = g.edgelist();
        g.toggle(u, v);
        g.toggle(u, v);
        prop_assert_eq!(g.edgelist(), before);
    }

    /// Ranks are always a permutation of 1..=n and order-compatible
    /// with the keys.
    #[test]
    fn ranks_are_valid(keys in prop::collection::vec(-50i64..50, 1..40), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let ranks = rank_random(&keys, &mut rng);
        let mut sorted = ranks.clone();
        sorted.sort();
        prop_assert_eq!(sorted, (1..=keys.len()).collect::<Vec<_>>());
        for i in 0..keys.len() {
            for j in 0..keys.len() {
                if keys[i] < keys[j] {
                    prop_assert!(ranks[i] < ranks[j]);
                }
            }
        }
    }

    /// Sampled visitation orders respect the partial order.
    #[test]
    fn vertex_order_respects_keys(
        keys in prop::collection::vec(0i64..5, 2..20),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = keys.len();
        let order = generate_vertex_order(Some(&keys), n, &mut rng).unwrap();
        for w in order.windows(2) {
            prop_assert!(keys[w[0]] <= keys[w[1]]);
        }
    }

    /// A full shuffle is a permutation of its input.
    #[test]
    fn shuffle_is_permutation(n in 1usize..50, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut v: Vec<usize> = (0..n).collect();
        shuffle_prefix(&mut v, n, &mut rng);
        let mut sorted = v.clone();
        sorted.sort();
        prop_assert_eq!(sorted, (0..n).collect::<Vec<_>>());
    }

    /// With full downsampling a frame has one row per dyad and its
    /// positive outcomes count the observed edges.
    #[test]
    fn full_frame_row_counts(
        n in 2usize..8,
        dyads in prop::collection::vec((0usize..8, 0usize..8), 0..16),
        seed in any::<u64>(),
    ) {
        let mut g = Graph::new(n, false);
        for (a, b) in dyads {
            if a < n && b < n && a != b && !g.has_edge(a, b) {
                g.toggle(a, b);
            }
        }
        let observed_edges = g.n_edges();
        let terms: Vec<Box<dyn Term>> = vec![Box::new(Edges::new())];
        let mut model = Model::new(g, terms, vec![0.0]).unwrap();
        model.calculate().unwrap();
        let mut sampler = LatentOrderSampler::from_seed(model, seed).unwrap();
        let order = sampler.sample_vertex_order().unwrap();
        let frame = sampler.model_frame_given_order(1.0, &order).unwrap();
        prop_assert_eq!(frame.len(), n * (n - 1) / 2);
        prop_assert_eq!(frame.outcome.iter().filter(|&&o| o).count(), observed_edges);
    }
}
