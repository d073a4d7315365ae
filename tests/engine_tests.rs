//! End-to-end scenarios for the LOLOG engine.

use lolog_rust::latent::terms::{Edges, NodeCov, Triangles};
use lolog_rust::latent::Term;
use lolog_rust::{Graph, LatentOrderSampler, Model, ORDER_ATTR};

fn model_with_terms(graph: Graph, terms: Vec<Box<dyn Term>>, thetas: Vec<f64>) -> Model {
    let mut model = Model::new(graph, terms, thetas).unwrap();
    model.calculate().unwrap();
    model
}

fn edges_only_model(graph: Graph, theta: f64) -> Model {
    model_with_terms(graph, vec![Box::new(Edges::new())], vec![theta])
}

/// Edges-only, n=4 undirected, θ=[0]: every dyad is kept with p=0.5,
/// so the mean edge count over many draws is 3.0.
#[test]
fn edges_only_null_theta_mean_edge_count() {
    let runs = 4000;
    let mut total = 0usize;
    for seed in 0..runs {
        let mut sampler =
            LatentOrderSampler::from_seed(edges_only_model(Graph::new(4, false), 0.0), seed)
                .unwrap();
        let sample = sampler.generate_network().unwrap();
        total += sample.network.n_edges();
        assert_eq!(sample.expected_stats, vec![3.0]);
    }
    let mean = total as f64 / runs as f64;
    assert!((mean - 3.0).abs() < 0.1, "mean edge count {}", mean);
}

/// Edges-only, n=4 undirected, θ=[log 9]: p = 0.9 per dyad and the
/// mean edge count is 5.4.
#[test]
fn edges_only_log9_theta_mean_edge_count() {
    let runs = 4000;
    let theta = 9f64.ln();
    let mut total = 0usize;
    for seed in 0..runs {
        let mut sampler =
            LatentOrderSampler::from_seed(edges_only_model(Graph::new(4, false), theta), seed)
                .unwrap();
        let sample = sampler.generate_network().unwrap();
        total += sample.network.n_edges();
        let expected = sample.expected_stats[0];
        assert!((expected - 5.4).abs() < 1e-9);
    }
    let mean = total as f64 / runs as f64;
    assert!((mean - 5.4).abs() < 0.1, "mean edge count {}", mean);
}

/// Edges + triangles on K3 plus an isolate, full downsampling along
/// the identity order: six rows with outcomes [1,1,1,0,0,0], unit edge
/// deltas, and a single triangle delta on the closing dyad.
#[test]
fn k3_frame_rows_and_deltas() {
    let observed = Graph::from_edges(4, false, &[(0, 1), (1, 2), (0, 2)]).unwrap();
    let terms: Vec<Box<dyn Term>> = vec![Box::new(Edges::new()), Box::new(Triangles::new())];
    let model = model_with_terms(observed, terms, vec![-1.609, 0.693]);
    let mut sampler = LatentOrderSampler::from_seed(model, 42).unwrap();

    let frame = sampler.model_frame_given_order(1.0, &[0, 1, 2, 3]).unwrap();
    assert_eq!(frame.len(), 6);
    assert_eq!(
        frame.outcome,
        vec![true, true, true, false, false, false]
    );
    assert_eq!(frame.samples[0], vec![1.0; 6]);
    assert_eq!(frame.samples[1], vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
}

/// Partial order π=[1,1,2,2]: vertices {0,1} always precede {2,3}, and
/// each tied pair is ordered either way with probability 0.5.
#[test]
fn partial_order_constrains_generation() {
    let model = edges_only_model(Graph::new(4, false), 0.0)
        .with_vertex_order(vec![1, 1, 2, 2])
        .unwrap();
    let mut sampler = LatentOrderSampler::from_seed(model, 31).unwrap();
    let draws = 2000;
    let mut zero_first = 0;
    for _ in 0..draws {
        let sample = sampler.generate_network().unwrap();
        let ranks = sample.network.discrete_variable(ORDER_ATTR).unwrap();
        assert!(ranks[0] < 2 && ranks[1] < 2, "ranks {:?}", ranks);
        assert!(ranks[2] >= 2 && ranks[3] >= 2, "ranks {:?}", ranks);
        if ranks[0] == 0 {
            zero_first += 1;
        }
    }
    let frac = zero_first as f64 / draws as f64;
    assert!((frac - 0.5).abs() < 0.05, "tie fraction {}", frac);
}

/// `calc_change_stats` over the full canonical dyad list: exactly `e`
/// vectors, and for dyad-independent terms the column sums reproduce
/// the observed graph's statistics.
#[test]
fn change_stat_columns_sum_to_observed_stats() {
    let mut observed =
        Graph::from_edges(5, false, &[(0, 1), (1, 2), (2, 3), (3, 4), (0, 4), (1, 3)]).unwrap();
    observed
        .add_continuous_variable("x", vec![0.5, 1.0, -1.0, 2.0, 0.0])
        .unwrap();
    let terms: Vec<Box<dyn Term>> =
        vec![Box::new(Edges::new()), Box::new(NodeCov::new("x"))];
    let observed_stats = {
        let mut model = model_with_terms(observed.clone(), terms.clone(), vec![0.0, 0.0]);
        model.calculate().unwrap();
        model.statistics()
    };

    let model = model_with_terms(observed, terms, vec![0.0, 0.0]);
    let mut sampler = LatentOrderSampler::from_seed(model, 77).unwrap();
    let mut heads = Vec::new();
    let mut tails = Vec::new();
    for u in 0..5 {
        for v in (u + 1)..5 {
            tails.push(u);
            heads.push(v);
        }
    }
    let changes = sampler.calc_change_stats(&heads, &tails).unwrap();
    assert_eq!(changes.len(), 10);

    for k in 0..2 {
        let observed_total: f64 = changes
            .iter()
            .zip(tails.iter().zip(&heads))
            .filter(|(_, (&t, &h))| sampler.model().graph().has_edge(t, h))
            .map(|(change, _)| change[k])
            .sum();
        assert!(
            (observed_total - observed_stats[k]).abs() < 1e-9,
            "term {}: {} vs {}",
            k,
            observed_total,
            observed_stats[k]
        );
    }
}

/// Edge-permutation generation over the three dyads of a triangle with
/// θ=[0]: mean edge count is candidates · 0.5.
#[test]
fn edge_order_generation_null_theta() {
    let heads = vec![1, 2, 2];
    let tails = vec![0, 0, 1];
    let runs = 2000;
    let mut total = 0usize;
    for seed in 0..runs {
        let observed = Graph::from_edges(3, false, &[(0, 1), (1, 2), (0, 2)]).unwrap();
        let mut sampler =
            LatentOrderSampler::from_seed(edges_only_model(observed, 0.0), seed).unwrap();
        let sample = sampler
            .generate_network_with_edge_order(&heads, &tails)
            .unwrap();
        total += sample.network.n_edges();
        let changes = sample.change_stats.unwrap();
        assert_eq!(changes.len(), 3);
    }
    let mean = total as f64 / runs as f64;
    assert!((mean - 1.5).abs() < 0.1, "mean edge count {}", mean);
}

/// A generated network's statistics always reconcile with a fresh
/// from-scratch recomputation of every term.
#[test]
fn generated_networks_reconcile_with_recompute() {
    for seed in [1u64, 2, 3, 4, 5] {
        let graph = Graph::new(7, false);
        let terms: Vec<Box<dyn Term>> =
            vec![Box::new(Edges::new()), Box::new(Triangles::new())];
        let model = model_with_terms(graph, terms, vec![-0.5, 0.4]);
        let mut sampler = LatentOrderSampler::from_seed(model, seed).unwrap();
        let sample = sampler.generate_network_return_changes().unwrap();

        let realized = sample.realized_statistics();
        let mut edges = Edges::new();
        edges.initialize(&sample.network).unwrap();
        let mut triangles = Triangles::new();
        triangles.initialize(&sample.network).unwrap();
        assert!((realized[0] - edges.value()).abs() < 1e-9);
        assert!((realized[1] - triangles.value()).abs() < 1e-9);

        // Change vectors for realised edges sum to the realised stats.
        let changes = sample.change_stats.unwrap();
        assert_eq!(changes.len(), 21);
        assert!(changes.iter().all(|c| c.len() == 2));
    }
}
