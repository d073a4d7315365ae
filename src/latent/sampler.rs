//! The latent-order likelihood engine.
//!
//! Drives the LOLOG growth process: dyads are visited in a sampled
//! order and each is kept with probability `1/(1+exp(-Δℓ))`, where Δℓ
//! is the log-likelihood change the edge would cause under the running
//! model. The same propose/accept/bookkeep cycle, with the Bernoulli
//! draw replaced by the observed dyad state, produces model frames for
//! the outer estimator.
//!
//! A sampler owns two models: the observed model (reference graph) and
//! `no_tie_model`, an identical clone with the graph emptied. Every
//! simulation starts from a fresh clone of `no_tie_model`. Randomness
//! comes from an injected `StdRng`, so a seed reproduces a call
//! exactly; parallel batches give each worker its own seed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::LologError;
use crate::graph::{Graph, ORDER_ATTR};
use crate::latent::frame::{ModelFrame, NetworkSample};
use crate::latent::model::Model;
use crate::latent::order::{generate_vertex_order, is_permutation, shuffle_prefix};

/// Extra row capacity reserved in model frames beyond the downsampled
/// expectation.
const FRAME_RESERVE_SLACK: usize = 1000;

/// `1/(1+exp(-x))` via the sign-split identity, stable for large |x|.
fn inverse_logit(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Running bookkeeping for a generation call: the current term values,
/// the realised and expected statistic accumulators, and optionally the
/// per-dyad change vectors at their canonical indices.
struct GenAccum {
    terms: Vec<f64>,
    stats: Vec<f64>,
    expected: Vec<f64>,
    change_stats: Option<Vec<Vec<f64>>>,
}

impl GenAccum {
    fn new(empty_stats: Vec<f64>, change_slots: Option<usize>) -> Self {
        let k = empty_stats.len();
        Self {
            terms: empty_stats,
            stats: vec![0.0; k],
            expected: vec![0.0; k],
            change_stats: change_slots.map(|e| vec![Vec::new(); e]),
        }
    }

    fn record(&mut self, new_terms: &[f64], prob_tie: f64, has_edge: bool, change_idx: usize) {
        let mut change = vec![0.0; self.terms.len()];
        for m in 0..self.terms.len() {
            let diff = new_terms[m] - self.terms[m];
            self.expected[m] += diff * prob_tie;
            change[m] = diff;
            if has_edge {
                self.stats[m] += diff;
                self.terms[m] += diff;
            }
        }
        if let Some(slots) = &mut self.change_stats {
            slots[change_idx] = change;
        }
    }
}

/// One propose/accept/bookkeep step of the growth process.
fn simulate_dyad(
    running: &mut Model,
    rng: &mut StdRng,
    vertex: usize,
    alter: usize,
    vert_order: &[usize],
    actor_index: usize,
    acc: &mut GenAccum,
    change_idx: usize,
) -> Result<(), LologError> {
    let llik = running.log_lik();
    running.dyad_update(vertex, alter, vert_order, actor_index);
    let new_terms = running.statistics();
    let llik_change = running.log_lik() - llik;
    if !llik_change.is_finite() {
        return Err(LologError::Numeric(format!(
            "non-finite log-likelihood change at dyad ({}, {})",
            vertex, alter
        )));
    }
    let prob_tie = inverse_logit(llik_change);
    let has_edge = rng.gen::<f64>() < prob_tie;
    if has_edge {
        running.toggle(vertex, alter);
    } else {
        running.rollback();
    }
    acc.record(&new_terms, prob_tie, has_edge, change_idx);
    Ok(())
}

/// One frame-production step: the observed dyad state replaces the
/// Bernoulli draw, and a downsampling coin decides whether the row is
/// emitted. Either way the running model is committed to the observed
/// state so it keeps tracking the observed graph's growth.
fn frame_dyad(
    running: &mut Model,
    observed: &Graph,
    rng: &mut StdRng,
    vertex: usize,
    alter: usize,
    vert_order: &[usize],
    actor_index: usize,
    downsample_rate: f64,
    frame: &mut ModelFrame,
) {
    let sampled = rng.gen::<f64>() < downsample_rate;
    let has_edge = observed.has_edge(vertex, alter);
    if sampled {
        let terms = running.statistics();
        running.dyad_update(vertex, alter, vert_order, actor_index);
        let new_terms = running.statistics();
        if has_edge {
            running.toggle(vertex, alter);
        } else {
            running.rollback();
        }
        frame.push_row(has_edge, &terms, &new_terms);
    } else if has_edge {
        running.dyad_update(vertex, alter, vert_order, actor_index);
        running.toggle(vertex, alter);
    }
}

fn validate_dyad_list(heads: &[usize], tails: &[usize], n: usize) -> Result<(), LologError> {
    if heads.len() != tails.len() {
        return Err(LologError::config(format!(
            "{} heads but {} tails",
            heads.len(),
            tails.len()
        )));
    }
    for (&h, &t) in heads.iter().zip(tails) {
        if h >= n || t >= n {
            return Err(LologError::config(format!(
                "dyad ({}, {}) out of range for {} vertices",
                t, h, n
            )));
        }
        if h == t {
            return Err(LologError::config(format!("self-dyad at vertex {}", h)));
        }
    }
    Ok(())
}

fn sample_distinct_pair(n: usize, rng: &mut StdRng) -> (usize, usize) {
    loop {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a != b {
            return (a, b);
        }
    }
}

/// The LOLOG simulator and model-frame producer.
pub struct LatentOrderSampler {
    model: Model,
    no_tie_model: Model,
    rng: StdRng,
    interrupt: Option<Arc<AtomicBool>>,
}

impl LatentOrderSampler {
    /// Create a sampler around an observed model and an injected RNG.
    ///
    /// The no-tie model is built here: a deep clone of `model` with
    /// its graph emptied and all terms re-initialized.
    pub fn new(model: Model, rng: StdRng) -> Result<Self, LologError> {
        if let Some(keys) = model.vertex_order() {
            if keys.len() != model.graph().size() {
                return Err(LologError::config(format!(
                    "vertex ordering has {} elements for {} vertices",
                    keys.len(),
                    model.graph().size()
                )));
            }
        }
        let mut no_tie_model = model.clone();
        no_tie_model.graph_mut().empty_graph();
        no_tie_model.calculate()?;
        Ok(Self {
            model,
            no_tie_model,
            rng,
            interrupt: None,
        })
    }

    /// Convenience constructor seeding the RNG from a `u64`.
    pub fn from_seed(model: Model, seed: u64) -> Result<Self, LologError> {
        Self::new(model, StdRng::seed_from_u64(seed))
    }

    /// Attach a cooperative interrupt flag, checked between outer
    /// iterations of every sampling loop.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Replace θ on both the observed and the no-tie model.
    pub fn set_thetas(&mut self, thetas: Vec<f64>) -> Result<(), LologError> {
        self.model.set_thetas(thetas.clone())?;
        self.no_tie_model.set_thetas(thetas)
    }

    /// The observed model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    fn check_interrupt(&self) -> Result<(), LologError> {
        match &self.interrupt {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(LologError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Sample a vertex visitation order respecting the model's partial
    /// order, if any.
    pub fn sample_vertex_order(&mut self) -> Result<Vec<usize>, LologError> {
        generate_vertex_order(
            self.model.vertex_order(),
            self.model.graph().size(),
            &mut self.rng,
        )
    }

    /// A fresh running model: clone of the no-tie model, recalculated.
    fn fresh_running(&self) -> Result<Model, LologError> {
        let mut running = self.no_tie_model.clone();
        running.calculate()?;
        Ok(running)
    }

    fn finish_sample(
        running: Model,
        vert_order: &[usize],
        empty_stats: Vec<f64>,
        acc: GenAccum,
    ) -> Result<NetworkSample, LologError> {
        let mut rank_order = vec![0i64; vert_order.len()];
        for (i, &v) in vert_order.iter().enumerate() {
            rank_order[v] = i as i64;
        }
        let mut network = running.into_graph();
        network.add_discrete_variable(ORDER_ATTR, rank_order)?;
        Ok(NetworkSample {
            network,
            empty_network_stats: empty_stats,
            stats: acc.stats,
            expected_stats: acc.expected,
            change_stats: acc.change_stats,
        })
    }

    /// Simulate a network from a freshly sampled visitation order.
    pub fn generate_network(&mut self) -> Result<NetworkSample, LologError> {
        let order = self.sample_vertex_order()?;
        self.generate_network_with_order(&order, false)
    }

    /// Simulate a network and keep the per-dyad change vectors.
    pub fn generate_network_return_changes(&mut self) -> Result<NetworkSample, LologError> {
        let order = self.sample_vertex_order()?;
        self.generate_network_with_order(&order, true)
    }

    /// Node-sequential generation over a given visitation order.
    ///
    /// Vertex `vert_order[i]` is introduced at step `i` and every dyad
    /// to an already-placed alter is proposed once (twice when
    /// directed). Alters are visited in fresh random order each step;
    /// terms always observe the pristine `vert_order`. Change vectors,
    /// when requested, land at the canonical dyad index:
    /// `i(i-1)/2 + j` undirected, `i(i-1) + 2j` (+1 for the reversed
    /// arc) directed.
    pub fn generate_network_with_order(
        &mut self,
        vert_order: &[usize],
        store_change_stats: bool,
    ) -> Result<NetworkSample, LologError> {
        let n = self.model.graph().size();
        if !is_permutation(vert_order, n) {
            return Err(LologError::config(
                "vertex order is not a permutation of 0..n".to_string(),
            ));
        }
        let mut running = self.fresh_running()?;
        let directed = running.graph().is_directed();
        let empty_stats = running.statistics();
        let max_e = running.graph().max_edges();
        let mut acc = GenAccum::new(empty_stats.clone(), store_change_stats.then_some(max_e));

        let mut working = vert_order.to_vec();
        for i in 0..n {
            self.check_interrupt()?;
            let vertex = working[i];
            shuffle_prefix(&mut working, i, &mut self.rng);
            for j in 0..i {
                let alter = working[j];
                if running.graph().has_edge(vertex, alter) {
                    return Err(LologError::InvariantViolation(format!(
                        "dyad ({}, {}) already present before proposal",
                        vertex, alter
                    )));
                }
                let idx = if directed {
                    i * (i - 1) + 2 * j
                } else {
                    i * (i - 1) / 2 + j
                };
                simulate_dyad(
                    &mut running,
                    &mut self.rng,
                    vertex,
                    alter,
                    vert_order,
                    i,
                    &mut acc,
                    idx,
                )?;
                if directed {
                    if running.graph().has_edge(alter, vertex) {
                        return Err(LologError::InvariantViolation(format!(
                            "dyad ({}, {}) already present before proposal",
                            alter, vertex
                        )));
                    }
                    simulate_dyad(
                        &mut running,
                        &mut self.rng,
                        alter,
                        vertex,
                        vert_order,
                        i,
                        &mut acc,
                        idx + 1,
                    )?;
                }
            }
        }
        Self::finish_sample(running, vert_order, empty_stats, acc)
    }

    /// Unconstrained simulation: walk `⌊e · trunc_rate⌋` random
    /// distinct dyads instead of growing node-by-node.
    pub fn generate_network_unconstrained(
        &mut self,
        trunc_rate: f64,
    ) -> Result<NetworkSample, LologError> {
        if !(trunc_rate > 0.0 && trunc_rate <= 1.0) {
            return Err(LologError::config(format!(
                "trunc rate {} outside (0, 1]",
                trunc_rate
            )));
        }
        let n = self.model.graph().size();
        let count = (self.model.graph().max_edges() as f64 * trunc_rate).floor() as usize;
        let mut heads = Vec::with_capacity(count);
        let mut tails = Vec::with_capacity(count);
        for _ in 0..count {
            let (tail, head) = sample_distinct_pair(n, &mut self.rng);
            tails.push(tail);
            heads.push(head);
        }
        self.generate_network_with_edge_order(&heads, &tails)
    }

    /// Simulation over a prebuilt candidate dyad list. One arc
    /// `tails[i] -> heads[i]` is proposed per candidate; duplicates are
    /// allowed and propose the reverse flip of the earlier decision. An
    /// auxiliary vertex order is still sampled for order-dependent
    /// terms, which receive the tail's true position in it.
    pub fn generate_network_with_edge_order(
        &mut self,
        heads: &[usize],
        tails: &[usize],
    ) -> Result<NetworkSample, LologError> {
        let n = self.model.graph().size();
        validate_dyad_list(heads, tails, n)?;
        let vert_order = self.sample_vertex_order()?;
        let mut actor_pos = vec![0usize; n];
        for (i, &v) in vert_order.iter().enumerate() {
            actor_pos[v] = i;
        }

        let mut running = self.fresh_running()?;
        let empty_stats = running.statistics();
        let mut acc = GenAccum::new(empty_stats.clone(), Some(heads.len()));

        for i in 0..heads.len() {
            self.check_interrupt()?;
            let vertex = tails[i];
            let alter = heads[i];
            simulate_dyad(
                &mut running,
                &mut self.rng,
                vertex,
                alter,
                &vert_order,
                actor_pos[vertex],
                &mut acc,
                i,
            )?;
        }
        Self::finish_sample(running, &vert_order, empty_stats, acc)
    }

    /// Produce a model frame along a given visitation order: outcomes
    /// are copied from the observed graph and each dyad's row is kept
    /// with probability `downsample_rate`.
    pub fn model_frame_given_order(
        &mut self,
        downsample_rate: f64,
        vert_order: &[usize],
    ) -> Result<ModelFrame, LologError> {
        let n = self.model.graph().size();
        if !(0.0..=1.0).contains(&downsample_rate) {
            return Err(LologError::config(format!(
                "downsample rate {} outside [0, 1]",
                downsample_rate
            )));
        }
        if !is_permutation(vert_order, n) {
            return Err(LologError::config(
                "vertex order is not a permutation of 0..n".to_string(),
            ));
        }
        let mut running = self.fresh_running()?;
        let directed = running.graph().is_directed();
        let capacity =
            (downsample_rate * running.graph().max_edges() as f64).floor() as usize + FRAME_RESERVE_SLACK;
        let mut frame = ModelFrame::with_capacity(running.n_terms(), capacity);

        let observed = self.model.graph();
        let mut working = vert_order.to_vec();
        for i in 0..n {
            if let Some(flag) = &self.interrupt {
                if flag.load(Ordering::Relaxed) {
                    return Err(LologError::Cancelled);
                }
            }
            let vertex = working[i];
            shuffle_prefix(&mut working, i, &mut self.rng);
            for j in 0..i {
                let alter = working[j];
                if running.graph().has_edge(vertex, alter) {
                    return Err(LologError::InvariantViolation(format!(
                        "dyad ({}, {}) already present before proposal",
                        vertex, alter
                    )));
                }
                frame_dyad(
                    &mut running,
                    observed,
                    &mut self.rng,
                    vertex,
                    alter,
                    vert_order,
                    i,
                    downsample_rate,
                    &mut frame,
                );
                if directed {
                    frame_dyad(
                        &mut running,
                        observed,
                        &mut self.rng,
                        alter,
                        vertex,
                        vert_order,
                        i,
                        downsample_rate,
                        &mut frame,
                    );
                }
            }
        }
        Ok(frame)
    }

    /// Model frame over a prebuilt candidate dyad list. When the graph
    /// is directed the reversed arc of each candidate is processed too,
    /// mirroring the node-sequential loop.
    pub fn model_frame_given_edge_order(
        &mut self,
        downsample_rate: f64,
        heads: &[usize],
        tails: &[usize],
    ) -> Result<ModelFrame, LologError> {
        let n = self.model.graph().size();
        if !(0.0..=1.0).contains(&downsample_rate) {
            return Err(LologError::config(format!(
                "downsample rate {} outside [0, 1]",
                downsample_rate
            )));
        }
        validate_dyad_list(heads, tails, n)?;
        let vert_order = self.sample_vertex_order()?;
        let mut actor_pos = vec![0usize; n];
        for (i, &v) in vert_order.iter().enumerate() {
            actor_pos[v] = i;
        }

        let mut running = self.fresh_running()?;
        let directed = running.graph().is_directed();
        let capacity =
            (downsample_rate * running.graph().max_edges() as f64).floor() as usize + FRAME_RESERVE_SLACK;
        let mut frame = ModelFrame::with_capacity(running.n_terms(), capacity);

        let observed = self.model.graph();
        for i in 0..heads.len() {
            if let Some(flag) = &self.interrupt {
                if flag.load(Ordering::Relaxed) {
                    return Err(LologError::Cancelled);
                }
            }
            let vertex = tails[i];
            let alter = heads[i];
            let actor_index = actor_pos[vertex];
            frame_dyad(
                &mut running,
                observed,
                &mut self.rng,
                vertex,
                alter,
                &vert_order,
                actor_index,
                downsample_rate,
                &mut frame,
            );
            if directed {
                frame_dyad(
                    &mut running,
                    observed,
                    &mut self.rng,
                    alter,
                    vertex,
                    &vert_order,
                    actor_index,
                    downsample_rate,
                    &mut frame,
                );
            }
        }
        Ok(frame)
    }

    /// Produce `n_orders` model frames, each from an independent draw
    /// of the visitation order.
    pub fn variational_model_frame(
        &mut self,
        n_orders: usize,
        downsample_rate: f64,
    ) -> Result<Vec<ModelFrame>, LologError> {
        let mut frames = Vec::with_capacity(n_orders);
        for _ in 0..n_orders {
            let order = self.sample_vertex_order()?;
            frames.push(self.model_frame_given_order(downsample_rate, &order)?);
        }
        Ok(frames)
    }

    /// Produce `n_orders` model frames, each from a visitation order
    /// supplied by `order_fn`.
    pub fn variational_model_frame_with_func<F>(
        &mut self,
        n_orders: usize,
        downsample_rate: f64,
        mut order_fn: F,
    ) -> Result<Vec<ModelFrame>, LologError>
    where
        F: FnMut() -> Vec<usize>,
    {
        let mut frames = Vec::with_capacity(n_orders);
        for _ in 0..n_orders {
            let order = order_fn();
            frames.push(self.model_frame_given_order(downsample_rate, &order)?);
        }
        Ok(frames)
    }

    /// Unconstrained (edge-permutation) variational frames for the
    /// truncated LOLOG: the candidate list is seeded with every
    /// observed edge, padded with random distinct pairs up to
    /// `⌊e · trunc_rate⌋`, then the head and tail vectors are shuffled
    /// independently before each frame. The decoupling of the seeded
    /// pairs is deliberate; a tail colliding with its head after the
    /// shuffle is redrawn so no self-dyad is ever proposed.
    pub fn variational_model_frame_unconstrained(
        &mut self,
        n_orders: usize,
        downsample_rate: f64,
        trunc_rate: f64,
    ) -> Result<Vec<ModelFrame>, LologError> {
        if !(trunc_rate > 0.0 && trunc_rate <= 1.0) {
            return Err(LologError::config(format!(
                "trunc rate {} outside (0, 1]",
                trunc_rate
            )));
        }
        let n = self.model.graph().size();
        let target = (self.model.graph().max_edges() as f64 * trunc_rate).floor() as usize;

        let mut heads = Vec::with_capacity(target);
        let mut tails = Vec::with_capacity(target);
        for (from, to) in self.model.graph().edgelist() {
            tails.push(from);
            heads.push(to);
        }
        while tails.len() < target {
            let (tail, head) = sample_distinct_pair(n, &mut self.rng);
            tails.push(tail);
            heads.push(head);
        }

        let mut frames = Vec::with_capacity(n_orders);
        for _ in 0..n_orders {
            let len = heads.len();
            shuffle_prefix(&mut heads, len, &mut self.rng);
            shuffle_prefix(&mut tails, len, &mut self.rng);
            for i in 0..len {
                while tails[i] == heads[i] {
                    tails[i] = self.rng.gen_range(0..n);
                }
            }
            frames.push(self.model_frame_given_edge_order(downsample_rate, &heads, &tails)?);
        }
        Ok(frames)
    }

    /// Change statistics for every dyad of a full canonical dyad list,
    /// computed against the running model grown to match the observed
    /// graph. No acceptance sampling: each dyad's Δ is recorded, then
    /// the running model is committed to the observed state.
    pub fn calc_change_stats(
        &mut self,
        heads: &[usize],
        tails: &[usize],
    ) -> Result<Vec<Vec<f64>>, LologError> {
        let n = self.model.graph().size();
        let e = self.model.graph().max_edges();
        if heads.len() != e || tails.len() != e {
            return Err(LologError::config(format!(
                "dyad list has {} heads and {} tails; expected {}",
                heads.len(),
                tails.len(),
                e
            )));
        }
        validate_dyad_list(heads, tails, n)?;
        let vert_order = self.sample_vertex_order()?;
        let mut actor_pos = vec![0usize; n];
        for (i, &v) in vert_order.iter().enumerate() {
            actor_pos[v] = i;
        }

        let mut running = self.fresh_running()?;
        let observed = self.model.graph();
        let mut result = Vec::with_capacity(e);
        for i in 0..e {
            if let Some(flag) = &self.interrupt {
                if flag.load(Ordering::Relaxed) {
                    return Err(LologError::Cancelled);
                }
            }
            let vertex = tails[i];
            let alter = heads[i];
            if running.graph().has_edge(vertex, alter) {
                return Err(LologError::InvariantViolation(format!(
                    "dyad ({}, {}) already present before proposal",
                    vertex, alter
                )));
            }
            let stat = running.statistics();
            running.dyad_update(vertex, alter, &vert_order, actor_pos[vertex]);
            let stat_new = running.statistics();
            result.push(
                stat_new
                    .iter()
                    .zip(&stat)
                    .map(|(new, old)| new - old)
                    .collect(),
            );
            if observed.has_edge(vertex, alter) {
                running.toggle(vertex, alter);
            } else {
                running.rollback();
            }
        }
        Ok(result)
    }
}

/// Simulate `n_samples` networks in parallel.
///
/// Each worker builds its own sampler around a deep clone of `model`
/// with an isolated RNG stream seeded `seed + i`, so results are
/// reproducible and workers share nothing.
pub fn sample_networks_parallel(
    model: &Model,
    n_samples: usize,
    seed: u64,
) -> Result<Vec<NetworkSample>, LologError> {
    (0..n_samples)
        .into_par_iter()
        .map(|i| {
            let mut sampler =
                LatentOrderSampler::from_seed(model.clone(), seed.wrapping_add(i as u64))?;
            sampler.generate_network()
        })
        .collect()
}
