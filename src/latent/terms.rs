//! Built-in network statistics.
//!
//! A small term library sufficient for simulation and model frames out
//! of the box; richer statistics live outside the engine and only need
//! to satisfy the `Term` contract. Each term journals the delta of its
//! last proposal so `rollback` is exact.

use std::collections::BTreeSet;

use crate::error::LologError;
use crate::graph::Graph;
use crate::latent::term::Term;

/// Build a term from a registry spec string.
///
/// Recognized specs: `"edges"`, `"triangles"`, `"degree_popularity"`,
/// and `"node_cov:<attr>"` for a continuous vertex attribute.
pub fn term_from_spec(spec: &str) -> Result<Box<dyn Term>, LologError> {
    match spec {
        "edges" => Ok(Box::new(Edges::new())),
        "triangles" => Ok(Box::new(Triangles::new())),
        "degree_popularity" => Ok(Box::new(DegreePopularity::new())),
        other => {
            if let Some(attr) = other.strip_prefix("node_cov:") {
                Ok(Box::new(NodeCov::new(attr)))
            } else {
                Err(LologError::config(format!("unknown term '{}'", other)))
            }
        }
    }
}

/// Edge (arc) count. Δ = ±1.
#[derive(Clone, Debug, Default)]
pub struct Edges {
    current: f64,
    last_delta: f64,
}

impl Edges {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Term for Edges {
    fn name(&self) -> &'static str {
        "edges"
    }

    fn initialize(&mut self, g: &Graph) -> Result<(), LologError> {
        self.current = g.n_edges() as f64;
        self.last_delta = 0.0;
        Ok(())
    }

    fn value(&self) -> f64 {
        self.current
    }

    fn dyad_update(&mut self, g: &Graph, from: usize, to: usize, _order: &[usize], _i: usize) {
        self.last_delta = if g.has_edge(from, to) { -1.0 } else { 1.0 };
        self.current += self.last_delta;
    }

    fn rollback(&mut self) {
        self.current -= self.last_delta;
        self.last_delta = 0.0;
    }

    fn clone_box(&self) -> Box<dyn Term> {
        Box::new(self.clone())
    }

    fn is_dyad_independent(&self) -> bool {
        true
    }
}

/// Closed-triple count.
///
/// A pair counts as connected when at least one arc joins it, so on
/// directed graphs this is the triangle count of the underlying
/// undirected graph. The change statistic for flipping `(u, v)` is the
/// number of shared partners of `u` and `v`, zero when the reverse arc
/// keeps the pair connected.
#[derive(Clone, Debug, Default)]
pub struct Triangles {
    current: f64,
    last_delta: f64,
}

impl Triangles {
    pub fn new() -> Self {
        Self::default()
    }

    fn any_direction_neighbors(g: &Graph, v: usize) -> BTreeSet<usize> {
        let mut s = g.neighbors(v).clone();
        if g.is_directed() {
            s.extend(g.in_neighbors(v).iter().copied());
        }
        s
    }

    fn shared_partners(g: &Graph, u: usize, v: usize) -> f64 {
        let nu = Self::any_direction_neighbors(g, u);
        nu.iter().filter(|&&w| w != v && g.connected(v, w)).count() as f64
    }

    fn count_triangles(g: &Graph) -> f64 {
        let n = g.size();
        let conn: Vec<BTreeSet<usize>> = (0..n)
            .map(|v| Self::any_direction_neighbors(g, v))
            .collect();
        let mut total = 0usize;
        for u in 0..n {
            for &v in conn[u].iter().filter(|&&v| v > u) {
                total += conn[u]
                    .intersection(&conn[v])
                    .filter(|&&w| w > v)
                    .count();
            }
        }
        total as f64
    }
}

impl Term for Triangles {
    fn name(&self) -> &'static str {
        "triangles"
    }

    fn initialize(&mut self, g: &Graph) -> Result<(), LologError> {
        self.current = Self::count_triangles(g);
        self.last_delta = 0.0;
        Ok(())
    }

    fn value(&self) -> f64 {
        self.current
    }

    fn dyad_update(&mut self, g: &Graph, from: usize, to: usize, _order: &[usize], _i: usize) {
        let removing = g.has_edge(from, to);
        let pair_stays_connected = g.is_directed() && g.has_edge(to, from);
        self.last_delta = if pair_stays_connected {
            0.0
        } else {
            let sign = if removing { -1.0 } else { 1.0 };
            sign * Self::shared_partners(g, from, to)
        };
        self.current += self.last_delta;
    }

    fn rollback(&mut self) {
        self.current -= self.last_delta;
        self.last_delta = 0.0;
    }

    fn clone_box(&self) -> Box<dyn Term> {
        Box::new(self.clone())
    }
}

/// Sum over edges of a continuous vertex covariate at both endpoints.
#[derive(Clone, Debug)]
pub struct NodeCov {
    attr: String,
    values: Vec<f64>,
    current: f64,
    last_delta: f64,
}

impl NodeCov {
    pub fn new(attr: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            values: Vec::new(),
            current: 0.0,
            last_delta: 0.0,
        }
    }
}

impl Term for NodeCov {
    fn name(&self) -> &'static str {
        "node_cov"
    }

    fn initialize(&mut self, g: &Graph) -> Result<(), LologError> {
        let values = g.continuous_variable(&self.attr).ok_or_else(|| {
            LologError::config(format!("no continuous vertex attribute '{}'", self.attr))
        })?;
        self.values = values.to_vec();
        self.current = g
            .edgelist()
            .iter()
            .map(|&(u, v)| self.values[u] + self.values[v])
            .sum();
        self.last_delta = 0.0;
        Ok(())
    }

    fn value(&self) -> f64 {
        self.current
    }

    fn dyad_update(&mut self, g: &Graph, from: usize, to: usize, _order: &[usize], _i: usize) {
        let sign = if g.has_edge(from, to) { -1.0 } else { 1.0 };
        self.last_delta = sign * (self.values[from] + self.values[to]);
        self.current += self.last_delta;
    }

    fn rollback(&mut self) {
        self.current -= self.last_delta;
        self.last_delta = 0.0;
    }

    fn clone_box(&self) -> Box<dyn Term> {
        Box::new(self.clone())
    }

    fn is_dyad_independent(&self) -> bool {
        true
    }
}

/// Degree popularity: Σ_v deg(v)^{3/2}, in-degree on directed graphs.
///
/// Rewards attachment to already-popular vertices; the change statistic
/// grows with the endpoint degrees.
#[derive(Clone, Debug, Default)]
pub struct DegreePopularity {
    current: f64,
    last_delta: f64,
}

impl DegreePopularity {
    pub fn new() -> Self {
        Self::default()
    }

    fn pop(d: f64) -> f64 {
        d.powf(1.5)
    }

    fn degree_shift(d: usize, adding: bool) -> f64 {
        let d = d as f64;
        if adding {
            Self::pop(d + 1.0) - Self::pop(d)
        } else {
            Self::pop(d - 1.0) - Self::pop(d)
        }
    }
}

impl Term for DegreePopularity {
    fn name(&self) -> &'static str {
        "degree_popularity"
    }

    fn initialize(&mut self, g: &Graph) -> Result<(), LologError> {
        self.current = (0..g.size())
            .map(|v| {
                let d = if g.is_directed() {
                    g.in_degree(v)
                } else {
                    g.degree(v)
                };
                Self::pop(d as f64)
            })
            .sum();
        self.last_delta = 0.0;
        Ok(())
    }

    fn value(&self) -> f64 {
        self.current
    }

    fn dyad_update(&mut self, g: &Graph, from: usize, to: usize, _order: &[usize], _i: usize) {
        let adding = !g.has_edge(from, to);
        self.last_delta = if g.is_directed() {
            Self::degree_shift(g.in_degree(to), adding)
        } else {
            Self::degree_shift(g.degree(from), adding) + Self::degree_shift(g.degree(to), adding)
        };
        self.current += self.last_delta;
    }

    fn rollback(&mut self) {
        self.current -= self.last_delta;
        self.last_delta = 0.0;
    }

    fn clone_box(&self) -> Box<dyn Term> {
        Box::new(self.clone())
    }
}
