//! Mutable simple graph with named vertex attributes.
//!
//! The vertex set `0..n` is fixed at construction; edges are toggled
//! freely. Adjacency is kept in per-vertex ordered sets so neighbor
//! iteration is deterministic and `toggle`/`has_edge` are O(log deg).

use std::collections::{BTreeSet, HashMap};

use crate::error::LologError;

/// Name of the discrete attribute stamped by network generation,
/// giving each vertex its rank in the sampled visitation order.
pub const ORDER_ATTR: &str = "__order__";

/// A simple (un)directed graph without self-loops or multi-edges.
///
/// For undirected graphs each edge is stored in both endpoints'
/// neighbor sets. Directed graphs additionally maintain in-neighbor
/// sets so in-degree queries stay O(1) in the edge count.
#[derive(Clone, Debug)]
pub struct Graph {
    n: usize,
    directed: bool,
    nbrs: Vec<BTreeSet<usize>>,
    in_nbrs: Vec<BTreeSet<usize>>,
    n_edges: usize,
    discrete_attrs: HashMap<String, Vec<i64>>,
    continuous_attrs: HashMap<String, Vec<f64>>,
}

impl Graph {
    /// Create an edgeless graph on `n` vertices.
    pub fn new(n: usize, directed: bool) -> Self {
        Self {
            n,
            directed,
            nbrs: vec![BTreeSet::new(); n],
            in_nbrs: if directed {
                vec![BTreeSet::new(); n]
            } else {
                Vec::new()
            },
            n_edges: 0,
            discrete_attrs: HashMap::new(),
            continuous_attrs: HashMap::new(),
        }
    }

    /// Create a graph from an edge list.
    ///
    /// # Arguments
    /// * `n` - Number of vertices
    /// * `directed` - Whether edges are ordered pairs
    /// * `edges` - (from, to) pairs; duplicates collapse to one edge
    pub fn from_edges(
        n: usize,
        directed: bool,
        edges: &[(usize, usize)],
    ) -> Result<Self, LologError> {
        let mut g = Self::new(n, directed);
        for &(u, v) in edges {
            if u >= n || v >= n {
                return Err(LologError::config(format!(
                    "edge ({}, {}) out of range for {} vertices",
                    u, v, n
                )));
            }
            if u == v {
                return Err(LologError::config(format!("self-loop at vertex {}", u)));
            }
            if !g.has_edge(u, v) {
                g.toggle(u, v);
            }
        }
        Ok(g)
    }

    /// Number of vertices.
    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Number of edges (arcs when directed).
    #[inline]
    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Maximum possible number of edges: n(n-1) directed, n(n-1)/2 not.
    pub fn max_edges(&self) -> usize {
        let e = self.n * self.n.saturating_sub(1);
        if self.directed {
            e
        } else {
            e / 2
        }
    }

    /// Whether the edge (arc) `from -> to` is present. Symmetric when
    /// the graph is undirected.
    #[inline]
    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.nbrs[from].contains(&to)
    }

    /// Flip the presence of the dyad `from -> to`. Its own inverse.
    pub fn toggle(&mut self, from: usize, to: usize) {
        debug_assert!(from != to, "self-loops are not representable");
        if self.nbrs[from].remove(&to) {
            self.n_edges -= 1;
            if self.directed {
                self.in_nbrs[to].remove(&from);
            } else {
                self.nbrs[to].remove(&from);
            }
        } else {
            self.nbrs[from].insert(to);
            self.n_edges += 1;
            if self.directed {
                self.in_nbrs[to].insert(from);
            } else {
                self.nbrs[to].insert(from);
            }
        }
    }

    /// Neighbors of `v` (out-neighbors when directed).
    #[inline]
    pub fn neighbors(&self, v: usize) -> &BTreeSet<usize> {
        &self.nbrs[v]
    }

    /// In-neighbors of `v`. Equal to `neighbors(v)` when undirected.
    #[inline]
    pub fn in_neighbors(&self, v: usize) -> &BTreeSet<usize> {
        if self.directed {
            &self.in_nbrs[v]
        } else {
            &self.nbrs[v]
        }
    }

    /// Degree of `v` (out-degree when directed).
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.nbrs[v].len()
    }

    /// In-degree of `v`.
    #[inline]
    pub fn in_degree(&self, v: usize) -> usize {
        self.in_neighbors(v).len()
    }

    /// Whether `u` and `v` are joined by at least one arc in either
    /// direction (plain adjacency when undirected).
    pub fn connected(&self, u: usize, v: usize) -> bool {
        self.has_edge(u, v) || (self.directed && self.has_edge(v, u))
    }

    /// All edges as (from, to) pairs; `from < to` when undirected.
    pub fn edgelist(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::with_capacity(self.n_edges);
        for u in 0..self.n {
            for &v in &self.nbrs[u] {
                if self.directed || u < v {
                    edges.push((u, v));
                }
            }
        }
        edges
    }

    /// Remove every edge, keeping vertices and attributes.
    pub fn empty_graph(&mut self) {
        for s in &mut self.nbrs {
            s.clear();
        }
        for s in &mut self.in_nbrs {
            s.clear();
        }
        self.n_edges = 0;
    }

    /// Attach a named discrete per-vertex variable.
    pub fn add_discrete_variable(
        &mut self,
        name: impl Into<String>,
        values: Vec<i64>,
    ) -> Result<(), LologError> {
        if values.len() != self.n {
            return Err(LologError::config(format!(
                "discrete variable has {} values for {} vertices",
                values.len(),
                self.n
            )));
        }
        self.discrete_attrs.insert(name.into(), values);
        Ok(())
    }

    /// Attach a named continuous per-vertex variable.
    pub fn add_continuous_variable(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), LologError> {
        if values.len() != self.n {
            return Err(LologError::config(format!(
                "continuous variable has {} values for {} vertices",
                values.len(),
                self.n
            )));
        }
        self.continuous_attrs.insert(name.into(), values);
        Ok(())
    }

    /// Look up a discrete variable by name.
    pub fn discrete_variable(&self, name: &str) -> Option<&[i64]> {
        self.discrete_attrs.get(name).map(|v| v.as_slice())
    }

    /// Look up a continuous variable by name.
    pub fn continuous_variable(&self, name: &str) -> Option<&[f64]> {
        self.continuous_attrs.get(name).map(|v| v.as_slice())
    }
}
