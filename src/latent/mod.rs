//! Latent-order likelihood engine.
//!
//! This module provides:
//! - Term: the incremental statistic contract
//! - terms: built-in statistics (edges, triangles, node covariate,
//!   degree popularity)
//! - Model: graph + terms + θ with dyad-update/rollback
//! - order: visitation-order sampling under partial-order constraints
//! - LatentOrderSampler: network generation and model-frame production
//! - ModelFrame / NetworkSample: estimator-facing outputs

pub mod frame;
pub mod model;
pub mod order;
pub mod sampler;
pub mod term;
pub mod terms;

pub use frame::{ModelFrame, NetworkSample};
pub use model::Model;
pub use order::{generate_vertex_order, rank_random};
pub use sampler::{sample_networks_parallel, LatentOrderSampler};
pub use term::Term;
pub use terms::{term_from_spec, DegreePopularity, Edges, NodeCov, Triangles};
