//! Latent order logistic (LOLOG) network simulation engine.
//!
//! A LOLOG model defines a distribution over graphs through a
//! sequential growth process: dyads are visited in a random order
//! consistent with an optional partial vertex ordering, and each is
//! kept with a logistic probability driven by the change it causes in
//! a vector of network statistics. This crate implements the engine:
//! graph, incremental statistics, order sampling, network generation,
//! and model-frame production. Parameter estimation stays with the
//! host-language package built on top of it.

pub mod error;
pub mod graph;
pub mod latent;

#[cfg(feature = "python")]
mod python;

pub use error::LologError;
pub use graph::{Graph, ORDER_ATTR};
pub use latent::{
    sample_networks_parallel, LatentOrderSampler, Model, ModelFrame, NetworkSample, Term,
};
