//! Python bindings for the LOLOG engine.
//!
//! The estimator-facing surface: models are described with plain
//! arrays and a string term registry, the engine runs in Rust, and
//! results come back as dicts of numpy arrays. Compiled only with the
//! `python` cargo feature.

use pyo3::exceptions::{PyKeyboardInterrupt, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3::wrap_pyfunction;

use numpy::PyArray1;

use crate::error::LologError;
use crate::graph::{Graph, ORDER_ATTR};
use crate::latent::frame::{ModelFrame, NetworkSample};
use crate::latent::model::Model;
use crate::latent::sampler::{sample_networks_parallel, LatentOrderSampler};
use crate::latent::terms::term_from_spec;

fn to_py_err(err: LologError) -> PyErr {
    match err {
        LologError::Configuration(_) => PyValueError::new_err(err.to_string()),
        LologError::Cancelled => PyKeyboardInterrupt::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Build a model from the plain-data description shared by every entry
/// point.
#[allow(clippy::too_many_arguments)]
fn build_model(
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
) -> PyResult<Model> {
    if tails.len() != heads.len() {
        return Err(PyValueError::new_err(format!(
            "{} tails but {} heads",
            tails.len(),
            heads.len()
        )));
    }
    let edges: Vec<(usize, usize)> = tails.into_iter().zip(heads).collect();
    let mut graph = Graph::from_edges(n, directed, &edges).map_err(to_py_err)?;

    if let Some(covariates) = covariates {
        for (key, value) in covariates.iter() {
            let name: String = key.extract()?;
            let values: Vec<f64> = value.extract()?;
            graph
                .add_continuous_variable(name, values)
                .map_err(to_py_err)?;
        }
    }

    let terms = terms
        .iter()
        .map(|spec| term_from_spec(spec).map_err(to_py_err))
        .collect::<PyResult<Vec<_>>>()?;

    let model = Model::new(graph, terms, thetas).map_err(to_py_err)?;
    match vertex_order {
        Some(keys) => model.with_vertex_order(keys).map_err(to_py_err),
        None => Ok(model),
    }
}

fn sample_to_dict(py: Python<'_>, sample: NetworkSample) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    let (tails, heads): (Vec<i64>, Vec<i64>) = sample
        .network
        .edgelist()
        .into_iter()
        .map(|(u, v)| (u as i64, v as i64))
        .unzip();
    dict.set_item("tails", PyArray1::from_vec(py, tails))?;
    dict.set_item("heads", PyArray1::from_vec(py, heads))?;
    let order = sample
        .network
        .discrete_variable(ORDER_ATTR)
        .map(|o| o.to_vec())
        .unwrap_or_default();
    dict.set_item("order", PyArray1::from_vec(py, order))?;
    dict.set_item(
        "empty_network_stats",
        PyArray1::from_vec(py, sample.empty_network_stats),
    )?;
    dict.set_item("stats", PyArray1::from_vec(py, sample.stats))?;
    dict.set_item(
        "expected_stats",
        PyArray1::from_vec(py, sample.expected_stats),
    )?;
    if let Some(changes) = sample.change_stats {
        let rows: Vec<&PyArray1<f64>> = changes
            .into_iter()
            .map(|change| PyArray1::from_vec(py, change))
            .collect();
        dict.set_item("change_stats", rows)?;
    }
    Ok(dict.into())
}

fn frame_to_dict(py: Python<'_>, frame: ModelFrame) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    let outcome: Vec<i32> = frame.outcome.iter().map(|&o| o as i32).collect();
    dict.set_item("outcome", PyArray1::from_vec(py, outcome))?;
    let samples: Vec<&PyArray1<f64>> = frame
        .samples
        .into_iter()
        .map(|column| PyArray1::from_vec(py, column))
        .collect();
    dict.set_item("samples", samples)?;
    Ok(dict.into())
}

/// Simulate a single network draw from a LOLOG model.
///
/// # Arguments
/// * `n` - Number of vertices
/// * `directed` - Whether dyads are ordered pairs
/// * `tails` / `heads` - Observed edge list (only its size/metadata
///   matter for generation; frames and change stats read it)
/// * `terms` - Term registry specs, e.g. `["edges", "triangles"]`
/// * `thetas` - Parameter vector, one entry per term
/// * `seed` - RNG seed
/// * `vertex_order` - Optional partial-order keys, one per vertex
/// * `covariates` - Optional dict of continuous vertex attributes
/// * `store_change_stats` - Keep per-dyad change vectors
///
/// # Returns
/// * Dict with the generated edge list, the `__order__` ranks, and the
///   empty/realised/expected statistic vectors
#[pyfunction]
#[pyo3(signature = (n, directed, tails, heads, terms, thetas, seed, vertex_order=None, covariates=None, store_change_stats=false))]
#[allow(clippy::too_many_arguments)]
fn generate_network(
    py: Python<'_>,
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    seed: u64,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
    store_change_stats: bool,
) -> PyResult<PyObject> {
    let model = build_model(n, directed, tails, heads, terms, thetas, vertex_order, covariates)?;
    let mut sampler = LatentOrderSampler::from_seed(model, seed).map_err(to_py_err)?;
    let sample = if store_change_stats {
        sampler.generate_network_return_changes()
    } else {
        sampler.generate_network()
    }
    .map_err(to_py_err)?;
    sample_to_dict(py, sample)
}

/// Simulate a network over a random candidate dyad list (truncated
/// LOLOG when `trunc_rate < 1`).
#[pyfunction]
#[pyo3(signature = (n, directed, tails, heads, terms, thetas, seed, trunc_rate=1.0, vertex_order=None, covariates=None))]
#[allow(clippy::too_many_arguments)]
fn generate_network_unconstrained(
    py: Python<'_>,
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    seed: u64,
    trunc_rate: f64,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
) -> PyResult<PyObject> {
    let model = build_model(n, directed, tails, heads, terms, thetas, vertex_order, covariates)?;
    let mut sampler = LatentOrderSampler::from_seed(model, seed).map_err(to_py_err)?;
    let sample = sampler
        .generate_network_unconstrained(trunc_rate)
        .map_err(to_py_err)?;
    sample_to_dict(py, sample)
}

/// Simulate many independent network draws in parallel.
///
/// Worker `i` uses seed `seed + i`, so results are reproducible.
#[pyfunction]
#[pyo3(signature = (n, directed, tails, heads, terms, thetas, n_samples, seed, vertex_order=None, covariates=None))]
#[allow(clippy::too_many_arguments)]
fn simulate_networks(
    py: Python<'_>,
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    n_samples: usize,
    seed: u64,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
) -> PyResult<Vec<PyObject>> {
    let model = build_model(n, directed, tails, heads, terms, thetas, vertex_order, covariates)?;
    let samples = sample_networks_parallel(&model, n_samples, seed).map_err(to_py_err)?;
    samples
        .into_iter()
        .map(|sample| sample_to_dict(py, sample))
        .collect()
}

/// Produce model frames for variational fitting: one frame per
/// independent draw of the vertex visitation order.
///
/// # Returns
/// * List of dicts, each with an `outcome` (0/1) array and a `samples`
///   list holding one change-statistic array per term
#[pyfunction]
#[pyo3(signature = (n, directed, tails, heads, terms, thetas, n_orders, downsample_rate, seed, vertex_order=None, covariates=None))]
#[allow(clippy::too_many_arguments)]
fn variational_model_frame(
    py: Python<'_>,
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    n_orders: usize,
    downsample_rate: f64,
    seed: u64,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
) -> PyResult<Vec<PyObject>> {
    let model = build_model(n, directed, tails, heads, terms, thetas, vertex_order, covariates)?;
    let mut sampler = LatentOrderSampler::from_seed(model, seed).map_err(to_py_err)?;
    let frames = sampler
        .variational_model_frame(n_orders, downsample_rate)
        .map_err(to_py_err)?;
    frames.into_iter().map(|f| frame_to_dict(py, f)).collect()
}

/// Edge-permutation model frames for truncated-LOLOG initialisation:
/// candidates are seeded with the observed edges and padded with random
/// dyads up to `⌊e · trunc_rate⌋`.
#[pyfunction]
#[pyo3(signature = (n, directed, tails, heads, terms, thetas, n_orders, downsample_rate, trunc_rate, seed, vertex_order=None, covariates=None))]
#[allow(clippy::too_many_arguments)]
fn variational_model_frame_unconstrained(
    py: Python<'_>,
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    n_orders: usize,
    downsample_rate: f64,
    trunc_rate: f64,
    seed: u64,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
) -> PyResult<Vec<PyObject>> {
    let model = build_model(n, directed, tails, heads, terms, thetas, vertex_order, covariates)?;
    let mut sampler = LatentOrderSampler::from_seed(model, seed).map_err(to_py_err)?;
    let frames = sampler
        .variational_model_frame_unconstrained(n_orders, downsample_rate, trunc_rate)
        .map_err(to_py_err)?;
    frames.into_iter().map(|f| frame_to_dict(py, f)).collect()
}

/// Change statistics for a full canonical dyad list against the
/// observed graph's growth.
///
/// `perm_tails`/`perm_heads` must enumerate all `e` dyads.
#[pyfunction]
#[pyo3(signature = (n, directed, tails, heads, terms, thetas, perm_tails, perm_heads, seed, vertex_order=None, covariates=None))]
#[allow(clippy::too_many_arguments)]
fn calc_change_stats<'py>(
    py: Python<'py>,
    n: usize,
    directed: bool,
    tails: Vec<usize>,
    heads: Vec<usize>,
    terms: Vec<String>,
    thetas: Vec<f64>,
    perm_tails: Vec<usize>,
    perm_heads: Vec<usize>,
    seed: u64,
    vertex_order: Option<Vec<i64>>,
    covariates: Option<&PyDict>,
) -> PyResult<Vec<&'py PyArray1<f64>>> {
    let model = build_model(n, directed, tails, heads, terms, thetas, vertex_order, covariates)?;
    let mut sampler = LatentOrderSampler::from_seed(model, seed).map_err(to_py_err)?;
    let changes = sampler
        .calc_change_stats(&perm_heads, &perm_tails)
        .map_err(to_py_err)?;
    Ok(changes
        .into_iter()
        .map(|change| PyArray1::from_vec(py, change))
        .collect())
}

/// Python module definition
#[pymodule]
fn lolog_rust(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(generate_network, m)?)?;
    m.add_function(wrap_pyfunction!(generate_network_unconstrained, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_networks, m)?)?;
    m.add_function(wrap_pyfunction!(variational_model_frame, m)?)?;
    m.add_function(wrap_pyfunction!(variational_model_frame_unconstrained, m)?)?;
    m.add_function(wrap_pyfunction!(calc_change_stats, m)?)?;
    Ok(())
}
