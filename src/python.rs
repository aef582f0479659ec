// python.rs

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::Path;

use crate::params::{FstParams, ParamMap, PcaParams};
use crate::pipeline::{run_fst_pipeline_file, run_pca_pipeline_file};
use crate::report::render_insights;

/// Copies a Python dict into a `ParamMap`, stringifying values.
fn extract_params(params: Option<&PyDict>) -> PyResult<ParamMap> {
    let mut map = ParamMap::new();
    if let Some(dict) = params {
        for (key, value) in dict.iter() {
            let key: String = key.extract()?;
            if value.is_none() {
                continue;
            }
            let value = value.str()?.to_str()?.to_string();
            map.insert(&key, value);
        }
    }
    Ok(map)
}

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Runs QC and PCA on a VCF file.
///
/// # Arguments
/// * `path` - VCF or VCF.gz file
/// * `params` - optional dict with min_maf, max_missing_per_snp,
///   max_missing_per_sample, components and scaling
///
/// # Returns
/// * dict with `samples`, `scores`, `explained_variance_ratio`,
///   `component_count`, `qc` and `insights`
#[pyfunction]
fn run_pca(py: Python, path: &str, params: Option<&PyDict>) -> PyResult<PyObject> {
    let params = PcaParams::from_map(&extract_params(params)?).map_err(value_error)?;
    let report = run_pca_pipeline_file(Path::new(path), &params).map_err(value_error)?;

    let scores: Vec<Vec<f64>> = report
        .pca
        .scores
        .outer_iter()
        .map(|row| row.to_vec())
        .collect();

    let qc = PyDict::new(py);
    qc.set_item("samples_before", report.qc.samples_before)?;
    qc.set_item("samples_after", report.qc.samples_after)?;
    qc.set_item("snps_before", report.qc.snps_before)?;
    qc.set_item("snps_after", report.qc.snps_after)?;

    let result = PyDict::new(py);
    result.set_item("samples", report.pca.sample_ids.clone())?;
    result.set_item("scores", scores)?;
    result.set_item("explained_variance_ratio", report.pca.explained_variance_ratio.clone())?;
    result.set_item("component_count", report.pca.component_count)?;
    result.set_item("qc", qc)?;
    result.set_item("insights", render_insights(&report))?;
    Ok(result.into())
}

/// Computes the pairwise FST matrix from a pooled depth file.
///
/// # Arguments
/// * `path` - pooled depth table
/// * `params` - optional dict with min_pool_depth and estimator
///
/// # Returns
/// * dict with `pools`, `matrix` (undefined pairs as NaN),
///   `snp_count_input` and `snp_count_after_depth_filter`
#[pyfunction]
fn run_fst(py: Python, path: &str, params: Option<&PyDict>) -> PyResult<PyObject> {
    let params = FstParams::from_map(&extract_params(params)?).map_err(value_error)?;
    let matrix = run_fst_pipeline_file(Path::new(path), &params).map_err(value_error)?;

    let values: Vec<Vec<f64>> = matrix.to_array().outer_iter().map(|row| row.to_vec()).collect();

    let result = PyDict::new(py);
    result.set_item("pools", matrix.pool_ids.clone())?;
    result.set_item("matrix", values)?;
    result.set_item("estimator", matrix.estimator.to_string())?;
    result.set_item("snp_count_input", matrix.snp_count_input)?;
    result.set_item("snp_count_after_depth_filter", matrix.snp_count_after_depth_filter)?;
    Ok(result.into())
}

/// PyO3 module definition
#[pymodule]
fn radpop(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_pca, m)?)?;
    m.add_function(wrap_pyfunction!(run_fst, m)?)?;
    Ok(())
}
