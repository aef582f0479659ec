// pca.rs

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::matrix::CallStats;
use crate::progress::{create_spinner, log, LogLevel};
use crate::qc::FilteredMatrix;

/// Eigenvalues below this fraction of the largest one count as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// Column scaling applied after mean-centering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scaling {
    /// Divide by the column's standard deviation (zero-variance columns keep scale 1).
    #[default]
    Standardize,
    /// Divide by sqrt(p(1-p)), p being the allele frequency implied by the column mean.
    Patterson,
    /// Centering only.
    CenterOnly,
}

impl FromStr for Scaling {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standardize" | "standard" | "zscore" => Ok(Scaling::Standardize),
            "patterson" | "allele_frequency" | "af" => Ok(Scaling::Patterson),
            "center" | "center_only" | "none" => Ok(Scaling::CenterOnly),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown scaling '{}' (expected standardize, patterson or center)",
                other
            ))),
        }
    }
}

impl fmt::Display for Scaling {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scaling::Standardize => write!(f, "standardize"),
            Scaling::Patterson => write!(f, "patterson"),
            Scaling::CenterOnly => write!(f, "center"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcaOptions {
    /// Requested number of components; capped to what the data supports.
    pub components: usize,
    pub scaling: Scaling,
}

impl Default for PcaOptions {
    fn default() -> Self {
        PcaOptions {
            components: 3,
            scaling: Scaling::Standardize,
        }
    }
}

/// Structure to hold PCA results
#[derive(Debug, Clone)]
pub struct PcaResult {
    pub sample_ids: Vec<String>,
    /// Samples x components.
    pub scores: Array2<f64>,
    /// Eigenvalues of the sample covariance for the kept components.
    pub explained_variance: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub component_count: usize,
    pub requested_components: usize,
    pub snp_count: usize,
}

/// Imputes missing calls with the column mean, centers each column and scales it.
///
/// Returns the samples x SNPs matrix of standardized values.
pub fn standardize_genotypes(filtered: &FilteredMatrix, scaling: Scaling) -> Array2<f64> {
    let calls = filtered.matrix().calls();
    let (n_samples, n_snps) = calls.dim();

    let columns: Vec<Vec<f64>> = (0..n_snps)
        .into_par_iter()
        .map(|j| {
            let column = calls.column(j);
            let stats = CallStats::from_calls(column);
            let mean = stats.mean_dosage();

            // After mean imputation the column mean is unchanged
            let values: Vec<f64> = column.iter().map(|c| c.map_or(mean, |d| d as f64)).collect();

            let scale = match scaling {
                Scaling::Standardize => {
                    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_samples as f64;
                    let sd = var.sqrt();
                    if sd > 1e-12 { sd } else { 1.0 }
                }
                Scaling::Patterson => {
                    let p = mean / 2.0;
                    let sd = (p * (1.0 - p)).sqrt();
                    if sd > 1e-12 { sd } else { 1.0 }
                }
                Scaling::CenterOnly => 1.0,
            };

            values.into_iter().map(|v| (v - mean) / scale).collect()
        })
        .collect();

    let mut data = Array2::<f64>::zeros((n_samples, n_snps));
    for (j, column) in columns.into_iter().enumerate() {
        for (i, v) in column.into_iter().enumerate() {
            data[[i, j]] = v;
        }
    }
    data
}

fn to_nalgebra(m: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

/// Eigenpairs sorted by descending eigenvalue. Vectors are the columns of the matrix.
fn sorted_eigen(symmetric: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let eig = SymmetricEigen::new(to_nalgebra(symmetric));
    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let n = symmetric.nrows();
    let values = order.iter().map(|&k| eig.eigenvalues[k].max(0.0)).collect();
    let mut vectors = Array2::<f64>::zeros((n, order.len()));
    for (col, &k) in order.iter().enumerate() {
        for row in 0..n {
            vectors[[row, col]] = eig.eigenvectors[(row, k)];
        }
    }
    (values, vectors)
}

/// Flips each component so that its largest-magnitude score is positive.
fn fix_signs(scores: &mut Array2<f64>) {
    for mut column in scores.axis_iter_mut(Axis(1)) {
        let mut pivot: f64 = 0.0;
        for &v in column.iter() {
            if v.abs() > pivot.abs() {
                pivot = v;
            }
        }
        if pivot < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}

/// Computes principal components of the filtered genotype matrix.
///
/// Missing calls are mean-imputed, columns are centered and scaled, and the
/// smaller of the Gram (`X Xᵀ`) or covariance (`Xᵀ X`) matrix is
/// eigendecomposed. The number of components is silently capped to
/// `min(samples - 1, SNPs, rank)`; the capped value is reported in
/// `component_count`.
///
/// # Errors
/// * `InvalidParameter` when zero components are requested
/// * `InsufficientData` with fewer than 2 samples, no SNPs, or no variance left
pub fn compute_pca(filtered: &FilteredMatrix, options: &PcaOptions) -> Result<PcaResult> {
    let n_samples = filtered.n_samples();
    let n_snps = filtered.n_snps();

    if options.components == 0 {
        return Err(AnalysisError::InvalidParameter(
            "number of principal components must be at least 1".to_string(),
        ));
    }
    if n_samples < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "PCA requires at least 2 samples, but only {} remain after QC",
            n_samples
        )));
    }
    if n_snps == 0 {
        return Err(AnalysisError::InsufficientData(
            "PCA requires at least 1 SNP, but none remain after QC".to_string(),
        ));
    }

    log(
        LogLevel::Info,
        &format!(
            "Starting PCA on {} samples and {} SNPs ({} scaling, {} components requested)",
            n_samples, n_snps, options.scaling, options.components
        ),
    );

    let spinner = create_spinner("Computing PCA");

    let x = standardize_genotypes(filtered, options.scaling);
    let denom = (n_samples - 1) as f64;

    // Decompose whichever side is smaller; both give the same non-zero spectrum
    let use_gram = n_samples <= n_snps;
    let (eigenvalues, eigenvectors) = if use_gram {
        let gram = x.dot(&x.t()) / denom;
        sorted_eigen(&gram)
    } else {
        let cov = x.t().dot(&x) / denom;
        sorted_eigen(&cov)
    };

    spinner.finish_and_clear();

    let total_variance: f64 = eigenvalues.iter().sum();
    let max_eigenvalue = eigenvalues.first().copied().unwrap_or(0.0);
    if !(total_variance > 0.0) || !(max_eigenvalue > 0.0) {
        return Err(AnalysisError::InsufficientData(
            "no genetic variation remains after QC".to_string(),
        ));
    }

    let rank = eigenvalues
        .iter()
        .filter(|&&v| v > RANK_TOLERANCE * max_eigenvalue)
        .count();
    let k = options.components.min(n_samples - 1).min(n_snps).min(rank);

    if k < options.components {
        log(
            LogLevel::Info,
            &format!(
                "Requested {} components but the data supports {}; computing {}",
                options.components, k, k
            ),
        );
    }

    let mut scores = if use_gram {
        // X = U S Vᵀ with S² = λ (n-1); scores are U S
        let mut s = eigenvectors.slice(ndarray::s![.., 0..k]).to_owned();
        for (c, mut column) in s.axis_iter_mut(Axis(1)).enumerate() {
            let singular = (eigenvalues[c] * denom).sqrt();
            column.mapv_inplace(|v| v * singular);
        }
        s
    } else {
        let v = eigenvectors.slice(ndarray::s![.., 0..k]).to_owned();
        x.dot(&v)
    };
    fix_signs(&mut scores);

    let explained_variance: Vec<f64> = eigenvalues[..k].to_vec();
    let explained_variance_ratio: Vec<f64> = explained_variance
        .iter()
        .map(|v| (v / total_variance).clamp(0.0, 1.0))
        .collect();

    if scores.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InsufficientData(
            "PCA produced non-finite scores".to_string(),
        ));
    }

    log(
        LogLevel::Info,
        &format!(
            "PCA complete: {} components explain {:.2}% of the variance",
            k,
            explained_variance_ratio.iter().sum::<f64>() * 100.0
        ),
    );

    Ok(PcaResult {
        sample_ids: filtered.sample_ids().to_vec(),
        scores,
        explained_variance,
        explained_variance_ratio,
        component_count: k,
        requested_components: options.components,
        snp_count: n_snps,
    })
}

impl PcaResult {
    /// Scores of one component across samples.
    pub fn component(&self, index: usize) -> Option<Array1<f64>> {
        if index < self.component_count {
            Some(self.scores.column(index).to_owned())
        } else {
            None
        }
    }

    pub fn cumulative_variance_ratio(&self, components: usize) -> f64 {
        self.explained_variance_ratio.iter().take(components).sum()
    }
}
