// fst.rs

use itertools::Itertools;
use ndarray::Array2;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::pooled::{DepthCount, PooledDepthData};
use crate::progress::{log, LogLevel};

/// Per-SNP FST estimator for a pair of pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FstEstimator {
    /// Hudson et al. (1992) in the form of Bhatia et al. (2013), with read
    /// depths as haploid sample sizes.
    #[default]
    Hudson,
    /// Weir & Cockerham (1984) θ for two haploid samples.
    WeirCockerham,
}

impl FromStr for FstEstimator {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hudson" => Ok(FstEstimator::Hudson),
            "wc" | "weir_cockerham" | "weir-cockerham" | "weircockerham" => Ok(FstEstimator::WeirCockerham),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown FST estimator '{}' (expected hudson or wc)",
                other
            ))),
        }
    }
}

impl fmt::Display for FstEstimator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FstEstimator::Hudson => write!(f, "hudson"),
            FstEstimator::WeirCockerham => write!(f, "weir_cockerham"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FstOptions {
    /// A SNP is kept only if every pool has at least this total depth.
    pub min_pool_depth: u32,
    pub estimator: FstEstimator,
}

impl Default for FstOptions {
    fn default() -> Self {
        FstOptions {
            min_pool_depth: 10,
            estimator: FstEstimator::Hudson,
        }
    }
}

/// Numerator and denominator of a per-SNP estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FstComponents {
    pub numerator: f64,
    pub denominator: f64,
}

impl FstComponents {
    /// The per-SNP value, `None` when the denominator vanishes.
    pub fn value(&self) -> Option<f64> {
        if self.denominator.abs() < 1e-12 || !self.numerator.is_finite() || !self.denominator.is_finite() {
            None
        } else {
            Some(self.numerator / self.denominator)
        }
    }
}

/// Hudson FST components for one SNP.
///
/// `π_i = 2 p_i (1 - p_i) n_i / (n_i - 1)`, `d_xy = p1 (1 - p2) + p2 (1 - p1)`,
/// FST = `(d_xy - (π1 + π2) / 2) / d_xy`.
pub fn hudson_components(a: DepthCount, b: DepthCount) -> Option<FstComponents> {
    let (n1, n2) = (a.total() as f64, b.total() as f64);
    if n1 < 2.0 || n2 < 2.0 {
        return None;
    }
    let p1 = a.ref_frequency()?;
    let p2 = b.ref_frequency()?;

    let pi1 = 2.0 * p1 * (1.0 - p1) * n1 / (n1 - 1.0);
    let pi2 = 2.0 * p2 * (1.0 - p2) * n2 / (n2 - 1.0);
    let dxy = p1 * (1.0 - p2) + p2 * (1.0 - p1);

    Some(FstComponents {
        numerator: dxy - (pi1 + pi2) / 2.0,
        denominator: dxy,
    })
}

/// Weir & Cockerham θ components for one SNP, two haploid samples.
///
/// `MSP = Σ n_i (p_i - p̄)²`, `MSG = Σ n_i p_i (1 - p_i) / (n1 + n2 - 2)`,
/// `n_c = n1 + n2 - (n1² + n2²) / (n1 + n2)`,
/// θ = `(MSP - MSG) / (MSP + (n_c - 1) MSG)`.
pub fn weir_cockerham_components(a: DepthCount, b: DepthCount) -> Option<FstComponents> {
    let (n1, n2) = (a.total() as f64, b.total() as f64);
    if n1 < 2.0 || n2 < 2.0 {
        return None;
    }
    let p1 = a.ref_frequency()?;
    let p2 = b.ref_frequency()?;

    let n = n1 + n2;
    let p_bar = (n1 * p1 + n2 * p2) / n;
    let msp = n1 * (p1 - p_bar).powi(2) + n2 * (p2 - p_bar).powi(2);
    let msg = (n1 * p1 * (1.0 - p1) + n2 * p2 * (1.0 - p2)) / (n - 2.0);
    let nc = n - (n1 * n1 + n2 * n2) / n;

    Some(FstComponents {
        numerator: msp - msg,
        denominator: msp + (nc - 1.0) * msg,
    })
}

impl FstEstimator {
    pub fn components(&self, a: DepthCount, b: DepthCount) -> Option<FstComponents> {
        match self {
            FstEstimator::Hudson => hudson_components(a, b),
            FstEstimator::WeirCockerham => weir_cockerham_components(a, b),
        }
    }
}

/// FST for one unordered pool pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseFst {
    pub pool_a: usize,
    pub pool_b: usize,
    /// Mean of per-SNP values; `None` when no SNP was informative.
    pub fst: Option<f64>,
    /// Number of retained SNPs with a defined per-SNP value for this pair.
    pub informative_snps: usize,
}

/// Symmetric pool x pool FST values with a zero diagonal.
#[derive(Debug, Clone)]
pub struct FstMatrix {
    pub pool_ids: Vec<String>,
    pub pairs: Vec<PairwiseFst>,
    pub estimator: FstEstimator,
    pub min_pool_depth: u32,
    pub snp_count_input: usize,
    pub snp_count_after_depth_filter: usize,
}

impl FstMatrix {
    pub fn n_pools(&self) -> usize {
        self.pool_ids.len()
    }

    /// FST between two pools by index. The diagonal is zero.
    pub fn get(&self, a: usize, b: usize) -> Option<f64> {
        if a == b {
            return Some(0.0);
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.pairs
            .iter()
            .find(|p| p.pool_a == lo && p.pool_b == hi)
            .and_then(|p| p.fst)
    }

    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let ia = self.pool_ids.iter().position(|p| p == a)?;
        let ib = self.pool_ids.iter().position(|p| p == b)?;
        self.get(ia, ib)
    }

    /// Dense matrix form; undefined pairs are NaN.
    pub fn to_array(&self) -> Array2<f64> {
        let n = self.n_pools();
        Array2::from_shape_fn((n, n), |(i, j)| self.get(i, j).unwrap_or(f64::NAN))
    }
}

/// SNP indices where every pool reaches `min_pool_depth` (and has any reads at all).
pub fn depth_filtered_snps(data: &PooledDepthData, min_pool_depth: u32) -> Vec<usize> {
    let threshold = u64::from(min_pool_depth.max(1));
    (0..data.n_snps())
        .filter(|&s| (0..data.n_pools()).all(|p| data.depth(p, s).total() >= threshold))
        .collect()
}

/// Computes pairwise FST between all pools.
///
/// SNPs where any pool's total depth falls below `min_pool_depth` are dropped
/// for every pair, so all pairs are averaged over the same SNP set.
///
/// # Errors
/// * `InsufficientData` with fewer than two pools
/// * `EmptyResult` when the depth filter removes every SNP
pub fn compute_fst(data: &PooledDepthData, options: &FstOptions) -> Result<FstMatrix> {
    if data.n_pools() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "FST requires at least 2 pools, found {}",
            data.n_pools()
        )));
    }

    let retained = depth_filtered_snps(data, options.min_pool_depth);
    log(
        LogLevel::Info,
        &format!(
            "Depth filter (min {} per pool) kept {} of {} SNPs",
            options.min_pool_depth,
            retained.len(),
            data.n_snps()
        ),
    );
    if retained.is_empty() {
        return Err(AnalysisError::EmptyResult(format!(
            "no SNPs have a total depth of at least {} in every pool",
            options.min_pool_depth
        )));
    }

    let pair_indices: Vec<(usize, usize)> = (0..data.n_pools()).tuple_combinations().collect();

    let pairs: Vec<PairwiseFst> = pair_indices
        .par_iter()
        .map(|&(a, b)| {
            let depths_a = data.pool_depths(a);
            let depths_b = data.pool_depths(b);
            let values: Vec<f64> = retained
                .iter()
                .filter_map(|&s| options.estimator.components(depths_a[s], depths_b[s]))
                .filter_map(|c| c.value())
                .collect();
            let fst = if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            };
            PairwiseFst {
                pool_a: a,
                pool_b: b,
                fst,
                informative_snps: values.len(),
            }
        })
        .collect();

    for pair in pairs.iter().filter(|p| p.fst.is_none()) {
        log(
            LogLevel::Warning,
            &format!(
                "No informative SNPs for pools {} and {}; FST undefined",
                data.pool_ids()[pair.pool_a],
                data.pool_ids()[pair.pool_b]
            ),
        );
    }

    Ok(FstMatrix {
        pool_ids: data.pool_ids().to_vec(),
        pairs,
        estimator: options.estimator,
        min_pool_depth: options.min_pool_depth,
        snp_count_input: data.n_snps(),
        snp_count_after_depth_filter: retained.len(),
    })
}
