// qc.rs

use rayon::prelude::*;

use crate::error::{AnalysisError, Result};
use crate::matrix::{CallStats, GenotypeMatrix, SnpInfo};
use crate::progress::{log, LogLevel};

/// Quality-control thresholds. Each value is a fraction in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcThresholds {
    min_maf: f64,
    max_missing_per_snp: f64,
    max_missing_per_sample: f64,
}

fn check_fraction(name: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} must be a number between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(value)
}

impl QcThresholds {
    pub fn new(min_maf: f64, max_missing_per_snp: f64, max_missing_per_sample: f64) -> Result<Self> {
        Ok(QcThresholds {
            min_maf: check_fraction("min_maf", min_maf)?,
            max_missing_per_snp: check_fraction("max_missing_per_snp", max_missing_per_snp)?,
            max_missing_per_sample: check_fraction("max_missing_per_sample", max_missing_per_sample)?,
        })
    }

    pub fn min_maf(&self) -> f64 {
        self.min_maf
    }

    pub fn max_missing_per_snp(&self) -> f64 {
        self.max_missing_per_snp
    }

    pub fn max_missing_per_sample(&self) -> f64 {
        self.max_missing_per_sample
    }
}

impl Default for QcThresholds {
    fn default() -> Self {
        QcThresholds {
            min_maf: 0.05,
            max_missing_per_snp: 0.2,
            max_missing_per_sample: 0.2,
        }
    }
}

/// Counts before and after QC, with the number removed at each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QcSummary {
    pub samples_before: usize,
    pub samples_after: usize,
    pub snps_before: usize,
    pub snps_after: usize,
    pub snps_removed_multiallelic: usize,
    pub snps_removed_missing: usize,
    pub snps_removed_maf: usize,
    pub samples_removed_missing: usize,
}

impl QcSummary {
    pub fn sample_retention_pct(&self) -> f64 {
        retention_pct(self.samples_after, self.samples_before)
    }

    pub fn snp_retention_pct(&self) -> f64 {
        retention_pct(self.snps_after, self.snps_before)
    }
}

fn retention_pct(after: usize, before: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    after as f64 / before as f64 * 100.0
}

/// Genotypes that passed QC, plus the counts describing what was removed.
#[derive(Debug, Clone)]
pub struct FilteredMatrix {
    matrix: GenotypeMatrix,
    summary: QcSummary,
}

impl FilteredMatrix {
    pub fn matrix(&self) -> &GenotypeMatrix {
        &self.matrix
    }

    pub fn summary(&self) -> &QcSummary {
        &self.summary
    }

    pub fn sample_ids(&self) -> &[String] {
        self.matrix.sample_ids()
    }

    pub fn snps(&self) -> &[SnpInfo] {
        self.matrix.snps()
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.n_samples()
    }

    pub fn n_snps(&self) -> usize {
        self.matrix.n_snps()
    }

    /// Wraps a matrix as-is, for callers that did their own filtering.
    /// Before and after counts are equal.
    pub fn unfiltered(matrix: GenotypeMatrix) -> Self {
        let summary = QcSummary {
            samples_before: matrix.n_samples(),
            samples_after: matrix.n_samples(),
            snps_before: matrix.n_snps(),
            snps_after: matrix.n_snps(),
            ..QcSummary::default()
        };
        FilteredMatrix { matrix, summary }
    }
}

/// Applies SNP-level filters and then the sample-level filter.
///
/// Order:
/// 1. drop non-biallelic SNPs
/// 2. drop SNPs whose missing rate exceeds `max_missing_per_snp`
/// 3. drop SNPs whose minor allele frequency is below `min_maf`
/// 4. drop samples whose missing rate over the surviving SNPs exceeds
///    `max_missing_per_sample`
///
/// Sample missingness is only measured on SNPs that survived the SNP filters;
/// swapping the order changes which samples are kept at the boundary.
pub fn apply_qc(genotypes: &GenotypeMatrix, thresholds: &QcThresholds) -> Result<FilteredMatrix> {
    let calls = genotypes.calls();
    let mut summary = QcSummary {
        samples_before: genotypes.n_samples(),
        snps_before: genotypes.n_snps(),
        ..QcSummary::default()
    };

    log(
        LogLevel::Info,
        &format!(
            "Starting QC with {} SNPs and {} samples",
            summary.snps_before, summary.samples_before
        ),
    );

    // Per-SNP statistics over all samples; columns are independent
    let snp_stats: Vec<CallStats> = (0..genotypes.n_snps())
        .into_par_iter()
        .map(|j| CallStats::from_calls(calls.column(j)))
        .collect();

    let mut kept_snps = Vec::with_capacity(genotypes.n_snps());
    for (j, (snp, stats)) in genotypes.snps().iter().zip(&snp_stats).enumerate() {
        if !snp.biallelic {
            summary.snps_removed_multiallelic += 1;
            continue;
        }
        if stats.missing_rate() > thresholds.max_missing_per_snp {
            summary.snps_removed_missing += 1;
            continue;
        }
        if stats.minor_allele_frequency() < thresholds.min_maf {
            summary.snps_removed_maf += 1;
            continue;
        }
        kept_snps.push(j);
    }

    log(
        LogLevel::Info,
        &format!(
            "SNP filters removed {} multi-allelic, {} high-missingness and {} low-MAF SNPs; {} remain",
            summary.snps_removed_multiallelic,
            summary.snps_removed_missing,
            summary.snps_removed_maf,
            kept_snps.len()
        ),
    );

    if kept_snps.is_empty() {
        let min_missing = genotypes
            .snps()
            .iter()
            .zip(&snp_stats)
            .filter(|(snp, _)| snp.biallelic)
            .map(|(_, s)| s.missing_rate())
            .fold(f64::INFINITY, f64::min);
        let mut message = format!(
            "no SNPs passed QC (min_maf {}, max_missing_per_snp {})",
            thresholds.min_maf, thresholds.max_missing_per_snp
        );
        if min_missing.is_finite() {
            message.push_str(&format!("; lowest SNP missing rate was {:.3}", min_missing));
        }
        return Err(AnalysisError::EmptyResult(message));
    }

    // Per-sample missingness over surviving SNPs only
    let sample_missing: Vec<f64> = (0..genotypes.n_samples())
        .into_par_iter()
        .map(|i| {
            let row = calls.row(i);
            let missing = kept_snps.iter().filter(|&&j| row[j].is_none()).count();
            missing as f64 / kept_snps.len() as f64
        })
        .collect();

    let kept_samples: Vec<usize> = sample_missing
        .iter()
        .enumerate()
        .filter(|(_, &rate)| rate <= thresholds.max_missing_per_sample)
        .map(|(i, _)| i)
        .collect();
    summary.samples_removed_missing = genotypes.n_samples() - kept_samples.len();

    if kept_samples.is_empty() {
        let min_missing = sample_missing.iter().cloned().fold(f64::INFINITY, f64::min);
        return Err(AnalysisError::EmptyResult(format!(
            "no samples passed the missingness filter (max_missing_per_sample {}); lowest sample missing rate was {:.3}",
            thresholds.max_missing_per_sample, min_missing
        )));
    }

    summary.samples_after = kept_samples.len();
    summary.snps_after = kept_snps.len();

    log(
        LogLevel::Info,
        &format!(
            "QC complete: {} of {} samples and {} of {} SNPs retained",
            summary.samples_after, summary.samples_before, summary.snps_after, summary.snps_before
        ),
    );

    Ok(FilteredMatrix {
        matrix: genotypes.select(&kept_samples, &kept_snps),
        summary,
    })
}
