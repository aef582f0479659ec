// pipeline.rs

use std::io::Read;
use std::path::Path;

use crate::error::{PipelineError, ProcessingStage, StageContext};
use crate::fst::{compute_fst, FstMatrix};
use crate::matrix::{GenotypeMatrix, SnpInfo};
use crate::params::{FstParams, PcaParams};
use crate::pca::{compute_pca, PcaResult};
use crate::pooled::{open_pooled_depths, read_pooled_depths, PooledDepthData};
use crate::progress::{log, LogLevel};
use crate::qc::{apply_qc, QcSummary};
use crate::vcf::{open_vcf, read_vcf};

/// Everything a PCA request produces.
#[derive(Debug, Clone)]
pub struct PcaReport {
    pub qc: QcSummary,
    /// SNPs that entered the PCA, in column order.
    pub snps: Vec<SnpInfo>,
    pub pca: PcaResult,
}

/// Runs VCF parsing, QC and PCA for one request.
///
/// The request owns every intermediate value; nothing is cached between
/// calls. A failure carries the stage it happened in and no partial result.
pub fn run_pca_pipeline<R: Read>(input: R, params: &PcaParams) -> Result<PcaReport, PipelineError> {
    let genotypes = read_vcf(input).in_stage(ProcessingStage::Parsing)?;
    pca_from_genotypes(genotypes, params)
}

/// `run_pca_pipeline` on a VCF or VCF.gz file.
pub fn run_pca_pipeline_file(path: &Path, params: &PcaParams) -> Result<PcaReport, PipelineError> {
    let genotypes = open_vcf(path).in_stage(ProcessingStage::Parsing)?;
    pca_from_genotypes(genotypes, params)
}

fn pca_from_genotypes(genotypes: GenotypeMatrix, params: &PcaParams) -> Result<PcaReport, PipelineError> {
    let filtered = apply_qc(&genotypes, &params.qc).in_stage(ProcessingStage::QualityControl)?;
    // The raw matrix is not needed past QC
    drop(genotypes);
    let pca = compute_pca(&filtered, &params.pca).in_stage(ProcessingStage::Computation)?;

    log(
        LogLevel::Info,
        &format!(
            "PCA request finished: {} samples, {} SNPs, {} components",
            filtered.n_samples(),
            filtered.n_snps(),
            pca.component_count
        ),
    );

    Ok(PcaReport {
        qc: *filtered.summary(),
        snps: filtered.snps().to_vec(),
        pca,
    })
}

/// Runs pooled depth parsing and pairwise FST for one request.
pub fn run_fst_pipeline<R: Read>(input: R, params: &FstParams) -> Result<FstMatrix, PipelineError> {
    let depths = read_pooled_depths(input).in_stage(ProcessingStage::Parsing)?;
    fst_from_depths(&depths, params)
}

/// `run_fst_pipeline` on a pooled depth file.
pub fn run_fst_pipeline_file(path: &Path, params: &FstParams) -> Result<FstMatrix, PipelineError> {
    let depths = open_pooled_depths(path).in_stage(ProcessingStage::Parsing)?;
    fst_from_depths(&depths, params)
}

fn fst_from_depths(depths: &PooledDepthData, params: &FstParams) -> Result<FstMatrix, PipelineError> {
    let matrix = compute_fst(depths, &params.fst).in_stage(ProcessingStage::Computation)?;

    log(
        LogLevel::Info,
        &format!(
            "FST request finished: {} pools, {} of {} SNPs used",
            matrix.n_pools(),
            matrix.snp_count_after_depth_filter,
            matrix.snp_count_input
        ),
    );
    Ok(matrix)
}
