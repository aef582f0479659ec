// Module declarations
pub mod error;
pub mod export;
pub mod fst;
pub mod import;
pub mod matrix;
pub mod params;
pub mod pca;
pub mod pipeline;
pub mod pooled;
pub mod progress;
pub mod qc;
pub mod report;
pub mod table;
pub mod vcf;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod tests;

pub use error::{AnalysisError, PipelineError, ProcessingStage};
pub use fst::{compute_fst, FstEstimator, FstMatrix, FstOptions};
pub use matrix::{GenotypeMatrix, SnpInfo};
pub use params::{FstParams, ParamMap, PcaParams};
pub use pca::{compute_pca, PcaOptions, PcaResult, Scaling};
pub use pipeline::{run_fst_pipeline, run_pca_pipeline, PcaReport};
pub use pooled::{read_pooled_depths, PooledDepthData};
pub use qc::{apply_qc, FilteredMatrix, QcSummary, QcThresholds};
pub use vcf::read_vcf;
