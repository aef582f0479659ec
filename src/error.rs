// error.rs

use std::fmt;
use std::io;

/// Errors raised while parsing, filtering or analysing genotype and depth data.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Empty result: {0}")]
    EmptyResult(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        // A CSV error that wraps an IO failure stays an IO failure
        if e.is_io_error() {
            match e.into_kind() {
                csv::ErrorKind::Io(io_err) => AnalysisError::Io(io_err),
                other => AnalysisError::MalformedInput(format!("CSV error: {:?}", other)),
            }
        } else {
            AnalysisError::MalformedInput(format!("CSV error: {}", e))
        }
    }
}

/// The pipeline stage in which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Parsing,
    QualityControl,
    Computation,
    Export,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessingStage::Parsing => write!(f, "parsing"),
            ProcessingStage::QualityControl => write!(f, "quality control"),
            ProcessingStage::Computation => write!(f, "computation"),
            ProcessingStage::Export => write!(f, "export"),
        }
    }
}

/// An [`AnalysisError`] tagged with the stage that produced it.
///
/// This is what crosses the request boundary: the message names both the
/// failed stage and the offending condition.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: ProcessingStage,
    #[source]
    pub source: AnalysisError,
}

impl PipelineError {
    pub fn new(stage: ProcessingStage, source: AnalysisError) -> Self {
        PipelineError { stage, source }
    }
}

/// Extension for attaching a stage to results inside the pipeline.
pub trait StageContext<T> {
    fn in_stage(self, stage: ProcessingStage) -> Result<T, PipelineError>;
}

impl<T> StageContext<T> for Result<T, AnalysisError> {
    fn in_stage(self, stage: ProcessingStage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, e))
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
