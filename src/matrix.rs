// matrix.rs

use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashSet;

use crate::error::{AnalysisError, Result};

/// Metadata for one variant column of a genotype matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SnpInfo {
    pub chrom: String,
    pub pos: i64,
    /// The VCF ID column, `.` when absent.
    pub id: String,
    pub reference: String,
    pub alternate: String,
    /// False when ALT lists several alleles or a call used allele index >= 2.
    pub biallelic: bool,
}

impl SnpInfo {
    /// Unique key of the SNP inside a matrix.
    pub fn key(&self) -> String {
        format!("{}:{}", self.chrom, self.pos)
    }
}

/// Samples x SNPs matrix of alternate-allele counts. `None` marks a missing call.
#[derive(Debug, Clone)]
pub struct GenotypeMatrix {
    sample_ids: Vec<String>,
    snps: Vec<SnpInfo>,
    calls: Array2<Option<u8>>,
}

impl GenotypeMatrix {
    /// Builds a matrix, checking shape, key uniqueness and the call range.
    pub fn new(sample_ids: Vec<String>, snps: Vec<SnpInfo>, calls: Array2<Option<u8>>) -> Result<Self> {
        if calls.nrows() != sample_ids.len() || calls.ncols() != snps.len() {
            return Err(AnalysisError::MalformedInput(format!(
                "genotype matrix is {}x{} but {} samples and {} SNPs were given",
                calls.nrows(),
                calls.ncols(),
                sample_ids.len(),
                snps.len()
            )));
        }

        let mut seen = HashSet::with_capacity(sample_ids.len());
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(AnalysisError::MalformedInput(format!("duplicate sample identifier '{}'", id)));
            }
        }

        let mut seen_snps = HashSet::with_capacity(snps.len());
        for snp in &snps {
            if !seen_snps.insert(snp.key()) {
                return Err(AnalysisError::MalformedInput(format!("duplicate SNP identifier '{}'", snp.key())));
            }
        }

        if let Some(bad) = calls.iter().flatten().find(|&&c| c > 2) {
            return Err(AnalysisError::MalformedInput(format!("genotype value {} outside 0..=2", bad)));
        }

        Ok(GenotypeMatrix { sample_ids, snps, calls })
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn snps(&self) -> &[SnpInfo] {
        &self.snps
    }

    pub fn calls(&self) -> &Array2<Option<u8>> {
        &self.calls
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_snps(&self) -> usize {
        self.snps.len()
    }

    /// Returns a new matrix restricted to the given row and column indices, in order.
    pub fn select(&self, sample_indices: &[usize], snp_indices: &[usize]) -> GenotypeMatrix {
        let calls = self
            .calls
            .select(Axis(0), sample_indices)
            .select(Axis(1), snp_indices);
        GenotypeMatrix {
            sample_ids: sample_indices.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            snps: snp_indices.iter().map(|&j| self.snps[j].clone()).collect(),
            calls,
        }
    }
}

/// Per-column call statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallStats {
    pub called: usize,
    pub missing: usize,
    pub alt_alleles: usize,
}

impl CallStats {
    pub fn from_calls(calls: ArrayView1<Option<u8>>) -> Self {
        let mut stats = CallStats { called: 0, missing: 0, alt_alleles: 0 };
        for call in calls.iter() {
            match call {
                Some(dosage) => {
                    stats.called += 1;
                    stats.alt_alleles += *dosage as usize;
                }
                None => stats.missing += 1,
            }
        }
        stats
    }

    pub fn missing_rate(&self) -> f64 {
        let total = self.called + self.missing;
        if total == 0 {
            return 0.0;
        }
        self.missing as f64 / total as f64
    }

    /// Alternate allele frequency among called genotypes (0 when nothing is called).
    pub fn alt_frequency(&self) -> f64 {
        if self.called == 0 {
            return 0.0;
        }
        self.alt_alleles as f64 / (2 * self.called) as f64
    }

    pub fn minor_allele_frequency(&self) -> f64 {
        let f = self.alt_frequency();
        f.min(1.0 - f)
    }

    /// Mean dosage of called genotypes, used for imputation.
    pub fn mean_dosage(&self) -> f64 {
        if self.called == 0 {
            return 0.0;
        }
        self.alt_alleles as f64 / self.called as f64
    }
}
