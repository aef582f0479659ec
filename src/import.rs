// import.rs

use ndarray::Array2;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::table::{read_table, TableOptions, TableRecord};

/// Row sums of ADMIXTURE proportions may deviate from 1 by this much.
const ADMIXTURE_SUM_TOLERANCE: f64 = 0.01;

/// A principal component table produced elsewhere (e.g. smartpca `.evec`, plink `.eigenvec`).
#[derive(Debug, Clone)]
pub struct ImportedPca {
    /// Row labels when the first column is not numeric.
    pub labels: Option<Vec<String>>,
    pub column_names: Option<Vec<String>>,
    /// Rows x components.
    pub values: Array2<f64>,
}

/// Ancestry proportions, individuals x clusters.
#[derive(Debug, Clone)]
pub struct AdmixtureProportions {
    pub values: Array2<f64>,
}

fn read_rows<R: Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let options = TableOptions {
        comment: Some(b'#'),
        flexible: true,
    };
    let records = read_table(reader, options)?;
    if records.is_empty() {
        return Err(AnalysisError::MalformedInput("file is empty".to_string()));
    }
    Ok(records.iter().map(TableRecord::to_vec).collect())
}

fn is_numeric(field: &str) -> bool {
    field.parse::<f64>().is_ok()
}

/// Reads a PCA coordinate table with an optional header row and label column.
///
/// Trailing non-numeric columns (e.g. the population column of `.evec`
/// files) are ignored; at least two numeric component columns are required.
pub fn read_pca_table<R: Read>(reader: R) -> Result<ImportedPca> {
    let mut rows = read_rows(reader)?;

    // A header row has no numeric fields past the first column
    let column_names = if rows[0].iter().skip(1).all(|f| !is_numeric(f)) {
        Some(rows.remove(0))
    } else {
        None
    };
    if rows.is_empty() {
        return Err(AnalysisError::MalformedInput("PCA table has a header but no rows".to_string()));
    }

    let has_labels = rows.iter().any(|r| r.first().map_or(false, |f| !is_numeric(f)));
    let offset = usize::from(has_labels);

    let n_numeric = rows[0]
        .iter()
        .skip(offset)
        .take_while(|f| is_numeric(f))
        .count();
    if n_numeric < 2 {
        return Err(AnalysisError::MalformedInput(format!(
            "PCA table needs at least 2 numeric columns (PC1, PC2), found {}",
            n_numeric
        )));
    }

    let mut values = Array2::<f64>::zeros((rows.len(), n_numeric));
    let mut labels = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if row.len() < offset + n_numeric {
            return Err(AnalysisError::MalformedInput(format!(
                "PCA table row {} has {} columns, expected at least {}",
                i + 1,
                row.len(),
                offset + n_numeric
            )));
        }
        if has_labels {
            labels.push(row[0].clone());
        }
        for j in 0..n_numeric {
            values[[i, j]] = row[offset + j].parse().map_err(|_| {
                AnalysisError::MalformedInput(format!(
                    "PCA table row {} column {} is not numeric: '{}'",
                    i + 1,
                    offset + j + 1,
                    row[offset + j]
                ))
            })?;
        }
    }

    Ok(ImportedPca {
        labels: if has_labels { Some(labels) } else { None },
        column_names,
        values,
    })
}

/// Reads an ADMIXTURE `.Q` file and checks the proportions.
///
/// Every value must lie in [0, 1] and each row must sum to 1 within 0.01.
pub fn read_admixture_q<R: Read>(reader: R) -> Result<AdmixtureProportions> {
    let rows = read_rows(reader)?;
    let k = rows[0].len();
    if k == 0 {
        return Err(AnalysisError::MalformedInput("ADMIXTURE file has no columns".to_string()));
    }

    let mut values = Array2::<f64>::zeros((rows.len(), k));
    let mut min_sum = f64::INFINITY;
    let mut max_sum = f64::NEG_INFINITY;
    for (i, row) in rows.iter().enumerate() {
        if row.len() != k {
            return Err(AnalysisError::MalformedInput(format!(
                "ADMIXTURE row {} has {} columns, expected {}",
                i + 1,
                row.len(),
                k
            )));
        }
        let mut sum = 0.0;
        for (j, field) in row.iter().enumerate() {
            let v: f64 = field.parse().map_err(|_| {
                AnalysisError::MalformedInput(format!("ADMIXTURE row {} has non-numeric value '{}'", i + 1, field))
            })?;
            if !(0.0..=1.0).contains(&v) {
                return Err(AnalysisError::MalformedInput(format!(
                    "ADMIXTURE proportions must lie between 0 and 1; row {} has {}",
                    i + 1,
                    v
                )));
            }
            values[[i, j]] = v;
            sum += v;
        }
        min_sum = min_sum.min(sum);
        max_sum = max_sum.max(sum);
    }

    if (min_sum - 1.0).abs() > ADMIXTURE_SUM_TOLERANCE || (max_sum - 1.0).abs() > ADMIXTURE_SUM_TOLERANCE {
        return Err(AnalysisError::MalformedInput(format!(
            "ADMIXTURE proportions should sum to 1 for each sample; row sums range from {:.3} to {:.3}",
            min_sum, max_sum
        )));
    }

    Ok(AdmixtureProportions { values })
}

pub fn open_pca_table(path: &Path) -> Result<ImportedPca> {
    read_pca_table(File::open(path)?)
}

pub fn open_admixture_q(path: &Path) -> Result<AdmixtureProportions> {
    read_admixture_q(File::open(path)?)
}
