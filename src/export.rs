// export.rs

use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::fst::FstMatrix;
use crate::matrix::SnpInfo;
use crate::pca::PcaResult;
use crate::progress::{create_spinner, log, LogLevel};

/// Label of the trailing row in `.pca` exports.
pub const VARIANCE_ROW_LABEL: &str = "explained_variance_ratio";

fn format_value(v: f64) -> String {
    format!("{:.6}", v)
}

/// Writes PCA scores as a tab-separated table followed by an explained variance row.
pub fn write_pca<W: Write>(result: &PcaResult, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(writer);

    let mut header = vec!["sample".to_string()];
    header.extend((1..=result.component_count).map(|i| format!("PC{}", i)));
    wtr.write_record(&header)?;

    for (idx, sample) in result.sample_ids.iter().enumerate() {
        let mut row = vec![sample.clone()];
        row.extend(result.scores.row(idx).iter().map(|&v| format_value(v)));
        wtr.write_record(&row)?;
    }

    let mut variance_row = vec![VARIANCE_ROW_LABEL.to_string()];
    variance_row.extend(result.explained_variance_ratio.iter().map(|&v| format_value(v)));
    wtr.write_record(&variance_row)?;

    wtr.flush()?;
    Ok(())
}

pub fn write_pca_file(result: &PcaResult, output_file: &Path) -> Result<()> {
    let spinner = create_spinner(&format!("Writing PCA results to {}", output_file.display()));
    let file = File::create(output_file)?;
    write_pca(result, BufWriter::new(file))?;
    spinner.finish_and_clear();
    log(LogLevel::Info, &format!("PCA results written to {}", output_file.display()));
    Ok(())
}

/// Writes the retained SNP list (`snp chrom pos ref alt`), tab-separated.
pub fn write_snp_list<W: Write>(snps: &[SnpInfo], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    wtr.write_record(["snp", "chrom", "pos", "ref", "alt"])?;
    for snp in snps {
        wtr.write_record([
            snp.key(),
            snp.chrom.clone(),
            snp.pos.to_string(),
            snp.reference.clone(),
            snp.alternate.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_snp_list_file(snps: &[SnpInfo], output_file: &Path) -> Result<()> {
    let file = File::create(output_file)?;
    write_snp_list(snps, BufWriter::new(file))?;
    log(LogLevel::Info, &format!("Retained SNP list written to {}", output_file.display()));
    Ok(())
}

/// Writes the FST matrix as CSV with a `pool` header column. Undefined pairs are `NA`.
pub fn write_fst_csv<W: Write>(matrix: &FstMatrix, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b',').from_writer(writer);

    let mut header = vec!["pool".to_string()];
    header.extend(matrix.pool_ids.iter().cloned());
    wtr.write_record(&header)?;

    for (i, pool) in matrix.pool_ids.iter().enumerate() {
        let mut row = vec![pool.clone()];
        for j in 0..matrix.n_pools() {
            row.push(match matrix.get(i, j) {
                Some(v) => format_value(v),
                None => "NA".to_string(),
            });
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_fst_file(matrix: &FstMatrix, output_file: &Path) -> Result<()> {
    let file = File::create(output_file)?;
    write_fst_csv(matrix, BufWriter::new(file))?;
    log(LogLevel::Info, &format!("FST matrix written to {}", output_file.display()));
    Ok(())
}
