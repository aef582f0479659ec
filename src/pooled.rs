// pooled.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::progress::{log, LogLevel};
use crate::table::{read_table, TableOptions};

static POOL_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(reference_count|ref_count|pool_depth|alt_count|alternative_count)_(.+)$")
        .expect("pool column pattern is valid")
});

/// Read counts supporting each allele in one pool at one SNP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthCount {
    pub ref_depth: u32,
    pub alt_depth: u32,
}

impl DepthCount {
    /// Total depth, widened so that two `u32` counts never overflow.
    pub fn total(&self) -> u64 {
        u64::from(self.ref_depth) + u64::from(self.alt_depth)
    }

    /// Reference allele frequency, `None` with zero depth.
    pub fn ref_frequency(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.ref_depth as f64 / total as f64)
        }
    }
}

/// Allele depths for every pool at every SNP. `depths[p][s]` is pool `p`, SNP `s`.
#[derive(Debug, Clone)]
pub struct PooledDepthData {
    pool_ids: Vec<String>,
    snp_ids: Vec<String>,
    depths: Vec<Vec<DepthCount>>,
}

impl PooledDepthData {
    pub fn new(pool_ids: Vec<String>, snp_ids: Vec<String>, depths: Vec<Vec<DepthCount>>) -> Result<Self> {
        if depths.len() != pool_ids.len() {
            return Err(AnalysisError::MalformedInput(format!(
                "{} pools named but depth data for {}",
                pool_ids.len(),
                depths.len()
            )));
        }
        if let Some((p, row)) = depths.iter().enumerate().find(|(_, row)| row.len() != snp_ids.len()) {
            return Err(AnalysisError::MalformedInput(format!(
                "pool '{}' has {} depth entries for {} SNPs",
                pool_ids[p],
                row.len(),
                snp_ids.len()
            )));
        }
        let mut seen = HashSet::with_capacity(snp_ids.len());
        for id in &snp_ids {
            if !seen.insert(id.as_str()) {
                return Err(AnalysisError::MalformedInput(format!("duplicate SNP identifier '{}'", id)));
            }
        }
        let mut seen_pools = HashSet::with_capacity(pool_ids.len());
        for id in &pool_ids {
            if !seen_pools.insert(id.as_str()) {
                return Err(AnalysisError::MalformedInput(format!("duplicate pool identifier '{}'", id)));
            }
        }
        Ok(PooledDepthData { pool_ids, snp_ids, depths })
    }

    pub fn pool_ids(&self) -> &[String] {
        &self.pool_ids
    }

    pub fn snp_ids(&self) -> &[String] {
        &self.snp_ids
    }

    pub fn n_pools(&self) -> usize {
        self.pool_ids.len()
    }

    pub fn n_snps(&self) -> usize {
        self.snp_ids.len()
    }

    pub fn depth(&self, pool: usize, snp: usize) -> DepthCount {
        self.depths[pool][snp]
    }

    pub fn pool_depths(&self, pool: usize) -> &[DepthCount] {
        &self.depths[pool]
    }
}

/// How the second column of a pool is interpreted.
#[derive(Debug, Clone, Copy)]
enum SecondColumn {
    TotalDepth(usize),
    AltCount(usize),
}

#[derive(Debug, Clone, Copy)]
struct PoolColumns {
    reference: usize,
    second: SecondColumn,
}

/// Where SNP identifiers come from.
#[derive(Debug, Clone, Copy)]
enum SnpIdSource {
    ChromPos(usize, usize),
    Column(usize),
    RowNumber,
}

fn parse_depth(field: &str, line_num: u64, column: &str) -> Result<u32> {
    let value: f64 = field.parse().map_err(|_| {
        AnalysisError::MalformedInput(format!(
            "line {}: column '{}' has non-numeric depth '{}'",
            line_num, column, field
        ))
    })?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(AnalysisError::MalformedInput(format!(
            "line {}: column '{}' has invalid depth '{}' (expected a non-negative integer)",
            line_num, column, field
        )));
    }
    Ok(value as u32)
}

fn locate_pools(header: &[String]) -> Result<(Vec<String>, Vec<PoolColumns>, Vec<usize>)> {
    let mut references: BTreeMap<String, usize> = BTreeMap::new();
    let mut totals: BTreeMap<String, usize> = BTreeMap::new();
    let mut alts: BTreeMap<String, usize> = BTreeMap::new();
    let mut other_columns = Vec::new();

    for (idx, name) in header.iter().enumerate() {
        match POOL_COLUMN.captures(name) {
            Some(caps) => {
                let pool = caps[2].to_string();
                let target = match &caps[1] {
                    "reference_count" | "ref_count" => &mut references,
                    "pool_depth" => &mut totals,
                    _ => &mut alts,
                };
                if target.insert(pool.clone(), idx).is_some() {
                    return Err(AnalysisError::MalformedInput(format!(
                        "column '{}' appears more than once",
                        name
                    )));
                }
            }
            None => other_columns.push(idx),
        }
    }

    if references.is_empty() {
        return Err(AnalysisError::MalformedInput(
            "no pool columns found; expected reference_count_<pool> with pool_depth_<pool> or alt_count_<pool>"
                .to_string(),
        ));
    }

    // BTreeMap keeps pools sorted by name
    let mut pool_ids = Vec::with_capacity(references.len());
    let mut columns = Vec::with_capacity(references.len());
    for (pool, &reference) in &references {
        let second = match (totals.get(pool), alts.get(pool)) {
            (Some(&t), _) => SecondColumn::TotalDepth(t),
            (None, Some(&a)) => SecondColumn::AltCount(a),
            (None, None) => {
                return Err(AnalysisError::MalformedInput(format!(
                    "pool '{}' has a reference count column but no pool_depth or alt_count column",
                    pool
                )))
            }
        };
        pool_ids.push(pool.clone());
        columns.push(PoolColumns { reference, second });
    }

    if let Some(orphan) = totals.keys().chain(alts.keys()).find(|p| !references.contains_key(*p)) {
        return Err(AnalysisError::MalformedInput(format!(
            "pool '{}' has depth columns but no reference_count column",
            orphan
        )));
    }

    Ok((pool_ids, columns, other_columns))
}

fn snp_id_source(header: &[String], other_columns: &[usize]) -> SnpIdSource {
    let find = |names: &[&str]| {
        other_columns
            .iter()
            .copied()
            .find(|&i| names.iter().any(|n| header[i].eq_ignore_ascii_case(n)))
    };
    match (find(&["chrom", "chr", "#chrom", "chromosome"]), find(&["pos", "position"])) {
        (Some(c), Some(p)) => SnpIdSource::ChromPos(c, p),
        _ => match other_columns.first() {
            Some(&first) => SnpIdSource::Column(first),
            None => SnpIdSource::RowNumber,
        },
    }
}

pub fn open_pooled_depths(path: &Path) -> Result<PooledDepthData> {
    let file = File::open(path)?;
    log(LogLevel::Info, &format!("Reading pooled depth file {}", path.display()));
    read_pooled_depths(file)
}

/// Parses a pooled allele-depth table.
///
/// One row per SNP. Each pool contributes a `reference_count_<pool>` column
/// and either a `pool_depth_<pool>` (total depth) or `alt_count_<pool>` column.
/// Columns may be tab, comma or whitespace separated.
pub fn read_pooled_depths<R: Read>(reader: R) -> Result<PooledDepthData> {
    let options = TableOptions {
        comment: None,
        flexible: false,
    };
    let records = read_table(reader, options).map_err(|e| match e {
        AnalysisError::MalformedInput(msg) => AnalysisError::MalformedInput(format!("pooled depth file: {}", msg)),
        other => other,
    })?;
    let mut records = records.into_iter();
    let header = match records.next() {
        Some(record) => record.to_vec(),
        None => return Err(AnalysisError::MalformedInput("pooled depth file is empty".to_string())),
    };

    let (pool_ids, columns, other_columns) = locate_pools(&header)?;
    let id_source = snp_id_source(&header, &other_columns);

    let mut snp_ids = Vec::new();
    let mut depths: Vec<Vec<DepthCount>> = vec![Vec::new(); pool_ids.len()];

    for record in records {
        let line_num = record.line;
        let fields = record.to_vec();

        let snp_id = match id_source {
            SnpIdSource::ChromPos(c, p) => format!("{}:{}", fields[c], fields[p]),
            SnpIdSource::Column(c) => fields[c].clone(),
            SnpIdSource::RowNumber => format!("snp_{}", snp_ids.len() + 1),
        };

        for (p, cols) in columns.iter().enumerate() {
            let reference = parse_depth(&fields[cols.reference], line_num, &header[cols.reference])?;
            let alt = match cols.second {
                SecondColumn::AltCount(a) => parse_depth(&fields[a], line_num, &header[a])?,
                SecondColumn::TotalDepth(t) => {
                    let total = parse_depth(&fields[t], line_num, &header[t])?;
                    total.checked_sub(reference).ok_or_else(|| {
                        AnalysisError::MalformedInput(format!(
                            "line {}: pool '{}' reference count {} exceeds total depth {}",
                            line_num, pool_ids[p], reference, total
                        ))
                    })?
                }
            };
            depths[p].push(DepthCount {
                ref_depth: reference,
                alt_depth: alt,
            });
        }
        snp_ids.push(snp_id);
    }

    if snp_ids.is_empty() {
        return Err(AnalysisError::MalformedInput("pooled depth file has no SNP rows".to_string()));
    }

    log(
        LogLevel::Info,
        &format!("Parsed {} SNPs across {} pools", snp_ids.len(), pool_ids.len()),
    );

    PooledDepthData::new(pool_ids, snp_ids, depths)
}
