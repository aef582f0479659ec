// vcf.rs

use flate2::read::MultiGzDecoder;
use ndarray::Array2;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::matrix::{GenotypeMatrix, SnpInfo};
use crate::progress::{log, LogLevel};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The fixed columns every VCF header line starts with.
const REQUIRED_FIELDS: [&str; 9] = ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT"];

/// Number of leading variants kept for the upload preview.
const PREVIEW_VARIANTS: usize = 5;

/// Wraps a byte stream in a gzip decoder when it starts with the gzip magic bytes.
/// BGZF files are gzip members, so `MultiGzDecoder` reads them too.
pub fn maybe_decompress<'a, R: Read + 'a>(reader: R) -> Result<Box<dyn BufRead + 'a>> {
    let mut buffered = BufReader::new(reader);
    let is_gzip = {
        let head = buffered.fill_buf()?;
        head.len() >= 2 && head[..2] == GZIP_MAGIC
    };
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(buffered))))
    } else {
        Ok(Box::new(buffered))
    }
}

pub fn open_vcf(path: &Path) -> Result<GenotypeMatrix> {
    let file = File::open(path)?;
    log(LogLevel::Info, &format!("Reading VCF file {}", path.display()));
    read_vcf(file)
}

/// Checks the `#CHROM` line and returns the sample identifiers it names.
pub fn parse_header_line(line: &str) -> Result<Vec<String>> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();

    if fields.len() < REQUIRED_FIELDS.len() || fields[..REQUIRED_FIELDS.len()] != REQUIRED_FIELDS[..] {
        // A header without FORMAT carries no genotype columns at all
        if fields.len() == REQUIRED_FIELDS.len() - 1 && fields[..] == REQUIRED_FIELDS[..REQUIRED_FIELDS.len() - 1] {
            return Err(AnalysisError::MalformedInput("VCF header has no FORMAT or sample columns".to_string()));
        }
        return Err(AnalysisError::MalformedInput(format!(
            "invalid VCF header line: expected tab-separated {}",
            REQUIRED_FIELDS.join(" ")
        )));
    }

    let samples: Vec<String> = fields[REQUIRED_FIELDS.len()..].iter().map(|s| s.trim().to_string()).collect();
    if samples.is_empty() {
        return Err(AnalysisError::MalformedInput("no samples found in VCF header".to_string()));
    }
    if let Some(empty) = samples.iter().position(|s| s.is_empty()) {
        return Err(AnalysisError::MalformedInput(format!(
            "sample column {} has an empty name",
            empty + REQUIRED_FIELDS.len() + 1
        )));
    }

    let mut seen = HashSet::with_capacity(samples.len());
    for s in &samples {
        if !seen.insert(s.as_str()) {
            return Err(AnalysisError::MalformedInput(format!("duplicate sample identifier '{}'", s)));
        }
    }
    Ok(samples)
}

/// Decodes a GT value into an alternate-allele count.
///
/// Returns `(dosage, uses_higher_allele)`. Only diploid calls made of alleles 0
/// and 1 are encoded; anything else is missing. The flag is set when an allele
/// index of 2 or more appears, which marks the site as non-biallelic.
pub fn encode_genotype(gt: &str) -> (Option<u8>, bool) {
    let alleles: Vec<&str> = gt.split(|c| c == '/' || c == '|').collect();
    if alleles.len() != 2 {
        return (None, false);
    }

    let mut dosage = 0u8;
    let mut higher = false;
    let mut readable = true;
    for allele in alleles {
        match allele.parse::<u8>() {
            Ok(0) => {}
            Ok(1) => dosage += 1,
            Ok(_) => {
                higher = true;
                readable = false;
            }
            Err(_) => readable = false,
        }
    }

    if readable {
        (Some(dosage), false)
    } else {
        (None, higher)
    }
}

/// A parsed VCF data line before it is placed in the matrix.
struct ParsedRecord {
    snp: SnpInfo,
    calls: Vec<Option<u8>>,
}

fn parse_record(line: &str, line_num: usize, n_samples: usize) -> Result<ParsedRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    let expected = REQUIRED_FIELDS.len() + n_samples;
    if fields.len() != expected {
        return Err(AnalysisError::MalformedInput(format!(
            "line {} has {} columns but the header has {}",
            line_num,
            fields.len(),
            expected
        )));
    }

    let chrom = fields[0].trim().to_string();
    if chrom.is_empty() {
        return Err(AnalysisError::MalformedInput(format!("line {} has an empty CHROM", line_num)));
    }
    let pos: i64 = fields[1]
        .trim()
        .parse()
        .map_err(|_| AnalysisError::MalformedInput(format!("line {} has invalid POS '{}'", line_num, fields[1])))?;

    let gt_index = fields[8]
        .split(':')
        .position(|key| key == "GT")
        .ok_or_else(|| AnalysisError::MalformedInput(format!("line {} has no GT field in FORMAT", line_num)))?;

    let alternate = fields[4].trim().to_string();
    let mut biallelic = !alternate.contains(',');

    let mut calls = Vec::with_capacity(n_samples);
    for sample_field in &fields[REQUIRED_FIELDS.len()..] {
        let gt = sample_field.split(':').nth(gt_index).unwrap_or(".");
        let (dosage, higher) = encode_genotype(gt.trim());
        if higher {
            biallelic = false;
        }
        calls.push(dosage);
    }

    Ok(ParsedRecord {
        snp: SnpInfo {
            chrom,
            pos,
            id: fields[2].trim().to_string(),
            reference: fields[3].trim().to_string(),
            alternate,
            biallelic,
        },
        calls,
    })
}

/// Parses a plain or gzip-compressed VCF into a genotype matrix.
///
/// Fails with `MalformedInput` when the header is absent, a data line has a
/// different column count than the header, or no samples or SNPs are found.
pub fn read_vcf<R: Read>(reader: R) -> Result<GenotypeMatrix> {
    let reader = maybe_decompress(reader)?;

    let mut sample_ids: Option<Vec<String>> = None;
    let mut snps = Vec::new();
    let mut flat_calls: Vec<Option<u8>> = Vec::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line_num = idx + 1;
        let line = line_result.map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => {
                AnalysisError::MalformedInput(format!("line {} is not valid UTF-8 text", line_num))
            }
            _ => AnalysisError::Io(e),
        })?;
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() || line.starts_with("##") {
            continue;
        }

        if line.starts_with("#CHROM") {
            if sample_ids.is_some() {
                return Err(AnalysisError::MalformedInput(format!("second #CHROM header at line {}", line_num)));
            }
            sample_ids = Some(parse_header_line(line)?);
            continue;
        }

        let samples = sample_ids.as_ref().ok_or_else(|| {
            AnalysisError::MalformedInput(format!(
                "line {} appears before the #CHROM header; input is not a VCF file",
                line_num
            ))
        })?;

        let record = parse_record(line, line_num, samples.len())?;
        snps.push(record.snp);
        flat_calls.extend(record.calls);
    }

    let sample_ids = sample_ids
        .ok_or_else(|| AnalysisError::MalformedInput("no #CHROM header line found; input is not a VCF file".to_string()))?;

    if snps.is_empty() {
        return Err(AnalysisError::MalformedInput("no variants found in VCF file".to_string()));
    }

    // Calls were collected SNP-major; the matrix is samples x SNPs
    let n_snps = snps.len();
    let n_samples = sample_ids.len();
    let calls = Array2::from_shape_vec((n_snps, n_samples), flat_calls)
        .map_err(|e| AnalysisError::MalformedInput(format!("inconsistent genotype table: {}", e)))?
        .reversed_axes()
        .as_standard_layout()
        .into_owned();

    log(
        LogLevel::Info,
        &format!("Parsed {} variants across {} samples", n_snps, n_samples),
    );

    GenotypeMatrix::new(sample_ids, snps, calls)
}

/// One variant shown in an upload preview.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPreview {
    pub chrom: String,
    pub pos: i64,
    pub reference: String,
    pub alternate: String,
}

/// Quick description of a parsed VCF.
#[derive(Debug, Clone)]
pub struct VcfSummary {
    pub samples: Vec<String>,
    pub total_variants: usize,
    pub biallelic_variants: usize,
    pub missing_calls: usize,
    pub preview: Vec<VariantPreview>,
}

pub fn summarize_vcf(matrix: &GenotypeMatrix) -> VcfSummary {
    let preview = matrix
        .snps()
        .iter()
        .take(PREVIEW_VARIANTS)
        .map(|snp| VariantPreview {
            chrom: snp.chrom.clone(),
            pos: snp.pos,
            reference: snp.reference.clone(),
            alternate: snp.alternate.clone(),
        })
        .collect();

    VcfSummary {
        samples: matrix.sample_ids().to_vec(),
        total_variants: matrix.n_snps(),
        biallelic_variants: matrix.snps().iter().filter(|s| s.biallelic).count(),
        missing_calls: matrix.calls().iter().filter(|c| c.is_none()).count(),
        preview,
    }
}
