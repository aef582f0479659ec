// table.rs

use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::{ErrorKind, Read};

use crate::error::{AnalysisError, Result};
use crate::vcf::maybe_decompress;

/// Field separator of a delimited text table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    /// Runs of spaces or tabs, as in plink and smartpca output.
    Whitespace,
}

impl Delimiter {
    /// Tabs take precedence over commas; a line with neither is whitespace separated.
    pub fn detect(line: &str) -> Self {
        if line.contains('\t') {
            Delimiter::Tab
        } else if line.contains(',') {
            Delimiter::Comma
        } else {
            Delimiter::Whitespace
        }
    }

    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab | Delimiter::Whitespace => b'\t',
        }
    }
}

/// How `read_table` treats the input.
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    /// Lines starting with this byte are skipped.
    pub comment: Option<u8>,
    /// Allow records with differing field counts.
    pub flexible: bool,
}

/// One parsed row and the 1-based input line it came from.
#[derive(Debug, Clone)]
pub struct TableRecord {
    pub line: u64,
    pub fields: StringRecord,
}

impl TableRecord {
    pub fn to_vec(&self) -> Vec<String> {
        self.fields.iter().map(String::from).collect()
    }
}

fn is_comment(line: &str, comment: Option<u8>) -> bool {
    comment.map_or(false, |c| line.as_bytes().first() == Some(&c))
}

/// Blank lines are emptied so the reader skips them; whitespace-separated
/// lines are rewritten tab-separated. Line numbering is preserved.
fn normalize(text: &str, delimiter: Delimiter, comment: Option<u8>) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // keep the line so positions stay aligned
        } else if is_comment(trimmed, comment) {
            out.push_str(trimmed);
        } else if delimiter == Delimiter::Whitespace {
            out.push_str(&trimmed.split_whitespace().collect::<Vec<_>>().join("\t"));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Reads a delimited table (optionally gzip-compressed) into records.
///
/// The delimiter is detected from the first non-blank, non-comment line.
/// Quoted fields are unquoted and surrounding whitespace is trimmed.
/// An input with no records yields an empty vector.
pub fn read_table<R: Read>(reader: R, options: TableOptions) -> Result<Vec<TableRecord>> {
    let mut reader = maybe_decompress(reader)?;
    let mut text = String::new();
    reader.read_to_string(&mut text).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => AnalysisError::MalformedInput(format!("table is not valid UTF-8 text: {}", e)),
        _ => AnalysisError::Io(e),
    })?;

    let delimiter = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !is_comment(l, options.comment))
        .map_or(Delimiter::Whitespace, Delimiter::detect);
    let normalized = normalize(&text, delimiter, options.comment);

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter.byte())
        .flexible(options.flexible)
        .trim(Trim::All)
        .comment(options.comment)
        .from_reader(normalized.as_bytes());

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let fields = result?;
        let line = fields.position().map_or(0, |p| p.line());
        records.push(TableRecord { line, fields });
    }
    Ok(records)
}
