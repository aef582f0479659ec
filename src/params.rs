// params.rs

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::fst::{FstEstimator, FstOptions};
use crate::pca::{PcaOptions, Scaling};
use crate::qc::QcThresholds;

/// Loosely typed request settings, e.g. a dictionary coming from a UI layer.
///
/// Keys are matched case-insensitively with `-` treated as `_`.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    values: BTreeMap<String, String>,
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('-', "_")
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.values.insert(normalize_key(key), value.to_string().trim().to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    fn reject_unknown(&self, allowed: &[&str]) -> Result<()> {
        if let Some(unknown) = self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(AnalysisError::InvalidParameter(format!(
                "unknown parameter '{}' (accepted: {})",
                unknown,
                allowed.join(", ")
            )));
        }
        Ok(())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) if raw.is_empty() => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|_| {
                AnalysisError::InvalidParameter(format!("parameter '{}' has invalid value '{}'", key, raw))
            }),
        }
    }
}

impl<K: AsRef<str>, V: ToString> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.insert(k.as_ref(), v);
        }
        map
    }
}

/// Validated settings for one PCA request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcaParams {
    pub qc: QcThresholds,
    pub pca: PcaOptions,
}

impl PcaParams {
    pub const KEYS: [&'static str; 5] = [
        "min_maf",
        "max_missing_per_snp",
        "max_missing_per_sample",
        "components",
        "scaling",
    ];

    pub fn new(qc: QcThresholds, components: usize, scaling: Scaling) -> Result<Self> {
        if components == 0 {
            return Err(AnalysisError::InvalidParameter(
                "components must be a positive integer".to_string(),
            ));
        }
        Ok(PcaParams {
            qc,
            pca: PcaOptions { components, scaling },
        })
    }

    /// Converts a loosely typed map, filling defaults for absent keys.
    pub fn from_map(map: &ParamMap) -> Result<Self> {
        map.reject_unknown(&Self::KEYS)?;
        let defaults = QcThresholds::default();
        let qc = QcThresholds::new(
            map.parsed("min_maf", defaults.min_maf())?,
            map.parsed("max_missing_per_snp", defaults.max_missing_per_snp())?,
            map.parsed("max_missing_per_sample", defaults.max_missing_per_sample())?,
        )?;
        let components = match map.get("components") {
            // Negative counts get a range error rather than a parse error
            Some(raw) if raw.starts_with('-') => {
                return Err(AnalysisError::InvalidParameter(format!(
                    "components must be a positive integer, got {}",
                    raw
                )))
            }
            _ => map.parsed("components", PcaOptions::default().components)?,
        };
        let scaling = match map.get("scaling") {
            Some(raw) if !raw.is_empty() => raw.parse::<Scaling>()?,
            _ => Scaling::default(),
        };
        Self::new(qc, components, scaling)
    }
}

impl Default for PcaParams {
    fn default() -> Self {
        PcaParams {
            qc: QcThresholds::default(),
            pca: PcaOptions::default(),
        }
    }
}

/// Validated settings for one FST request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FstParams {
    pub fst: FstOptions,
}

impl FstParams {
    pub const KEYS: [&'static str; 2] = ["min_pool_depth", "estimator"];

    pub fn new(min_pool_depth: u32, estimator: FstEstimator) -> Self {
        FstParams {
            fst: FstOptions {
                min_pool_depth,
                estimator,
            },
        }
    }

    pub fn from_map(map: &ParamMap) -> Result<Self> {
        map.reject_unknown(&Self::KEYS)?;
        let min_pool_depth = match map.get("min_pool_depth") {
            Some(raw) if raw.starts_with('-') => {
                return Err(AnalysisError::InvalidParameter(format!(
                    "min_pool_depth must be a non-negative integer, got {}",
                    raw
                )))
            }
            _ => map.parsed("min_pool_depth", FstOptions::default().min_pool_depth)?,
        };
        let estimator = match map.get("estimator") {
            Some(raw) if !raw.is_empty() => raw.parse::<FstEstimator>()?,
            _ => FstEstimator::default(),
        };
        Ok(Self::new(min_pool_depth, estimator))
    }
}
