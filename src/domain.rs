use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EgaError;

/// EGA controlled vocabulary for experiment library strategies.
pub const LIBRARY_STRATEGIES: &[&str] = &[
    "WGS",
    "WGA",
    "WXS",
    "RNA-Seq",
    "ssRNA-seq",
    "miRNA-Seq",
    "ncRNA-Seq",
    "FL-cDNA",
    "EST",
    "Hi-C",
    "ATAC-seq",
    "WCS",
    "RAD-Seq",
    "CLONE",
    "POOLCLONE",
    "AMPLICON",
    "CLONEEND",
    "FINISHING",
    "ChIP-Seq",
    "MNase-Seq",
    "DNase-Hypersensitivity",
    "Bisulfite-Seq",
    "CTS",
    "MRE-Seq",
    "MeDIP-Seq",
    "MBD-Seq",
    "Tn-Seq",
    "VALIDATION",
    "FAIRE-seq",
    "SELEX",
    "RIP-Seq",
    "ChIA-PET",
    "Synthetic-Long-Read",
    "Targeted-Capture",
    "Tethered Chromatin Conformation Capture",
    "NOMe-Seq",
    "ChM-Seq",
    "GBS",
    "OTHER",
    "snRNA-seq",
    "Ribo-Seq",
];

/// Submitter-chosen sample identifier. Inbox file names are derived from the
/// normalized form, so path matching always goes through [`SampleAlias::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleAlias(String);

impl SampleAlias {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replaces every special character the inbox rejects with `_`.
    pub fn normalized(&self) -> String {
        let special = Regex::new(r##"[!"#$%&'()*/:;<=>?@\[\]^`{|}~ ]"##).unwrap();
        special.replace_all(&self.0, "_").into_owned()
    }
}

impl fmt::Display for SampleAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleAlias {
    type Err = EgaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EgaError::InvalidSampleAlias(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryStrategy(String);

impl LibraryStrategy {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps the strategy to the archive's dataset type. Only whole-genome and
    /// exome submissions are supported by this pipeline.
    pub fn dataset_type(&self) -> Result<DatasetType, EgaError> {
        match self.0.as_str() {
            "WGS" => Ok(DatasetType::WholeGenomeSequencing),
            "WXS" => Ok(DatasetType::ExomeSequencing),
            other => Err(EgaError::UnsupportedLibraryStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for LibraryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LibraryStrategy {
    type Err = EgaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !LIBRARY_STRATEGIES.contains(&trimmed) {
            return Err(EgaError::UnknownLibraryStrategy(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Collapses the per-sample strategy list down to the single strategy the
/// dataset type is derived from. A batch mixing strategies cannot be
/// registered as one dataset.
pub fn unique_strategy(strategies: &[LibraryStrategy]) -> Result<&LibraryStrategy, EgaError> {
    let distinct = strategies
        .iter()
        .map(LibraryStrategy::as_str)
        .collect::<BTreeSet<_>>();
    if distinct.len() != 1 {
        return Err(EgaError::AmbiguousLibraryStrategy(distinct.len()));
    }
    strategies
        .first()
        .ok_or(EgaError::AmbiguousLibraryStrategy(0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetType {
    WholeGenomeSequencing,
    ExomeSequencing,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::WholeGenomeSequencing => "Whole genome sequencing",
            DatasetType::ExomeSequencing => "Exome sequencing",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall archive-side validation verdict for a sample's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Validated,
    Incomplete,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Validated => "validated",
            ValidationStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
