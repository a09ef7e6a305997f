use std::path::Path;

use crate::archive::{ArchiveClient, FileMetadata};
use crate::domain::{SampleAlias, ValidationStatus};
use crate::error::EgaError;

/// Per-file verdict. A file counts as valid once the archive has produced
/// both checksums and a non-zero size for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCheck {
    Valid,
    Incomplete,
}

pub fn check_file(file: &FileMetadata) -> FileCheck {
    let has_checksums = file
        .encrypted_checksum
        .as_deref()
        .is_some_and(|sum| !sum.is_empty())
        && file
            .unencrypted_checksum
            .as_deref()
            .is_some_and(|sum| !sum.is_empty());
    if has_checksums && file.filesize > 0 {
        FileCheck::Valid
    } else {
        FileCheck::Incomplete
    }
}

pub struct ValidationAggregator<'a, A: ArchiveClient> {
    archive: &'a A,
}

impl<'a, A: ArchiveClient> ValidationAggregator<'a, A> {
    pub fn new(archive: &'a A) -> Self {
        Self { archive }
    }

    /// Fetches inbox metadata under the sample's `.cram` prefix and folds the
    /// per-file checks into one verdict. Every matched file must pass; an
    /// incomplete file is a failing vote, so an all-incomplete match set can
    /// never read as validated.
    pub fn status_for_sample(
        &self,
        sample_alias: &SampleAlias,
    ) -> Result<ValidationStatus, EgaError> {
        let normalized = sample_alias.normalized();
        tracing::info!("collecting file metadata for sample alias {sample_alias}");
        let records = self
            .archive
            .files(Some(&format!("/{normalized}.cram")))?;
        if records.is_empty() {
            return Err(EgaError::NoFilesInInbox);
        }

        let matched = files_for_alias(&records, &normalized);
        if matched.is_empty() {
            return Err(EgaError::NoFilesForSample(sample_alias.as_str().to_string()));
        }

        tracing::info!("determining file validation status now");
        let all_valid = matched
            .iter()
            .all(|file| check_file(file) == FileCheck::Valid);
        if all_valid {
            tracing::info!("file(s) associated with {sample_alias} are valid");
            Ok(ValidationStatus::Validated)
        } else {
            tracing::info!("file(s) associated with {sample_alias} have not yet been validated");
            Ok(ValidationStatus::Incomplete)
        }
    }
}

/// Narrows a prefix listing down to the files literally named after the
/// normalized alias (stem match on the last path component).
fn files_for_alias<'r>(records: &'r [FileMetadata], normalized: &str) -> Vec<&'r FileMetadata> {
    records
        .iter()
        .filter(|file| {
            Path::new(&file.relative_path)
                .file_name()
                .map(Path::new)
                .and_then(Path::file_stem)
                .and_then(|stem| stem.to_str())
                .map(|stem| stem == normalized)
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, encrypted: Option<&str>, unencrypted: Option<&str>, size: u64) -> FileMetadata {
        FileMetadata {
            relative_path: path.to_string(),
            encrypted_checksum: encrypted.map(str::to_string),
            unencrypted_checksum: unencrypted.map(str::to_string),
            filesize: size,
            status: "inbox".to_string(),
        }
    }

    #[test]
    fn file_with_checksums_and_size_is_valid() {
        let record = file("/NA12878.cram", Some("aa"), Some("bb"), 1024);
        assert_eq!(check_file(&record), FileCheck::Valid);
    }

    #[test]
    fn file_missing_a_checksum_is_incomplete() {
        let record = file("/NA12878.cram", Some("aa"), None, 1024);
        assert_eq!(check_file(&record), FileCheck::Incomplete);
    }

    #[test]
    fn file_with_empty_checksum_is_incomplete() {
        let record = file("/NA12878.cram", Some(""), Some("bb"), 1024);
        assert_eq!(check_file(&record), FileCheck::Incomplete);
    }

    #[test]
    fn zero_length_file_is_incomplete() {
        let record = file("/NA12878.cram", Some("aa"), Some("bb"), 0);
        assert_eq!(check_file(&record), FileCheck::Incomplete);
    }

    #[test]
    fn stem_match_keeps_exact_alias_only() {
        let records = vec![
            file("/NA12878.cram", Some("aa"), Some("bb"), 10),
            file("/NA12878_old.cram", Some("aa"), Some("bb"), 10),
            file("/nested/NA12878.cram.cip", Some("aa"), Some("bb"), 10),
        ];
        let matched = files_for_alias(&records, "NA12878");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].relative_path, "/NA12878.cram");
    }

    #[test]
    fn stem_match_ignores_directory_components() {
        let records = vec![file("/inbox/batch1/NA12878.cram", Some("aa"), Some("bb"), 10)];
        assert_eq!(files_for_alias(&records, "NA12878").len(), 1);
    }
}
