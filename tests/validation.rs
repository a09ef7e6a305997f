use assert_matches::assert_matches;

use ega_submit::archive::{
    ArchiveClient, CreatedDataset, DatasetRecord, FileMetadata, NewDataset, Policy,
};
use ega_submit::domain::{SampleAlias, ValidationStatus};
use ega_submit::error::EgaError;
use ega_submit::validation::ValidationAggregator;

struct MockArchive {
    files: Vec<FileMetadata>,
}

impl ArchiveClient for MockArchive {
    fn files(&self, _prefix: Option<&str>) -> Result<Vec<FileMetadata>, EgaError> {
        Ok(self.files.clone())
    }

    fn policies(&self) -> Result<Vec<Policy>, EgaError> {
        Err(EgaError::ArchiveHttp("not used".to_string()))
    }

    fn datasets(&self, _submission_accession_id: &str) -> Result<Vec<DatasetRecord>, EgaError> {
        Err(EgaError::ArchiveHttp("not used".to_string()))
    }

    fn create_dataset(
        &self,
        _submission_accession_id: &str,
        _dataset: &NewDataset,
    ) -> Result<Vec<CreatedDataset>, EgaError> {
        Err(EgaError::ArchiveHttp("not used".to_string()))
    }

    fn finalise(
        &self,
        _submission_accession_id: &str,
        _expected_release_date: &str,
    ) -> Result<(), EgaError> {
        Err(EgaError::ArchiveHttp("not used".to_string()))
    }
}

fn file(path: &str, encrypted: Option<&str>, unencrypted: Option<&str>, size: u64) -> FileMetadata {
    FileMetadata {
        relative_path: path.to_string(),
        encrypted_checksum: encrypted.map(str::to_string),
        unencrypted_checksum: unencrypted.map(str::to_string),
        filesize: size,
        status: "inbox".to_string(),
    }
}

fn alias(value: &str) -> SampleAlias {
    value.parse().unwrap()
}

#[test]
fn all_files_complete_is_validated() {
    let archive = MockArchive {
        files: vec![file("/NA12878.cram", Some("aa"), Some("bb"), 2048)],
    };
    let status = ValidationAggregator::new(&archive)
        .status_for_sample(&alias("NA12878"))
        .unwrap();
    assert_eq!(status, ValidationStatus::Validated);
}

#[test]
fn one_incomplete_file_is_incomplete() {
    let archive = MockArchive {
        files: vec![
            file("/NA12878.cram", Some("aa"), Some("bb"), 2048),
            file("/NA12878.crai", Some("aa"), None, 2048),
        ],
    };
    let status = ValidationAggregator::new(&archive)
        .status_for_sample(&alias("NA12878"))
        .unwrap();
    assert_eq!(status, ValidationStatus::Incomplete);
}

#[test]
fn all_incomplete_files_is_incomplete() {
    // Every matched file is a vote; a match set with no passing files must
    // never read as validated.
    let archive = MockArchive {
        files: vec![
            file("/NA12878.cram", None, None, 0),
            file("/NA12878.crai", None, None, 0),
        ],
    };
    let status = ValidationAggregator::new(&archive)
        .status_for_sample(&alias("NA12878"))
        .unwrap();
    assert_eq!(status, ValidationStatus::Incomplete);
}

#[test]
fn empty_inbox_listing_is_not_found() {
    let archive = MockArchive { files: vec![] };
    let err = ValidationAggregator::new(&archive)
        .status_for_sample(&alias("NA12878"))
        .unwrap_err();
    assert_matches!(err, EgaError::NoFilesInInbox);
}

#[test]
fn no_stem_match_is_not_found_for_sample() {
    let archive = MockArchive {
        files: vec![file("/NA24385.cram", Some("aa"), Some("bb"), 2048)],
    };
    let err = ValidationAggregator::new(&archive)
        .status_for_sample(&alias("NA12878"))
        .unwrap_err();
    assert_matches!(err, EgaError::NoFilesForSample(_));
}

#[test]
fn alias_with_special_characters_matches_normalized_paths() {
    let archive = MockArchive {
        files: vec![file("/sample__1__A.cram", Some("aa"), Some("bb"), 2048)],
    };
    let status = ValidationAggregator::new(&archive)
        .status_for_sample(&alias("sample (1)/A"))
        .unwrap();
    assert_eq!(status, ValidationStatus::Validated);
}
