use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8Path;

use ega_submit::archive::{
    ArchiveClient, CreatedDataset, DatasetRecord, FileMetadata, NewDataset, Policy,
};
use ega_submit::error::EgaError;
use ega_submit::transfer::{InboxTransport, transfer_to_inbox};

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

#[derive(Default)]
struct MockTransport {
    uploads: Mutex<Vec<String>>,
}

impl InboxTransport for MockTransport {
    fn upload(&self, _local: &Utf8Path, remote_name: &str) -> Result<(), EgaError> {
        self.uploads.lock().unwrap().push(remote_name.to_string());
        Ok(())
    }
}

fn inbox_record(path: &str) -> FileMetadata {
    FileMetadata {
        relative_path: path.to_string(),
        encrypted_checksum: None,
        unencrypted_checksum: None,
        filesize: 0,
        status: "inbox".to_string(),
    }
}

#[test]
fn uploads_fresh_file_under_its_basename() {
    let archive = MockArchive {
        files: vec![inbox_record("/encrypted/other.cram")],
    };
    let transport = MockTransport::default();

    let basename = transfer_to_inbox(
        &archive,
        &transport,
        Utf8Path::new("/staging/NA12878.cram"),
    )
    .unwrap();

    assert_eq!(basename, "NA12878.cram");
    assert_eq!(*transport.uploads.lock().unwrap(), vec!["NA12878.cram"]);
}

#[test]
fn empty_inbox_is_not_a_conflict() {
    let archive = MockArchive { files: vec![] };
    let transport = MockTransport::default();

    transfer_to_inbox(&archive, &transport, Utf8Path::new("NA12878.cram")).unwrap();

    assert_eq!(transport.uploads.lock().unwrap().len(), 1);
}

#[test]
fn duplicate_basename_aborts_before_upload() {
    let archive = MockArchive {
        files: vec![inbox_record("/encrypted/NA12878.cram")],
    };
    let transport = MockTransport::default();

    let err = transfer_to_inbox(
        &archive,
        &transport,
        Utf8Path::new("/staging/NA12878.cram"),
    )
    .unwrap_err();

    assert_matches!(err, EgaError::DuplicateInboxFile(_));
    assert!(transport.uploads.lock().unwrap().is_empty());
}
