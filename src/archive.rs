use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::auth::AccessToken;
use crate::error::EgaError;

pub const SUBMISSION_API_URL: &str = "https://submission.ega-archive.org/api";

/// One inbox file record as reported by the archive. Produced remotely,
/// read-only here.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    pub relative_path: String,
    pub encrypted_checksum: Option<String>,
    pub unencrypted_checksum: Option<String>,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    pub title: String,
    pub accession_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetRecord {
    pub title: String,
    pub policy_accession_id: String,
    pub provisional_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDataset {
    pub provisional_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDataset {
    pub title: String,
    pub description: String,
    pub dataset_types: Vec<String>,
    pub policy_accession_id: String,
    pub run_provisional_ids: Vec<i64>,
}

#[derive(Serialize)]
struct FinaliseRequest<'a> {
    expected_release_date: &'a str,
}

/// Everything this pipeline consumes from the submission REST API. Every call
/// is a single attempt; non-2xx responses surface immediately with the body.
pub trait ArchiveClient: Send + Sync {
    fn files(&self, prefix: Option<&str>) -> Result<Vec<FileMetadata>, EgaError>;
    fn policies(&self) -> Result<Vec<Policy>, EgaError>;
    fn datasets(&self, submission_accession_id: &str) -> Result<Vec<DatasetRecord>, EgaError>;
    fn create_dataset(
        &self,
        submission_accession_id: &str,
        dataset: &NewDataset,
    ) -> Result<Vec<CreatedDataset>, EgaError>;
    fn finalise(
        &self,
        submission_accession_id: &str,
        expected_release_date: &str,
    ) -> Result<(), EgaError>;
}

#[derive(Clone)]
pub struct ArchiveHttpClient {
    client: Client,
    base_url: String,
    token: AccessToken,
}

impl ArchiveHttpClient {
    pub fn new(token: AccessToken) -> Result<Self, EgaError> {
        Self::with_base_url(token, SUBMISSION_API_URL.to_string())
    }

    pub fn with_base_url(token: AccessToken, base_url: String) -> Result<Self, EgaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ega-submit/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
        context: &str,
    ) -> Result<reqwest::blocking::Response, EgaError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "archive request failed".to_string());
        tracing::error!(status, %message, "archive error while {context}");
        Err(EgaError::ArchiveStatus { status, message })
    }
}

impl ArchiveClient for ArchiveHttpClient {
    fn files(&self, prefix: Option<&str>) -> Result<Vec<FileMetadata>, EgaError> {
        let url = format!("{}/files", self.base_url);
        let mut request = self.client.get(&url).bearer_auth(self.token.as_str());
        if let Some(prefix) = prefix {
            request = request.query(&[("prefix", prefix)]);
        }
        let response = request
            .send()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?;
        let response = Self::handle_status(response, "querying file metadata")?;
        response
            .json()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))
    }

    fn policies(&self) -> Result<Vec<Policy>, EgaError> {
        let url = format!("{}/policies", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.as_str())
            .send()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?;
        let response = Self::handle_status(response, "getting policies")?;
        response
            .json()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))
    }

    fn datasets(&self, submission_accession_id: &str) -> Result<Vec<DatasetRecord>, EgaError> {
        let url = format!(
            "{}/submissions/{}/datasets",
            self.base_url, submission_accession_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.as_str())
            .send()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?;
        let response = Self::handle_status(response, "querying existing datasets")?;
        response
            .json()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))
    }

    fn create_dataset(
        &self,
        submission_accession_id: &str,
        dataset: &NewDataset,
    ) -> Result<Vec<CreatedDataset>, EgaError> {
        let url = format!(
            "{}/submissions/{}/datasets",
            self.base_url, submission_accession_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .json(dataset)
            .send()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?;
        let response = Self::handle_status(response, "registering dataset")?;
        response
            .json()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))
    }

    fn finalise(
        &self,
        submission_accession_id: &str,
        expected_release_date: &str,
    ) -> Result<(), EgaError> {
        let url = format!(
            "{}/submissions/{}/finalise",
            self.base_url, submission_accession_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .json(&FinaliseRequest {
                expected_release_date,
            })
            .send()
            .map_err(|err| EgaError::ArchiveHttp(err.to_string()))?;
        Self::handle_status(response, "finalising submission")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_metadata_tolerates_null_checksums() {
        let file: FileMetadata = serde_json::from_str(
            r#"{"relative_path":"/NA12878.cram","encrypted_checksum":null,"unencrypted_checksum":null,"filesize":0,"status":"inbox"}"#,
        )
        .unwrap();
        assert!(file.encrypted_checksum.is_none());
        assert!(file.unencrypted_checksum.is_none());
        assert_eq!(file.filesize, 0);
    }

    #[test]
    fn new_dataset_serializes_request_body() {
        let dataset = NewDataset {
            title: "batch 7".to_string(),
            description: "WGS batch".to_string(),
            dataset_types: vec!["Whole genome sequencing".to_string()],
            policy_accession_id: "EGAP00000000001".to_string(),
            run_provisional_ids: vec![11, 12],
        };
        let body = serde_json::to_value(&dataset).unwrap();
        assert_eq!(body["dataset_types"][0], "Whole genome sequencing");
        assert_eq!(body["run_provisional_ids"], serde_json::json!([11, 12]));
    }

    #[test]
    fn created_dataset_parses_listed_response() {
        let created: Vec<CreatedDataset> =
            serde_json::from_str(r#"[{"provisional_id":4711}]"#).unwrap();
        assert_eq!(created[0].provisional_id, 4711);
    }
}
