use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::EgaError;

const SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";
const DEFAULT_PROJECT_ID: &str = "sc-ega-submissions";
const DEFAULT_VERSION_ID: u32 = 1;

/// Resolves the per-inbox submission password. Injected so tests and offline
/// tooling can substitute a fake without live cloud credentials.
pub trait SecretProvider: Send + Sync {
    fn inbox_password(&self, ega_inbox: &str) -> Result<String, EgaError>;
}

#[derive(Clone)]
pub struct GcpSecretProvider {
    client: Client,
    base_url: String,
    project_id: String,
    version_id: u32,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretPayload {
    data: String,
    data_crc32c: String,
}

impl GcpSecretProvider {
    pub fn new() -> Result<Self, EgaError> {
        Self::with_base_url(SECRET_MANAGER_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, EgaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EgaError::SecretAccess {
                name: "secretmanager".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url,
            project_id: DEFAULT_PROJECT_ID.to_string(),
            version_id: DEFAULT_VERSION_ID,
        })
    }

    fn secret_version_name(&self, ega_inbox: &str) -> String {
        format!(
            "projects/{}/secrets/{}_password/versions/{}",
            self.project_id, ega_inbox, self.version_id
        )
    }

    /// Ambient Google credentials: an explicit token env var wins, otherwise
    /// the active gcloud account supplies one.
    fn google_access_token(&self) -> Result<String, EgaError> {
        if let Ok(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }

        let gcloud = find_in_path("gcloud")
            .ok_or_else(|| EgaError::MissingTool("gcloud".to_string()))?;
        let output = Command::new(&gcloud)
            .args(["auth", "print-access-token"])
            .output()
            .map_err(|err| EgaError::SecretAccess {
                name: "gcloud".to_string(),
                message: err.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EgaError::SecretAccess {
                name: "gcloud".to_string(),
                message: stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl SecretProvider for GcpSecretProvider {
    fn inbox_password(&self, ega_inbox: &str) -> Result<String, EgaError> {
        let name = self.secret_version_name(ega_inbox);
        let token = self.google_access_token()?;
        let url = format!("{}/v1/{}:access", self.base_url, name);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .map_err(|err| EgaError::SecretAccess {
                name: name.clone(),
                message: err.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "secret access failed".to_string());
            tracing::error!(status, %message, "failed to access secret");
            return Err(EgaError::SecretAccess {
                name,
                message: format!("status {status}: {message}"),
            });
        }

        let body: AccessSecretVersionResponse =
            response.json().map_err(|err| EgaError::SecretAccess {
                name: name.clone(),
                message: err.to_string(),
            })?;

        let data = STANDARD
            .decode(&body.payload.data)
            .map_err(|err| EgaError::SecretAccess {
                name: name.clone(),
                message: err.to_string(),
            })?;
        verify_payload_crc32c(&data, &body.payload.data_crc32c, &name)?;
        tracing::info!("successfully accessed secret");

        String::from_utf8(data).map_err(|err| EgaError::SecretAccess {
            name,
            message: err.to_string(),
        })
    }
}

/// Secret Manager reports the payload checksum as a decimal int64 string.
fn verify_payload_crc32c(data: &[u8], reported: &str, name: &str) -> Result<(), EgaError> {
    let expected = reported
        .parse::<u64>()
        .map_err(|err| EgaError::SecretAccess {
            name: name.to_string(),
            message: format!("unparseable checksum {reported}: {err}"),
        })?;
    let computed = u64::from(crc32c::crc32c(data));
    if computed != expected {
        tracing::error!("data corruption detected for secret {name}");
        return Err(EgaError::SecretCorrupted(name.to_string()));
    }
    Ok(())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let candidate = path.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn secret_version_name_layout() {
        let provider = GcpSecretProvider::with_base_url("http://localhost".to_string()).unwrap();
        assert_eq!(
            provider.secret_version_name("inbox42"),
            "projects/sc-ega-submissions/secrets/inbox42_password/versions/1"
        );
    }

    #[test]
    fn crc32c_accepts_matching_checksum() {
        // 0xE3069283 is the CRC32C check value for "123456789".
        verify_payload_crc32c(b"123456789", "3808858755", "test").unwrap();
    }

    #[test]
    fn crc32c_rejects_corrupted_payload() {
        let err = verify_payload_crc32c(b"123456780", "3808858755", "test").unwrap_err();
        assert_matches!(err, EgaError::SecretCorrupted(_));
    }

    #[test]
    fn crc32c_rejects_unparseable_checksum() {
        let err = verify_payload_crc32c(b"data", "not-a-number", "test").unwrap_err();
        assert_matches!(err, EgaError::SecretAccess { .. });
    }

    #[test]
    fn payload_decodes_from_response_body() {
        let body: AccessSecretVersionResponse = serde_json::from_str(
            r#"{"name":"projects/p/secrets/s/versions/1","payload":{"data":"aHVudGVyMg==","dataCrc32c":"1232306601"}}"#,
        )
        .unwrap();
        let data = STANDARD.decode(&body.payload.data).unwrap();
        assert_eq!(data, b"hunter2");
    }
}
