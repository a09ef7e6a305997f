use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::error::EgaError;

pub const LOGIN_URL: &str = "https://idp.ega-archive.org/realms/EGA/protocol/openid-connect/token";

const CLIENT_ID: &str = "sp-api";

/// Short-lived bearer token for the submission API. Deliberately opaque so it
/// never ends up in log output.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait IdentityClient: Send + Sync {
    fn login(&self, username: &str, password: &str) -> Result<AccessToken, EgaError>;
}

#[derive(Clone)]
pub struct IdentityHttpClient {
    client: Client,
    token_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl IdentityHttpClient {
    pub fn new() -> Result<Self, EgaError> {
        Self::with_token_url(LOGIN_URL.to_string())
    }

    pub fn with_token_url(token_url: String) -> Result<Self, EgaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ega-submit/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EgaError::IdentityHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EgaError::IdentityHttp(err.to_string()))?;
        Ok(Self { client, token_url })
    }
}

impl IdentityClient for IdentityHttpClient {
    fn login(&self, username: &str, password: &str) -> Result<AccessToken, EgaError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", CLIENT_ID),
                ("username", username),
                ("password", password),
            ])
            .send()
            .map_err(|err| EgaError::IdentityHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "identity request failed".to_string());
            tracing::error!(status, %message, "failed to get access token");
            return Err(EgaError::AuthenticationFailed { status, message });
        }

        let body: TokenResponse = response
            .json()
            .map_err(|err| EgaError::IdentityHttp(err.to_string()))?;
        tracing::info!("successfully created access token");
        Ok(AccessToken(body.access_token))
    }
}
