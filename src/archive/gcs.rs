//! Google Cloud Storage archive store
//!
//! Every `store` call opens a fresh [`StorageSession`]: the base64 service
//! account key is decoded, an RS256 JWT-bearer assertion is exchanged for an
//! access token at the key's `token_uri`, and the object is uploaded with a
//! single `uploadType=media` request. The session is dropped when the call
//! returns.

use super::{ArchiveReceipt, ArchiveStore};
use crate::error::ArchiveError;
use crate::types::ArchiveKey;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The parts of a service-account key file used for authentication
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account identity
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// OAuth token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    /// Decode a key from its base64-encoded JSON form
    pub fn from_base64(encoded: &str) -> Result<Self, ArchiveError> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ArchiveError::Credentials(format!("not valid base64: {}", e)))?;
        serde_json::from_slice(&decoded)
            .map_err(|e| ArchiveError::Credentials(format!("not a service-account key: {}", e)))
    }

    /// Signed token-exchange assertion valid from `now`
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, ArchiveError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: TOKEN_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| ArchiveError::Credentials(format!("invalid private key: {}", e)))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| ArchiveError::Credentials(format!("failed to sign assertion: {}", e)))
    }
}

/// Authenticated client scoped to one upload
struct StorageSession {
    client: reqwest::Client,
    access_token: String,
}

impl StorageSession {
    async fn open(credentials: &str) -> Result<Self, ArchiveError> {
        let key = ServiceAccountKey::from_base64(credentials)?;
        let assertion = key.assertion(Utc::now())?;
        let client = reqwest::Client::new();

        let response = client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ArchiveError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ArchiveError::Auth(format!("unreadable token response: {}", e)))?;

        tracing::debug!(client_email = %key.client_email, "storage session opened");

        Ok(Self {
            client,
            access_token: token.access_token,
        })
    }
}

/// Archive store writing to a Cloud Storage bucket
#[derive(Clone)]
pub struct GcsArchiveStore {
    credentials: String,
    bucket: String,
    api_base: String,
}

impl fmt::Debug for GcsArchiveStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsArchiveStore")
            .field("bucket", &self.bucket)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GcsArchiveStore {
    /// Create a store for `bucket` using base64-encoded service-account credentials
    pub fn new(credentials: String, bucket: String, api_base: String) -> Self {
        Self {
            credentials,
            bucket,
            api_base,
        }
    }

    fn upload_url(&self, key: &ArchiveKey) -> Result<Url, ArchiveError> {
        let invalid_base = |reason: String| ArchiveError::Upload {
            key: key.to_string(),
            status: 0,
            reason,
        };

        let mut url = Url::parse(&self.api_base)
            .map_err(|e| invalid_base(format!("invalid storage API base {:?}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid_base(format!("storage API base {:?} cannot carry a path", self.api_base)))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key.as_str());
        Ok(url)
    }
}

#[async_trait]
impl ArchiveStore for GcsArchiveStore {
    async fn store(&self, key: &ArchiveKey, content: Bytes) -> Result<ArchiveReceipt, ArchiveError> {
        let url = self.upload_url(key)?;
        let session = StorageSession::open(&self.credentials).await?;
        let bytes = content.len() as u64;

        let response = session
            .client
            .post(url)
            .bearer_auth(&session.access_token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|e| ArchiveError::Upload {
                key: key.to_string(),
                status: 0,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Upload {
                key: key.to_string(),
                status: status.as_u16(),
                reason,
            });
        }

        Ok(ArchiveReceipt {
            location: format!("gs://{}/{}", self.bucket, key),
            bytes,
        })
    }

    fn name(&self) -> &'static str {
        "gcs"
    }
}
