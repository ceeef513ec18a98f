use super::transport::{PayloadBody, TransportResponse, UploadTransport};
use crate::auth::{Credentials, authorize, format_amz_date, hash_payload, payload_size};
use crate::types::{Method, RequestDescriptor, Result, UploadError};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::io::{Read, Seek};
use std::sync::Arc;

pub const DEFAULT_ACL: &str = "public-read";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Unreserved characters and `/` stay literal in object keys
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Per-upload settings, passed explicitly into every call
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub acl: String,
    pub content_type: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            acl: DEFAULT_ACL.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

/// Where an object goes
///
/// The `Host` header comes from the bucket URL while the PUT itself may be
/// sent to a different upload URL, as some backends hand out both.
#[derive(Debug, Clone)]
pub struct Destination {
    host: String,
    key: String,
    canonical_uri: String,
    upload_url: String,
}

impl Destination {
    /// Destination for `key` under `bucket_url`, uploaded to `bucket_url/key`
    ///
    /// The signed path is the bucket URL's path followed by the key, so
    /// path-style URLs such as `http://host:9000/mybucket` work. The key is
    /// percent-encoded outside the unreserved set, keeping `/`, and the same
    /// encoded path is both signed and sent. A bucket URL with a query or
    /// fragment is rejected.
    pub fn new(bucket_url: &str, key: &str) -> Result<Self> {
        let url = reqwest::Url::parse(bucket_url).map_err(|e| {
            UploadError::InvalidDestination(format!("Invalid bucket URL '{}': {}", bucket_url, e))
        })?;

        if url.query().is_some() || url.fragment().is_some() {
            return Err(UploadError::InvalidDestination(format!(
                "Bucket URL '{}' must not have a query or fragment",
                bucket_url
            )));
        }

        let host = url.host_str().ok_or_else(|| {
            UploadError::InvalidDestination(format!("Bucket URL '{}' has no host", bucket_url))
        })?;

        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(UploadError::InvalidDestination(
                "Object key is empty".to_string(),
            ));
        }

        let canonical_uri = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            utf8_percent_encode(key, KEY_ENCODE_SET)
        );

        let mut upload_url = url.clone();
        upload_url.set_path(&canonical_uri);

        Ok(Self {
            upload_url: upload_url.to_string(),
            canonical_uri,
            host,
            key: key.to_string(),
        })
    }

    /// Send the PUT somewhere other than `bucket_url/key`
    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Encoded path that gets signed
    pub fn canonical_uri(&self) -> &str {
        &self.canonical_uri
    }
}

/// Outcome of a successful upload, handed to the caller's finalize step
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub key: String,
    pub payload_hash: String,
    pub size: u64,
    pub status: u16,
    pub body: String,
}

/// Signs and sends direct-to-storage uploads through a transport
///
/// Holds no credentials or signing state; everything request-specific is
/// passed into each call.
#[derive(Clone)]
pub struct UploadSession {
    transport: Arc<dyn UploadTransport>,
}

impl UploadSession {
    pub fn new(transport: Arc<dyn UploadTransport>) -> Self {
        Self { transport }
    }

    /// Hash, sign, and PUT a payload, timestamped now
    pub async fn upload<R>(
        &self,
        payload: R,
        destination: &Destination,
        credentials: &Credentials,
        options: &UploadOptions,
    ) -> Result<UploadReceipt>
    where
        R: Read + Seek + Send + 'static,
    {
        self.upload_at(payload, destination, credentials, options, Utc::now())
            .await
    }

    /// Hash, sign, and PUT a payload with an explicit request timestamp
    ///
    /// The payload is hashed completely before the PUT starts, then sent from
    /// its first byte. A non-success status is returned as
    /// [`UploadError::Rejected`] and never retried: the credentials are
    /// single-use, so the caller has to fetch fresh ones first.
    pub async fn upload_at<R>(
        &self,
        payload: R,
        destination: &Destination,
        credentials: &Credentials,
        options: &UploadOptions,
        timestamp: DateTime<Utc>,
    ) -> Result<UploadReceipt>
    where
        R: Read + Seek + Send + 'static,
    {
        credentials.validate()?;

        tracing::info!(
            "Uploading object: host={}, key={}",
            destination.host(),
            destination.key()
        );

        let (payload, payload_hash, size) = hash_in_background(payload).await?;
        tracing::debug!("Payload hashed: size={}, sha256={}", size, payload_hash);

        let request =
            build_upload_request(destination, credentials, options, &payload_hash, timestamp);
        let response = self
            .send(
                request,
                credentials,
                destination.upload_url(),
                PayloadBody::new(payload, size),
            )
            .await?;

        tracing::info!(
            "Upload complete: key={}, status={}",
            destination.key(),
            response.status
        );

        Ok(UploadReceipt {
            key: destination.key().to_string(),
            payload_hash,
            size,
            status: response.status,
            body: response.body,
        })
    }

    /// Sign a prepared PUT request and send it
    ///
    /// Signing failures, such as a missing `x-amz-content-sha256` header, are
    /// returned before the transport is touched.
    pub async fn send(
        &self,
        mut request: RequestDescriptor,
        credentials: &Credentials,
        url: &str,
        body: PayloadBody,
    ) -> Result<TransportResponse> {
        if request.method != Method::Put {
            return Err(UploadError::InvalidMethod(request.method.to_string()));
        }

        let authorization = authorize(&request, credentials)?;
        tracing::debug!(
            "Signed request: signed_headers={}",
            authorization.signed_headers.join(";")
        );
        request.insert_header("Authorization", authorization.to_string());

        let response = self.transport.put(url, request.headers(), body).await?;

        if !response.is_success() {
            tracing::warn!("Upload rejected: url={}, status={}", url, response.status);
            return Err(UploadError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        Ok(response)
    }
}

/// Headers sent with every upload, minus `Authorization`
pub fn build_upload_request(
    destination: &Destination,
    credentials: &Credentials,
    options: &UploadOptions,
    payload_hash: &str,
    timestamp: DateTime<Utc>,
) -> RequestDescriptor {
    let mut request = RequestDescriptor::new(Method::Put, destination.canonical_uri(), timestamp)
        .header("Host", destination.host())
        .header("Content-Type", &options.content_type)
        .header("X-AMZ-ACL", &options.acl)
        .header("X-AMZ-Content-SHA256", payload_hash);

    if let Some(token) = &credentials.session_token {
        request.insert_header("X-AMZ-Security-Token", token);
    }

    request.insert_header("X-AMZ-Date", format_amz_date(&timestamp));
    request
}

/// Measure and hash the payload off the async runtime, then rewind it
async fn hash_in_background<R>(mut payload: R) -> Result<(R, String, u64)>
where
    R: Read + Seek + Send + 'static,
{
    tokio::task::spawn_blocking(move || -> Result<(R, String, u64)> {
        let size = payload_size(&mut payload)?;
        let payload_hash = hash_payload(&mut payload)?;
        payload.rewind()?;
        Ok((payload, payload_hash, size))
    })
    .await
    .map_err(|e| UploadError::InvariantViolation(format!("Hashing task failed: {}", e)))?
}
