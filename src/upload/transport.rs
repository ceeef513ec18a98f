use crate::types::{Result, UploadError};
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue};
use std::io::{self, Read};
use tokio_stream::wrappers::ReceiverStream;

/// Bytes read from the payload per body frame
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Frames buffered between the reading thread and the HTTP client
const STREAM_CHANNEL_CAPACITY: usize = 16;

/// Payload handed to a transport, positioned at the first byte to send
pub struct PayloadBody {
    pub reader: Box<dyn Read + Send>,
    pub length: u64,
}

impl PayloadBody {
    pub fn new(reader: impl Read + Send + 'static, length: u64) -> Self {
        Self {
            reader: Box::new(reader),
            length,
        }
    }
}

/// Status and body returned by the storage endpoint
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues the signed PUT - implement this for different HTTP stacks
#[async_trait::async_trait]
pub trait UploadTransport: Send + Sync {
    /// Send one PUT with exactly the given headers and body
    ///
    /// Only a failure to get any response is an error here; non-success
    /// statuses are returned as-is.
    async fn put(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: PayloadBody,
    ) -> Result<TransportResponse>;
}

/// [`UploadTransport`] backed by `reqwest`
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| UploadError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl UploadTransport for HttpTransport {
    async fn put(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: PayloadBody,
    ) -> Result<TransportResponse> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            // Values are left out of errors: they may hold the session token
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| UploadError::InvalidHeader(format!("{}: {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| UploadError::InvalidHeader(format!("{}: {}", name, e)))?;
            header_map.insert(header_name, header_value);
        }
        // A known length keeps the body from being sent chunked
        header_map.insert(CONTENT_LENGTH, HeaderValue::from(body.length));

        tracing::debug!("PUT {} ({} bytes)", url, body.length);

        let response = self
            .client
            .put(url)
            .headers(header_map)
            .body(stream_body(body.reader))
            .send()
            .await
            .map_err(|e| UploadError::Transport(format!("PUT {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(format!("Failed to read response: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}

/// Adapt a blocking reader into a streaming request body
///
/// A blocking task reads the payload and forwards frames over a bounded
/// channel, so only up to the channel capacity is buffered, never the whole
/// payload.
fn stream_body(mut reader: Box<dyn Read + Send>) -> reqwest::Body {
    let (tx, rx) = tokio::sync::mpsc::channel::<io::Result<Bytes>>(STREAM_CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let frame = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => Ok(Bytes::copy_from_slice(&chunk[..read])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };

            let failed = frame.is_err();
            // Receiver dropped means the request was abandoned
            if tx.blocking_send(frame).is_err() || failed {
                break;
            }
        }
    });

    reqwest::Body::wrap_stream(ReceiverStream::new(rx))
}
