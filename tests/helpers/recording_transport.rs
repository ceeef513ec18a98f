use putsign::{PayloadBody, TransportResponse, UploadError, UploadTransport};
use std::io::Read;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A PUT as seen by the transport
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub length: u64,
}

impl RecordedPut {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Transport that answers every PUT with a fixed status and keeps what it was sent
pub struct RecordingTransport {
    status: u16,
    response_body: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedPut>>,
}

impl RecordingTransport {
    pub fn new(status: u16, response_body: &str) -> Self {
        Self {
            status,
            response_body: response_body.to_string(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(200, "")
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedPut> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl UploadTransport for RecordingTransport {
    async fn put(
        &self,
        url: &str,
        headers: &[(String, String)],
        mut body: PayloadBody,
    ) -> Result<TransportResponse, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut data = Vec::new();
        body.reader.read_to_end(&mut data)?;

        self.requests.lock().unwrap().push(RecordedPut {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: data,
            length: body.length,
        });

        Ok(TransportResponse {
            status: self.status,
            body: self.response_body.clone(),
        })
    }
}
