use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    routing::put,
};
use chrono::NaiveDateTime;
use putsign::auth::verify;
use putsign::{Authorization, Method, RequestDescriptor};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Shared state of the fake storage endpoint
#[derive(Clone)]
struct StorageState {
    secret_access_key: String,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<AtomicUsize>,
}

/// Object storage stand-in that checks the signature of every PUT
///
/// This starts a real HTTP server on a random port. Each PUT is verified
/// against `secret_access_key` using the raw request path and only the
/// headers named in its `SignedHeaders`, plus the body against
/// `x-amz-content-sha256`.
/// Accepted bodies are kept by key; anything else gets a 403.
pub struct TestServer {
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    #[allow(dead_code)] // Keep handle alive to prevent task abort
    handle: JoinHandle<()>,
    state: StorageState,
    pub base_url: String,
}

impl TestServer {
    pub async fn start(secret_access_key: &str) -> Self {
        let state = StorageState {
            secret_access_key: secret_access_key.to_string(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/{*key}", put(put_object))
            .with_state(state.clone());

        // Bind to a random available port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        TestServer {
            shutdown_tx: Some(shutdown_tx),
            handle,
            state,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.objects.lock().unwrap().get(key).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Signal shutdown (ignore errors if already shut down)
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// PUT /{key} - store an object if its signature checks out
async fn put_object(
    Path(key): Path<String>,
    State(state): State<StorageState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state.requests.fetch_add(1, Ordering::SeqCst);

    match check_request(uri.path(), &headers, &body, &state.secret_access_key) {
        Ok(()) => {
            state
                .objects
                .lock()
                .unwrap()
                .insert(key, body.to_vec());
            (StatusCode::OK, String::new())
        }
        Err(reason) => (StatusCode::FORBIDDEN, reason),
    }
}

fn check_request(
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
    secret_access_key: &str,
) -> Result<(), String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| format!("MissingHeader: {}", name))
    };

    let authorization =
        Authorization::parse(header("authorization")?).map_err(|e| e.to_string())?;

    let timestamp = NaiveDateTime::parse_from_str(header("x-amz-date")?, "%Y%m%dT%H%M%SZ")
        .map_err(|e| format!("InvalidDate: {}", e))?
        .and_utc();

    let mut request = RequestDescriptor::new(Method::Put, path, timestamp);
    for name in &authorization.signed_headers {
        request.insert_header(name.clone(), header(name)?);
    }

    let body_hash = hex::encode(Sha256::digest(body));
    if Some(body_hash.as_str()) != request.get_header("x-amz-content-sha256") {
        return Err("XAmzContentSHA256Mismatch".to_string());
    }

    match verify(&request, &authorization, secret_access_key) {
        Ok(true) => Ok(()),
        Ok(false) => Err("SignatureDoesNotMatch".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
