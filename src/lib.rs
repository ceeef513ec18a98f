// Library exports for the CLI and integration tests
pub mod auth;
pub mod config;
pub mod types;
pub mod upload;

// Re-export commonly used types
pub use auth::{Authorization, CanonicalRequest, Credentials, hash_payload, sign};
pub use config::Config;
pub use types::{ErrorKind, Method, RequestDescriptor, UploadError};
pub use upload::{
    Destination, HttpTransport, PayloadBody, TransportResponse, UploadOptions, UploadReceipt,
    UploadSession, UploadTransport,
};
