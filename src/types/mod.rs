pub mod error;
pub mod models;

pub use error::{ErrorKind, Result, UploadError};
pub use models::{CONTENT_SHA256_HEADER, Method, RequestDescriptor};
