mod session;
mod transport;

pub use session::{
    DEFAULT_ACL, DEFAULT_CONTENT_TYPE, Destination, UploadOptions, UploadReceipt, UploadSession,
    build_upload_request,
};
pub use transport::{HttpTransport, PayloadBody, TransportResponse, UploadTransport};
