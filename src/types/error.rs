/// Category of an [`UploadError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input detected locally, before anything is sent
    Validation,
    /// The storage endpoint rejected the upload or could not be reached
    Network,
    /// An internal consistency check failed
    InvariantViolation,
    /// Reading the payload failed
    Io,
}

/// Errors raised while signing or uploading an object
///
/// None of the variants carry secret material, so errors can be logged freely.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Invalid authorization header: {0}")]
    InvalidAuthorization(String),

    #[error("Upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = UploadError> = std::result::Result<T, E>;

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::InvalidMethod(_)
            | UploadError::MissingHeader(_)
            | UploadError::MalformedCredentials(_)
            | UploadError::InvalidHeader(_)
            | UploadError::InvalidDestination(_)
            | UploadError::InvalidAuthorization(_) => ErrorKind::Validation,
            UploadError::Rejected { .. } | UploadError::Transport(_) => ErrorKind::Network,
            UploadError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            UploadError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::InvariantViolation => "InvariantViolation",
            ErrorKind::Io => "IoError",
        }
    }

    /// HTTP status returned by the storage endpoint, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
