use crate::types::{Result, UploadError};
use chrono::{DateTime, Utc};
use std::fmt;

/// Literal closing every credential scope
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// Short-lived credentials for a single upload attempt
///
/// Handed in per call and dropped once the upload finishes. The `Debug`
/// output never includes the secret key or the session token.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub service: String,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Check that every field ends up well-formed in the credential string
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("access key id", self.access_key_id.as_str()),
            ("region", self.region.as_str()),
            ("service", self.service.as_str()),
        ];

        for (field, value) in fields {
            if value.is_empty() {
                return Err(UploadError::MalformedCredentials(format!(
                    "{} is empty",
                    field
                )));
            }
            if value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(UploadError::MalformedCredentials(format!(
                    "{} contains '/' or whitespace",
                    field
                )));
            }
        }

        if self.secret_access_key.is_empty() {
            return Err(UploadError::MalformedCredentials(
                "secret access key is empty".to_string(),
            ));
        }

        if matches!(&self.session_token, Some(token) if token.is_empty()) {
            return Err(UploadError::MalformedCredentials(
                "session token is empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Credential scope for a request signed at `timestamp`
    pub fn scope(&self, timestamp: &DateTime<Utc>) -> CredentialScope {
        CredentialScope::new(timestamp, &self.region, &self.service)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

/// `date/region/service/aws4_request`, binding a signing key to one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    pub date: String,
    pub region: String,
    pub service: String,
}

impl CredentialScope {
    pub fn new(timestamp: &DateTime<Utc>, region: &str, service: &str) -> Self {
        Self {
            date: format_date_stamp(timestamp),
            region: region.to_string(),
            service: service.to_string(),
        }
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.date, self.region, self.service, SCOPE_TERMINATOR
        )
    }
}

/// Format as `YYYYMMDD`
pub fn format_date_stamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d").to_string()
}

/// Format as `YYYYMMDD'T'HHMMSS'Z'`, the value of `X-AMZ-Date`
pub fn format_amz_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%dT%H%M%SZ").to_string()
}
