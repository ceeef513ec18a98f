use super::error::UploadError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Header carrying the hex SHA-256 of the request body
pub const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";

/// Headers whose values must never show up in logs or debug output
const REDACTED_HEADERS: [&str; 2] = ["authorization", "x-amz-security-token"];

/// HTTP verbs accepted by the signer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Connect => "CONNECT",
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = UploadError;

    /// Parse a method name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CONNECT" => Ok(Method::Connect),
            "DELETE" => Ok(Method::Delete),
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "TRACE" => Ok(Method::Trace),
            _ => Err(UploadError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of the HTTP request to be signed
///
/// Headers keep the names exactly as given, since those are what goes on the
/// wire. Lookups and replacement are case-insensitive. Query parameters and
/// headers are held as ordered pairs; canonicalization sorts them explicitly.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub canonical_uri: String,
    pub timestamp: DateTime<Utc>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, canonical_uri: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            method,
            canonical_uri: canonical_uri.into(),
            timestamp,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Add a header, replacing any existing header with the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Add a query parameter, replacing any existing parameter with the same name
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_query(name, value);
        self
    }

    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }

    pub fn insert_query(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.query.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.query.push((name, value)),
        }
    }

    /// Case-insensitive header lookup
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query_parameters(&self) -> &[(String, String)] {
        &self.query
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if REDACTED_HEADERS
                    .iter()
                    .any(|redacted| name.eq_ignore_ascii_case(redacted))
                {
                    "<redacted>"
                } else {
                    value.as_str()
                };
                (name.as_str(), shown)
            })
            .collect();

        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("canonical_uri", &self.canonical_uri)
            .field("timestamp", &self.timestamp)
            .field("query", &self.query)
            .field("headers", &headers)
            .finish()
    }
}
