use super::credentials::{
    CredentialScope, Credentials, SCOPE_TERMINATOR, format_amz_date, format_date_stamp,
};
use crate::types::{CONTENT_SHA256_HEADER, RequestDescriptor, Result, UploadError};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// Algorithm identifier opening the string to sign and the Authorization value
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

const SECRET_KEY_PREFIX: &str = "AWS4";

/// Everything except RFC 3986 unreserved characters gets percent-encoded
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// Canonical form of a request, the input to the signature
///
/// Header names are lower-cased and values trimmed on the way in; headers and
/// query parameters are sorted here, so the result does not depend on the
/// order they were added to the descriptor.
///
/// Deliberately not `Debug`: the canonical headers include the session token.
pub struct CanonicalRequest {
    method: &'static str,
    uri: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Build the canonical request
    ///
    /// Fails with `MissingHeader` when the descriptor has no
    /// `x-amz-content-sha256` header.
    pub fn new(request: &RequestDescriptor) -> Result<Self> {
        let mut headers: Vec<(String, String)> = request
            .headers()
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let payload_hash = headers
            .iter()
            .find(|(name, _)| name == CONTENT_SHA256_HEADER)
            .map(|(_, value)| value.clone())
            .ok_or(UploadError::MissingHeader(CONTENT_SHA256_HEADER))?;

        let mut query: Vec<(String, String)> = request
            .query_parameters()
            .iter()
            .map(|(key, value)| (uri_encode(key), uri_encode(value)))
            .collect();
        query.sort();

        Ok(Self {
            method: request.method.as_str(),
            uri: request.canonical_uri.clone(),
            query,
            headers,
            payload_hash,
        })
    }

    /// Sorted header names joined with `;`
    pub fn signed_headers(&self) -> String {
        self.headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Encoded parameters as `key:value`, joined with `&`
    ///
    /// The `:` separator is what the upload endpoint has always been signed
    /// with; every real upload has an empty query, so it has never been
    /// checked against `=`. Keep it unless a live verifier says otherwise.
    pub fn canonical_query(&self) -> String {
        self.query
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// One `name:value\n` line per header
    pub fn canonical_headers(&self) -> String {
        let mut canonical = String::new();
        for (name, value) in &self.headers {
            canonical.push_str(name);
            canonical.push(':');
            canonical.push_str(value);
            canonical.push('\n');
        }
        canonical
    }

    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Hex SHA-256 of the rendered canonical request
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.to_string().as_bytes()))
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // HTTPMethod + '\n' +
        // CanonicalURI + '\n' +
        // CanonicalQueryString + '\n' +
        // CanonicalHeaders + '\n' +
        // SignedHeaders + '\n' +
        // HashedPayload
        write!(
            f,
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.uri,
            self.canonical_query(),
            self.canonical_headers(),
            self.signed_headers(),
            self.payload_hash
        )
    }
}

/// Key derived from a secret for one credential scope
///
/// Derived fresh for every request and consumed by [`SigningKey::sign`], so
/// it can never be reused or cached.
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn derive(secret_access_key: &str, scope: &CredentialScope) -> Result<Self> {
        let k_secret = format!("{}{}", SECRET_KEY_PREFIX, secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), scope.date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, scope.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, scope.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())?;
        Ok(Self(k_signing))
    }

    /// Hex HMAC-SHA256 of the string to sign
    pub fn sign(self, string_to_sign: &str) -> Result<String> {
        let signature = hmac_sha256(&self.0, string_to_sign.as_bytes())?;
        Ok(hex::encode(signature))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Build the string to sign
pub fn build_string_to_sign(
    canonical_request: &CanonicalRequest,
    timestamp: &DateTime<Utc>,
    scope: &CredentialScope,
) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        format_amz_date(timestamp),
        scope,
        canonical_request.digest()
    )
}

/// Components of an `AWS4-HMAC-SHA256` Authorization value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub access_key_id: String,
    pub credential_scope: CredentialScope,
    pub signed_headers: Vec<String>,
    pub signature: String,
}

impl Authorization {
    /// Parse an Authorization header value
    ///
    /// Expected format: `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`
    pub fn parse(header: &str) -> Result<Self> {
        // Format: AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20220101/us-east-1/s3/aws4_request,
        //         SignedHeaders=host;x-amz-content-sha256, Signature=b241ec74...
        let parts = header
            .strip_prefix(ALGORITHM)
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or_else(|| {
                UploadError::InvalidAuthorization(format!("expected {} prefix", ALGORITHM))
            })?;

        let mut credential = None;
        let mut signed_headers = None;
        let mut signature = None;

        for part in parts.split(',') {
            let part = part.trim();
            if let Some(value) = part.strip_prefix("Credential=") {
                credential = Some(value);
            } else if let Some(value) = part.strip_prefix("SignedHeaders=") {
                signed_headers = Some(value);
            } else if let Some(value) = part.strip_prefix("Signature=") {
                signature = Some(value);
            }
        }

        let credential = credential
            .ok_or_else(|| UploadError::InvalidAuthorization("missing Credential".to_string()))?;
        let signed_headers = signed_headers.ok_or_else(|| {
            UploadError::InvalidAuthorization("missing SignedHeaders".to_string())
        })?;
        let signature = signature
            .ok_or_else(|| UploadError::InvalidAuthorization("missing Signature".to_string()))?;

        // AKIDEXAMPLE/20220101/us-east-1/s3/aws4_request
        let credential_parts: Vec<&str> = credential.split('/').collect();
        if credential_parts.len() != 5
            || credential_parts[4] != SCOPE_TERMINATOR
            || credential_parts[..4].iter().any(|part| part.is_empty())
        {
            return Err(UploadError::InvalidAuthorization(
                "invalid credential format".to_string(),
            ));
        }

        Ok(Self {
            access_key_id: credential_parts[0].to_string(),
            credential_scope: CredentialScope {
                date: credential_parts[1].to_string(),
                region: credential_parts[2].to_string(),
                service: credential_parts[3].to_string(),
            },
            signed_headers: signed_headers.split(';').map(|s| s.to_string()).collect(),
            signature: signature.to_string(),
        })
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.access_key_id,
            self.credential_scope,
            self.signed_headers.join(";"),
            self.signature
        )
    }
}

/// Sign a request and return its components
///
/// Every call canonicalizes, derives the signing key, and signs from scratch.
pub fn authorize(request: &RequestDescriptor, credentials: &Credentials) -> Result<Authorization> {
    credentials.validate()?;

    let canonical_request = CanonicalRequest::new(request)?;
    let scope = credentials.scope(&request.timestamp);
    let string_to_sign = build_string_to_sign(&canonical_request, &request.timestamp, &scope);
    let signature =
        SigningKey::derive(&credentials.secret_access_key, &scope)?.sign(&string_to_sign)?;

    Ok(Authorization {
        access_key_id: credentials.access_key_id.clone(),
        credential_scope: scope,
        signed_headers: canonical_request
            .headers
            .iter()
            .map(|(name, _)| name.clone())
            .collect(),
        signature,
    })
}

/// Sign a request, returning the value for its `Authorization` header
pub fn sign(request: &RequestDescriptor, credentials: &Credentials) -> Result<String> {
    authorize(request, credentials).map(|authorization| authorization.to_string())
}

/// Check a received authorization against the request it arrived with
///
/// `request` must carry exactly the headers named in `SignedHeaders`. The
/// region and service come from the presented credential scope, whose date
/// must match the request timestamp.
pub fn verify(
    request: &RequestDescriptor,
    authorization: &Authorization,
    secret_access_key: &str,
) -> Result<bool> {
    if authorization.credential_scope.date != format_date_stamp(&request.timestamp) {
        tracing::warn!(
            "Credential scope date {} does not match request date",
            authorization.credential_scope.date
        );
        return Ok(false);
    }

    let credentials = Credentials::new(
        authorization.access_key_id.clone(),
        secret_access_key,
        authorization.credential_scope.region.clone(),
        authorization.credential_scope.service.clone(),
    );
    let expected = authorize(request, &credentials)?;

    if expected.signed_headers != authorization.signed_headers {
        tracing::warn!(
            "Signed headers mismatch. Expected: {}, Got: {}",
            expected.signed_headers.join(";"),
            authorization.signed_headers.join(";")
        );
        return Ok(false);
    }

    Ok(expected
        .signature
        .as_bytes()
        .ct_eq(authorization.signature.as_bytes())
        .into())
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ENCODE_SET).to_string()
}

/// HMAC-SHA256 helper
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| UploadError::InvariantViolation(format!("HMAC error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
