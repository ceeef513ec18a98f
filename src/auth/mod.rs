mod credentials;
mod payload;
mod signature;

pub use credentials::{
    CredentialScope, Credentials, SCOPE_TERMINATOR, format_amz_date, format_date_stamp,
};
pub use payload::{CHUNK_SIZE, EMPTY_PAYLOAD_SHA256, hash_payload, payload_size};
pub use signature::{
    ALGORITHM, Authorization, CanonicalRequest, SigningKey, authorize, build_string_to_sign,
    sign, verify,
};
