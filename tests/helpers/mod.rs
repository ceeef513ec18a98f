#![allow(dead_code)]

mod recording_transport;
mod test_server;

pub use recording_transport::{RecordedPut, RecordingTransport};
pub use test_server::TestServer;

use putsign::Credentials;

pub const TEST_ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
pub const TEST_SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
pub const TEST_SESSION_TOKEN: &str = "SESSIONTOKEN";
pub const TEST_REGION: &str = "us-east-1";

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY, TEST_REGION, "s3")
        .with_session_token(TEST_SESSION_TOKEN)
}
