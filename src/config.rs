use crate::types::Result;
use crate::upload::{DEFAULT_ACL, DEFAULT_CONTENT_TYPE, Destination, UploadOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SERVICE: &str = "s3";

/// Upload destination settings, read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bucket_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_acl")]
    pub acl: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_acl() -> String {
    DEFAULT_ACL.to_string()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Destination for `key`, honouring a configured upload URL
    pub fn destination(&self, key: &str) -> Result<Destination> {
        let destination = Destination::new(&self.bucket_url, key)?;
        Ok(match &self.upload_url {
            Some(upload_url) => destination.with_upload_url(upload_url.clone()),
            None => destination,
        })
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            acl: self.acl.clone(),
            content_type: self.content_type.clone(),
        }
    }
}
