use clap::Parser;
use putsign::{Config, Credentials, HttpTransport, UploadSession};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// putsign: sign a file upload and PUT it straight into object storage
#[derive(Parser, Debug)]
#[command(name = "putsign")]
#[command(about = "Sign and upload a file directly to S3-compatible object storage", long_about = None)]
struct Cli {
    /// Path to the destination configuration file (required)
    #[arg(short, long, env = "CONFIG_PATH")]
    config: String,

    /// File to upload
    file: PathBuf,

    /// Object key; defaults to the file name
    #[arg(short, long)]
    key: Option<String>,

    /// Access key ID of the upload credentials
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    access_key_id: String,

    /// Secret access key of the upload credentials
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: String,

    /// Session token issued with temporary credentials
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Content type, overriding the configured one
    #[arg(long)]
    content_type: Option<String>,
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", cli.config);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load config file '{}': {}", cli.config, e);
            tracing::error!(
                "Configuration file is required. Use --config <path> or set CONFIG_PATH environment variable."
            );
            std::process::exit(1);
        }
    };

    let Some(key) = cli.key.clone().or_else(|| file_name(&cli.file)) else {
        tracing::error!("Cannot derive an object key from '{}'", cli.file.display());
        std::process::exit(1);
    };

    let destination = match config.destination(&key) {
        Ok(destination) => destination,
        Err(e) => {
            tracing::error!("Invalid destination: {}", e);
            std::process::exit(1);
        }
    };

    let mut options = config.upload_options();
    if let Some(content_type) = cli.content_type {
        options.content_type = content_type;
    }

    let mut credentials = Credentials::new(
        cli.access_key_id,
        cli.secret_access_key,
        config.region.clone(),
        config.service.clone(),
    );
    if let Some(token) = cli.session_token {
        credentials = credentials.with_session_token(token);
    }

    let file = match File::open(&cli.file) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!("Failed to open '{}': {}", cli.file.display(), e);
            std::process::exit(1);
        }
    };

    let transport = match HttpTransport::new() {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    let session = UploadSession::new(Arc::new(transport));

    tracing::info!("Using access key: {}", credentials.access_key_id);
    tracing::info!("Uploading to: {}", destination.upload_url());

    match session
        .upload(file, &destination, &credentials, &options)
        .await
    {
        Ok(receipt) => match serde_json::to_string(&receipt) {
            Ok(summary) => println!("{}", summary),
            Err(e) => {
                tracing::error!("Failed to serialize upload receipt: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("Upload failed [{}]: {}", e.error_code(), e);
            std::process::exit(1);
        }
    }
}
