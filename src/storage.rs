// src/storage.rs - Input download and artifact upload
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::ServiceConfig;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn download_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Stream the body of `url` into `output`, creating its parent directory.
/// Non-2xx responses are failures.
pub async fn download_to_file(client: &reqwest::Client, url: &str, output: &Path) -> StorageResult<PathBuf> {
    debug!("Downloading {} to {}", url, output.display());

    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| StorageError::download_failed(url, e))?;

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }
    let mut file = tokio::fs::File::create(output)
        .await
        .map_err(|e| StorageError::io(output, e))?;

    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| StorageError::download_failed(url, e))?
    {
        file.write_all(&chunk).await.map_err(|e| StorageError::io(output, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| StorageError::io(output, e))?;

    info!("Downloaded {} ({} bytes)", url, written);
    Ok(output.to_path_buf())
}

/// Publishes a finished artifact and hands back where clients can fetch it.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Upload `path` under `key` and return its public URL.
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<String>;
}

/// Uploads artifacts to a public S3 bucket.
#[derive(Clone)]
pub struct S3Uploader {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3Uploader {
    pub fn new(client: Client, bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Static credentials from the config when present, otherwise the
    /// default AWS provider chain.
    pub async fn from_config(config: &ServiceConfig) -> Self {
        let region = Region::new(config.s3_region.clone());
        let builder = match (&config.s3_access_key_id, &config.s3_secret_access_key) {
            (Some(key_id), Some(secret)) => Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(Credentials::new(key_id, secret, None, None, "form_compare")),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };
        let builder = match &config.s3_endpoint {
            Some(endpoint) => builder.endpoint_url(endpoint).force_path_style(true),
            None => builder,
        };

        Self::new(
            Client::from_conf(builder.build()),
            config.s3_bucket.clone(),
            config.public_base_url.clone(),
        )
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }

}

#[async_trait]
impl ArtifactUploader for S3Uploader {
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<String> {
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", path.display(), e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type(path))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(self.public_url(key))
    }
}

/// `<prefix>/<request id>/<file name>`
pub fn object_key(prefix: &str, request_id: &str, path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}/{}", prefix, request_id, file_name)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("png") => "image/png",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
