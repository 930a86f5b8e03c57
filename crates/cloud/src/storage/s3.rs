//! Amazon S3 (or S3-compatible) object storage.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use beatstore_core::storage_keys::attachment_disposition;

use super::{ObjectStorage, StorageError};

/// S3-backed object storage for a single bucket.
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    /// Base of public media URLs, e.g. a CDN in front of the bucket.
    public_base_url: String,
}

impl S3ObjectStorage {
    /// Connect using default AWS credentials from the environment.
    ///
    /// With `endpoint` set, path-style addressing is forced so MinIO and
    /// other S3-compatible services work.
    pub async fn connect(
        bucket: impl Into<String>,
        endpoint: Option<&str>,
        region: Option<&str>,
        public_base_url: Option<String>,
    ) -> Self {
        let bucket = bucket.into();
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&config);
        if let Some(endpoint) = endpoint {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }

        let public_base_url = public_base_url.unwrap_or_else(|| match endpoint {
            Some(endpoint) => format!("{}/{bucket}", endpoint.trim_end_matches('/')),
            None => format!("https://{bucket}.s3.amazonaws.com"),
        });

        Self {
            client: Client::from_conf(s3_config.build()),
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::PutFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(key, size, "Stored object in S3");
        Ok(())
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        filename: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presign_err = |message: String| StorageError::PresignFailed {
            key: key.to_string(),
            message,
        };
        let presigning =
            PresigningConfig::expires_in(expires_in).map_err(|e| presign_err(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(attachment_disposition(filename))
            .presigned(presigning)
            .await
            .map_err(|e| presign_err(e.to_string()))?;
        Ok(request.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url.trim_end_matches('/'))
    }
}
