//! Amazon S3 (and S3-compatible) backend.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use studyhub_core::storage::{AssetStorage, StorageError};

/// Error codes S3 uses for throttling.
const THROTTLING_CODES: &[&str] = &["SlowDown", "Throttling", "RequestTimeout"];

/// Everything but unreserved characters and the `/` key separator.
const COPY_SOURCE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// `x-amz-copy-source` value for an object: `bucket/key` with the key URL-encoded.
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE_ENCODE_SET))
}

/// Server-side operations against S3 buckets.
#[derive(Debug, Clone)]
pub struct S3AssetStorage {
    client: Client,
}

impl S3AssetStorage {
    /// Build a client from the default credential chain.
    ///
    /// A custom `endpoint_url` switches to path-style addressing, which
    /// S3-compatible stores expect.
    pub async fn connect(region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint_url {
            tracing::info!(endpoint = %endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::from_client(Client::from_conf(builder.build()))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetStorage for S3AssetStorage {
    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(classify_sdk_error(err)),
        }
    }

    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<(), StorageError> {
        let result = self
            .client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, src_key))
            .key(dst_key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if err.as_service_error().and_then(|e| e.code()) == Some("NoSuchKey") => {
                Err(StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: src_key.to_string(),
                })
            }
            Err(err) => Err(classify_sdk_error(err)),
        }
    }
}

/// Map an SDK failure to a retryable or fatal [`StorageError`].
///
/// Network failures, timeouts, throttling and 5xx responses are transient.
fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let transient = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            status >= 500
                || status == 429
                || context
                    .err()
                    .code()
                    .is_some_and(|code| THROTTLING_CODES.contains(&code))
        }
        _ => false,
    };

    let message = DisplayErrorContext(&err).to_string();
    if transient {
        StorageError::Transient(message)
    } else {
        StorageError::Fatal(message)
    }
}
