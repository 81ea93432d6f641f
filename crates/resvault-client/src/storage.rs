//! S3-compatible object store backed by `aws-sdk-s3`.
//!
//! Buckets are addressed path-style by default (`endpoint/bucket/key`), which
//! Cellar and most self-hosted S3 servers expect. Credentials are static and
//! come from the command line.

use std::collections::HashMap;

use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use resvault_core::StorageConfig;
use resvault_core::error::AppError;
use resvault_core::models::{
    BucketSummary, ObjectMetadata, ObjectSummary, SIDECAR_PREFIX, SIDECAR_SUFFIX,
};
use resvault_core::traits::ObjectStore;

/// Error codes returned when the store does not accept the credentials.
const CREDENTIAL_ERROR_CODES: [&str; 2] = ["InvalidAccessKeyId", "SignatureDoesNotMatch"];

/// Region under which buckets are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// [`ObjectStore`] talking to an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    /// Builds a client for `config.endpoint` with static credentials.
    ///
    /// No request is made; invalid credentials surface on the first call.
    pub fn new(config: &StorageConfig, access_key: &str, secret_key: &str) -> Self {
        let creds = Credentials::new(access_key, secret_key, None, None, "resvault-cli");

        let s3_config = aws_sdk_s3::Config::builder()
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(creds)
            .force_path_style(config.force_path_style)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            region: config.region.clone(),
        }
    }

    async fn fetch_buckets(&self) -> Result<Vec<BucketSummary>, AppError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error("list_buckets", "*", &e, true))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| {
                Some(BucketSummary {
                    name: b.name()?.to_string(),
                    created: b.creation_date().and_then(to_chrono),
                })
            })
            .collect())
    }

    /// Fetches one page of a bucket listing; returns the objects and the
    /// continuation token when more pages remain.
    async fn fetch_objects_page(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<(Vec<ObjectSummary>, Option<String>), AppError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| map_sdk_error("list_objects", bucket, &e, false))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|o| {
                Some(ObjectSummary {
                    key: o.key()?.to_string(),
                    last_modified: o.last_modified().and_then(to_chrono),
                    size: o.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                    e_tag: o.e_tag().map(str::to_string),
                })
            })
            .collect();

        let next = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(String::from)
        } else {
            None
        };
        Ok((objects, next))
    }

    async fn create_bucket(&self, name: &str) -> Result<(), AppError> {
        let mut request = self.client.create_bucket().bucket(name);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = name, "Created bucket");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(e) => Err(map_sdk_error("create_bucket", name, &e, false)),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, name: &str) -> Result<(), AppError> {
        match self.client.head_bucket().bucket(name).send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => self.create_bucket(name).await,
            Err(e) => Err(map_sdk_error("head_bucket", name, &e, false)),
        }
    }

    async fn get_object_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectMetadata>, AppError> {
        let result = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(ObjectMetadata {
                user: output.metadata().cloned().unwrap_or_default(),
                last_modified: output.last_modified().and_then(to_chrono),
                size: output.content_length().and_then(|s| u64::try_from(s).ok()),
                e_tag: output.e_tag().map(str::to_string),
            })),
            // Covers both a missing object and a missing bucket.
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(map_sdk_error(
                "head_object",
                format!("{}/{}", bucket, key),
                &e,
                false,
            )),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: HashMap<String, String>,
    ) -> Result<(), AppError> {
        let size = content.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type_for(key))
            .set_metadata(Some(metadata))
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| map_sdk_error("put_object", format!("{}/{}", bucket, key), &e, false))?;

        tracing::debug!(bucket, key, bytes = size, "Uploaded object");
        Ok(())
    }

    fn list_buckets(&self) -> BoxStream<'_, Result<BucketSummary, AppError>> {
        stream::once(self.fetch_buckets())
            .map_ok(|buckets| stream::iter(buckets.into_iter().map(Ok::<_, AppError>)))
            .try_flatten()
            .boxed()
    }

    fn list_objects(&self, bucket: &str) -> BoxStream<'_, Result<ObjectSummary, AppError>> {
        let bucket = bucket.to_string();
        // State is `Some(token)` while pages remain; the first page has no token.
        stream::try_unfold(Some(None::<String>), move |state| {
            let bucket = bucket.clone();
            async move {
                let Some(token) = state else {
                    return Ok::<_, AppError>(None);
                };
                let (objects, next) = self.fetch_objects_page(&bucket, token).await?;
                Ok(Some((objects, next.map(Some))))
            }
        })
        .map_ok(|objects| stream::iter(objects.into_iter().map(Ok::<_, AppError>)))
        .try_flatten()
        .boxed()
    }
}

fn content_type_for(key: &str) -> &'static str {
    if key.starts_with(SIDECAR_PREFIX) && key.ends_with(SIDECAR_SUFFIX) {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

fn to_chrono(dt: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn is_not_found<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    http_status(err) == Some(404)
        || matches!(err.code(), Some("NotFound" | "NoSuchKey" | "NoSuchBucket"))
}

fn http_status<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

/// Whether an S3 failure means the credentials were rejected.
///
/// A bare 403 only counts on service-level calls: on bucket or object calls
/// it is a permission problem on that resource.
fn is_credential_error(code: Option<&str>, status: Option<u16>, service_level: bool) -> bool {
    if code.is_some_and(|c| CREDENTIAL_ERROR_CODES.contains(&c)) || status == Some(401) {
        return true;
    }
    service_level && (status == Some(403) || code == Some("AccessDenied"))
}

fn map_sdk_error<E>(
    operation: &'static str,
    target: impl Into<String>,
    err: &SdkError<E>,
    service_level: bool,
) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let target = target.into();
    let detail = DisplayErrorContext(err).to_string();

    if is_credential_error(err.code(), http_status(err), service_level) {
        return AppError::AuthenticationFailed(detail);
    }
    if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
        return AppError::NetworkError(format!("{} on {}: {}", operation, target, detail));
    }
    AppError::storage(operation, target, detail)
}
