//! Trait definitions for external dependencies.
//!
//! This module defines traits that abstract over the two remote services
//! (the open-data catalog and the object store), enabling:
//!
//! - **Testability**: Mock implementations for unit and integration testing
//! - **Decoupling**: Core business logic doesn't depend on reqwest or the AWS SDK
//!
//! # Example
//!
//! ```
//! use resvault_core::traits::{CatalogClient, ObjectStore};
//!
//! // Business logic uses traits, not concrete types
//! async fn count_backed_up<C, S>(catalog: &C, store: &S) -> Result<usize, resvault_core::AppError>
//! where
//!     C: CatalogClient,
//!     S: ObjectStore,
//! {
//!     let mut count = 0;
//!     for dataset in catalog.list_datasets().await? {
//!         for resource in &dataset.resources {
//!             let key = resource.object_key();
//!             if store.get_object_metadata(&dataset.bucket_name(), &key).await?.is_some() {
//!                 count += 1;
//!             }
//!         }
//!     }
//!     Ok(count)
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::AppError;
use crate::models::{BucketSummary, Dataset, ObjectMetadata, ObjectSummary};

/// Client for the open-data catalog.
pub trait CatalogClient: Send + Sync + Clone {
    /// Fetches every dataset with its nested resources.
    ///
    /// # Errors
    ///
    /// `NetworkError`/`Timeout` when the catalog is unreachable, `ApiError` on
    /// a non-success status, `ParseError` on a malformed body.
    fn list_datasets(&self) -> impl Future<Output = Result<Vec<Dataset>, AppError>> + Send;

    /// Downloads a resource's content from its source URL.
    fn download(&self, url: &str) -> impl Future<Output = Result<Bytes, AppError>> + Send;
}

/// S3-compatible object store.
///
/// All operations are network calls; implementations keep no state between calls.
pub trait ObjectStore: Send + Sync + Clone {
    /// Creates the bucket if absent; a no-op if it already exists.
    fn ensure_bucket(&self, name: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Returns the object's metadata, or `None` when the object does not exist.
    ///
    /// Absence is never an error.
    fn get_object_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<ObjectMetadata>, AppError>> + Send;

    /// Uploads `content` with the given user metadata, overwriting silently.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: HashMap<String, String>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Lists buckets lazily. Calling again restarts the listing.
    fn list_buckets(&self) -> BoxStream<'_, Result<BucketSummary, AppError>>;

    /// Lists a bucket's objects lazily, one page fetched per exhausted page.
    /// Calling again restarts the listing. The stream does not borrow `bucket`.
    fn list_objects(&self, bucket: &str) -> BoxStream<'_, Result<ObjectSummary, AppError>>;
}
