//! Backup service for catalog-to-storage synchronization.
//!
//! This module provides the core business logic of a backup run: fetch the
//! catalog, filter datasets and resources, compare each resource's catalog
//! timestamp against the one recorded on its stored copy, and upload what is
//! absent or stale.
//!
//! # Architecture
//!
//! The [`BackupService`] is generic over two traits:
//! - [`CatalogClient`] - for reading the open-data catalog and downloading content
//! - [`ObjectStore`] - for bucket and object operations
//!
//! # Failure policy
//!
//! - Catalog listing failure aborts the run (nothing has been written yet).
//! - Bucket failure skips the dataset; its eligible resources count as failed.
//! - Resource failure (download, upload, bad timestamp) is logged and counted;
//!   the next resource is processed.
//! - [`AppError::is_fatal`] errors (rejected credentials) abort the run at any level.
//!
//! # Cancellation Support
//!
//! [`BackupService::run_cancellable`] accepts a `CancellationToken`, checked
//! before each dataset and before each resource. In-flight uploads complete;
//! the partial statistics are returned with `SyncStatus::Cancelled`. A run
//! that attempted every resource reports `SyncStatus::Completed` even if the
//! token fired at the very end.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;

use crate::config::BackupConfig;
use crate::error::AppError;
use crate::models::{BackupRecord, Dataset, Resource, object_user_metadata};
use crate::progress::{BackupEvent, ProgressReporter, SilentReporter};
use crate::sync::{BackupDecision, BackupResult, BackupStats, SyncOutcome, needs_backup};
use crate::traits::{CatalogClient, ObjectStore};

/// Service backing up catalog resources into an object store.
///
/// # Type Parameters
///
/// * `C` - Catalog client implementation (e.g., `TransportCatalogClient`)
/// * `S` - Object store implementation (e.g., `S3ObjectStore`)
///
/// # Example
///
/// ```ignore
/// use resvault_core::backup::BackupService;
///
/// let service = BackupService::new(catalog, store);
/// let stats = service.run().await?;
/// println!("{} backed up, {} skipped, {} failed", stats.backed_up(), stats.skipped(), stats.failed);
/// ```
pub struct BackupService<C, S>
where
    C: CatalogClient,
    S: ObjectStore,
{
    catalog: C,
    store: S,
    config: BackupConfig,
}

impl<C, S> Clone for BackupService<C, S>
where
    C: CatalogClient,
    S: ObjectStore,
{
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C, S> BackupService<C, S>
where
    C: CatalogClient,
    S: ObjectStore,
{
    /// Creates a new backup service with default configuration.
    pub fn new(catalog: C, store: S) -> Self {
        Self::with_config(catalog, store, BackupConfig::default())
    }

    /// Creates a backup service with custom configuration.
    pub fn with_config(catalog: C, store: S, config: BackupConfig) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    /// Returns the effective configuration of this service.
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Runs a full backup and returns statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched or if the storage
    /// rejects the credentials.
    pub async fn run(&self) -> Result<BackupStats, AppError> {
        self.run_with_progress(&SilentReporter).await
    }

    /// Same as [`run`](Self::run), emitting progress events through `reporter`.
    pub async fn run_with_progress<R: ProgressReporter>(
        &self,
        reporter: &R,
    ) -> Result<BackupStats, AppError> {
        let result = self
            .run_cancellable(reporter, CancellationToken::new()) // never cancelled
            .await?;
        Ok(result.stats)
    }

    /// Runs a backup that stops early once `cancel_token` is triggered.
    pub async fn run_cancellable<R: ProgressReporter>(
        &self,
        reporter: &R,
        cancel_token: CancellationToken,
    ) -> Result<BackupResult, AppError> {
        self.check_credentials().await?;

        let datasets = self.catalog.list_datasets().await?;
        reporter.report(BackupEvent::CatalogFetched {
            count: datasets.len(),
        });

        let mut stats = BackupStats::new();
        let mut stopped_early = false;

        for dataset in &datasets {
            if cancel_token.is_cancelled() {
                stopped_early = true;
                break;
            }
            let finished = self
                .backup_dataset(dataset, reporter, &cancel_token, &mut stats)
                .await?;
            if !finished {
                stopped_early = true;
                break;
            }
        }

        // A token cancelled after the last resource was attempted changes nothing.
        if stopped_early {
            reporter.report(BackupEvent::Cancelled { stats: &stats });
            return Ok(BackupResult::cancelled(stats));
        }

        reporter.report(BackupEvent::Completed { stats: &stats });
        Ok(BackupResult::completed(stats))
    }

    /// Probes the store once so that rejected credentials end the run before
    /// any dataset is touched. Other probe failures are left to the
    /// per-dataset handling.
    async fn check_credentials(&self) -> Result<(), AppError> {
        let mut buckets = self.store.list_buckets();
        match buckets.next().await {
            Some(Err(e)) if e.is_fatal() => Err(e),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Storage probe failed, continuing");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Processes one dataset. Only fatal errors are returned.
    /// Backs up the eligible resources of one dataset.
    ///
    /// Returns `false` when cancellation skipped at least one resource.
    async fn backup_dataset<R: ProgressReporter>(
        &self,
        dataset: &Dataset,
        reporter: &R,
        cancel_token: &CancellationToken,
        stats: &mut BackupStats,
    ) -> Result<bool, AppError> {
        if !self.config.accepts_dataset(dataset) {
            stats.record_many(SyncOutcome::Filtered, dataset.resources.len());
            reporter.report(BackupEvent::DatasetFiltered {
                dataset_id: &dataset.id,
            });
            return Ok(true);
        }

        let (eligible, filtered): (Vec<&Resource>, Vec<&Resource>) = dataset
            .resources
            .iter()
            .partition(|r| self.config.accepts_resource(r));
        stats.record_many(SyncOutcome::Filtered, filtered.len());

        // No bucket is created for datasets with nothing to back up.
        if eligible.is_empty() {
            return Ok(true);
        }

        let bucket = dataset.bucket_name();
        reporter.report(BackupEvent::DatasetStarted {
            dataset_id: &dataset.id,
            bucket: &bucket,
            resources: eligible.len(),
        });

        if !self.config.dry_run {
            if let Err(e) = self.store.ensure_bucket(&bucket).await {
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::warn!(
                    dataset = %dataset.id,
                    bucket = %bucket,
                    error = %e,
                    "Failed to ensure bucket, skipping dataset"
                );
                let error = e.to_string();
                reporter.report(BackupEvent::DatasetFailed {
                    dataset_id: &dataset.id,
                    error: &error,
                });
                stats.record_many(SyncOutcome::Failed, eligible.len());
                return Ok(true);
            }
        }

        let bucket_ref = bucket.as_str();
        let results = stream::iter(eligible)
            .map(|resource| async move {
                if cancel_token.is_cancelled() {
                    return None;
                }
                let result = self.backup_resource(dataset, bucket_ref, resource).await;
                Some((resource, result))
            })
            .buffer_unordered(self.config.concurrency.max(1));
        let mut results = std::pin::pin!(results);
        let mut finished = true;

        while let Some(item) = results.next().await {
            let Some((resource, result)) = item else {
                finished = false;
                continue;
            };

            match result {
                Ok(decision) => {
                    stats.record(decision.outcome);
                    reporter.report(BackupEvent::ResourceProcessed {
                        dataset_id: &dataset.id,
                        resource: &resource.title,
                        outcome: decision.outcome,
                        reason: decision.reason,
                    });
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        dataset = %dataset.id,
                        resource = %resource.title,
                        error = %e,
                        "Failed to back up resource"
                    );
                    stats.record(SyncOutcome::Failed);
                    let error = e.to_string();
                    reporter.report(BackupEvent::ResourceFailed {
                        dataset_id: &dataset.id,
                        resource: &resource.title,
                        error: &error,
                    });
                }
            }
        }

        Ok(finished)
    }

    /// Decides and, if needed, uploads a single resource.
    ///
    /// The content object carries the `source-updated` metadata, so a failed
    /// content upload leaves the previous copy and its timestamp in place.
    async fn backup_resource(
        &self,
        dataset: &Dataset,
        bucket: &str,
        resource: &Resource,
    ) -> Result<BackupDecision, AppError> {
        let catalog_updated = resource.updated_at()?;
        let key = resource.object_key();

        let stored = self
            .store
            .get_object_metadata(bucket, &key)
            .await?
            .and_then(|meta| meta.source_updated());

        let decision = needs_backup(stored, catalog_updated);
        if !decision.needs_upload || self.config.dry_run {
            return Ok(decision);
        }

        let url = resource.url.as_deref().ok_or_else(|| {
            AppError::Generic(format!("resource '{}' has no download URL", resource.title))
        })?;

        let content = self.catalog.download(url).await?;
        let size = content.len();
        let metadata = object_user_metadata(dataset, resource, &catalog_updated);
        self.store.put_object(bucket, &key, content, metadata).await?;

        let record = BackupRecord::new(dataset, resource, &catalog_updated, &Utc::now(), size);
        let sidecar = serde_json::to_vec_pretty(&record).map_err(AppError::from);
        let sidecar_result = match sidecar {
            Ok(body) => {
                self.store
                    .put_object(bucket, &resource.sidecar_key(), Bytes::from(body), HashMap::new())
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = sidecar_result {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(
                dataset = %dataset.id,
                resource = %resource.title,
                error = %e,
                "Content uploaded but sidecar write failed"
            );
        }

        Ok(decision)
    }
}
