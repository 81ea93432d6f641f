//! Progress reporting for backup and listing runs.
//!
//! Services emit [`BackupEvent`]s and [`ListingEvent`]s through a reporter so
//! that the CLI can log them while tests stay silent.

use tracing::{debug, info, warn};

use crate::models::{BucketSummary, ObjectSummary};
use crate::sync::{BackupStats, SyncOutcome};

/// Events emitted by [`BackupService`](crate::backup::BackupService).
#[derive(Debug, Clone)]
pub enum BackupEvent<'a> {
    /// The catalog answered with `count` datasets.
    CatalogFetched { count: usize },
    /// A dataset passed the filter and is about to be processed.
    DatasetStarted {
        dataset_id: &'a str,
        bucket: &'a str,
        resources: usize,
    },
    /// A dataset was skipped by the type filter.
    DatasetFiltered { dataset_id: &'a str },
    /// The dataset's bucket could not be ensured; its resources were not processed.
    DatasetFailed { dataset_id: &'a str, error: &'a str },
    /// A resource reached its final outcome.
    ResourceProcessed {
        dataset_id: &'a str,
        resource: &'a str,
        outcome: SyncOutcome,
        reason: &'a str,
    },
    /// A resource failed; processing continues with the next one.
    ResourceFailed {
        dataset_id: &'a str,
        resource: &'a str,
        error: &'a str,
    },
    /// The run finished.
    Completed { stats: &'a BackupStats },
    /// The run was cancelled before visiting every dataset.
    Cancelled { stats: &'a BackupStats },
}

/// Events emitted by [`ListingService`](crate::listing::ListingService).
#[derive(Debug, Clone)]
pub enum ListingEvent<'a> {
    Bucket(&'a BucketSummary),
    Object {
        bucket: &'a str,
        object: &'a ObjectSummary,
    },
}

/// Trait for reporting progress events.
pub trait ProgressReporter: Send + Sync {
    /// Called when a backup event occurs.
    ///
    /// The default implementation does nothing (silent mode).
    fn report(&self, event: BackupEvent<'_>) {
        let _ = event;
    }

    /// Called for every bucket and object enumerated by the lister.
    fn report_listing(&self, event: ListingEvent<'_>) {
        let _ = event;
    }
}

/// Silent reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Tracing-based reporter for CLI logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: BackupEvent<'_>) {
        match event {
            BackupEvent::CatalogFetched { count } => {
                info!(datasets = count, "Fetched catalog");
            }
            BackupEvent::DatasetStarted {
                dataset_id,
                bucket,
                resources,
            } => {
                debug!(dataset = dataset_id, bucket, resources, "Processing dataset");
            }
            BackupEvent::DatasetFiltered { dataset_id } => {
                debug!(dataset = dataset_id, "Dataset not selected for backup");
            }
            BackupEvent::DatasetFailed { dataset_id, error } => {
                debug!(dataset = dataset_id, error, "Skipping dataset");
            }
            BackupEvent::ResourceProcessed {
                dataset_id,
                resource,
                outcome,
                reason,
            } => match outcome {
                SyncOutcome::Created | SyncOutcome::Updated => {
                    info!(dataset = dataset_id, resource, reason, "Backed up resource");
                }
                _ => {
                    debug!(dataset = dataset_id, resource, reason, ?outcome, "Skipped resource");
                }
            },
            BackupEvent::ResourceFailed {
                dataset_id,
                resource,
                error,
            } => {
                debug!(dataset = dataset_id, resource, error, "Resource failed");
            }
            BackupEvent::Completed { stats } => {
                info!(
                    backed_up = stats.backed_up(),
                    skipped = stats.skipped(),
                    failed = stats.failed,
                    filtered = stats.filtered,
                    "Backup completed"
                );
            }
            BackupEvent::Cancelled { stats } => {
                warn!(
                    backed_up = stats.backed_up(),
                    skipped = stats.skipped(),
                    failed = stats.failed,
                    "Backup cancelled - partial progress kept"
                );
            }
        }
    }

    fn report_listing(&self, event: ListingEvent<'_>) {
        match event {
            ListingEvent::Bucket(bucket) => {
                info!("* bucket {}", bucket.name);
            }
            ListingEvent::Object { object, .. } => {
                let modified = object
                    .last_modified
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                info!(
                    "  - {} ({} -- size = {} -- etag = {})",
                    object.key,
                    modified,
                    object.size,
                    object.e_tag.as_deref().unwrap_or("-")
                );
            }
        }
    }
}
