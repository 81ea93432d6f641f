//! Sync service layer for backup decisions.
//!
//! This module provides pure business logic for staleness detection and backup
//! statistics, decoupled from I/O operations and CLI orchestration.

use chrono::{DateTime, Utc};

/// Outcome of processing a single resource during a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Stored copy is at least as recent as the catalog - nothing uploaded
    Unchanged,
    /// Stored copy was older than the catalog - new version uploaded
    Updated,
    /// No stored copy - first upload
    Created,
    /// Processing failed for this resource
    Failed,
    /// Excluded by the backup filter or missing a download URL
    Filtered,
}

/// Statistics for a backup run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupStats {
    pub unchanged: usize,
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
    pub filtered: usize,
}

impl BackupStats {
    /// Creates a new empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Failed => self.failed += 1,
            SyncOutcome::Filtered => self.filtered += 1,
        }
    }

    /// Records the same outcome `n` times.
    pub fn record_many(&mut self, outcome: SyncOutcome, n: usize) {
        for _ in 0..n {
            self.record(outcome);
        }
    }

    /// Resources uploaded during the run.
    pub fn backed_up(&self) -> usize {
        self.created + self.updated
    }

    /// Resources found up to date.
    pub fn skipped(&self) -> usize {
        self.unchanged
    }

    /// Resources the run considered, filtered ones excluded.
    pub fn eligible(&self) -> usize {
        self.unchanged + self.updated + self.created + self.failed
    }

    /// Returns the total number of resources seen in the catalog.
    pub fn total(&self) -> usize {
        self.eligible() + self.filtered
    }
}

/// Final status of a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Completed,
    Cancelled,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Completed => "completed",
            SyncStatus::Cancelled => "cancelled",
        }
    }
}

/// Statistics plus status of a finished (or cancelled) run.
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub stats: BackupStats,
    pub status: SyncStatus,
}

impl BackupResult {
    pub fn completed(stats: BackupStats) -> Self {
        Self {
            stats,
            status: SyncStatus::Completed,
        }
    }

    pub fn cancelled(stats: BackupStats) -> Self {
        Self {
            stats,
            status: SyncStatus::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SyncStatus::Cancelled
    }
}

/// State of the stored copy relative to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing usable stored yet.
    Absent,
    /// Stored copy is strictly older than the catalog version.
    Stale,
    /// Stored copy is as recent as, or newer than, the catalog version.
    Current,
}

/// Result of staleness detection for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDecision {
    pub state: ResourceState,
    /// Whether the resource must be downloaded and uploaded
    pub needs_upload: bool,
    /// The outcome classification once the upload (if any) succeeds
    pub outcome: SyncOutcome,
    /// Human-readable reason for the decision
    pub reason: &'static str,
}

/// Decides whether a resource needs backing up.
///
/// # Arguments
/// * `stored` - The `source-updated` timestamp of the stored copy (None if absent)
/// * `catalog` - The catalog's last-modified timestamp for the resource
pub fn needs_backup(stored: Option<DateTime<Utc>>, catalog: DateTime<Utc>) -> BackupDecision {
    match stored {
        Some(stored) if stored >= catalog => BackupDecision {
            state: ResourceState::Current,
            needs_upload: false,
            outcome: SyncOutcome::Unchanged,
            reason: "stored copy is up to date",
        },
        Some(_) => BackupDecision {
            state: ResourceState::Stale,
            needs_upload: true,
            outcome: SyncOutcome::Updated,
            reason: "catalog version is newer",
        },
        None => BackupDecision {
            state: ResourceState::Absent,
            needs_upload: true,
            outcome: SyncOutcome::Created,
            reason: "no stored copy",
        },
    }
}
