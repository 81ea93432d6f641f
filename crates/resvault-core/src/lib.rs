//! Resvault Core - Domain types, business logic, and services.
//!
//! This crate provides the core functionality for Resvault, including:
//!
//! - **Domain models**: [`Dataset`], [`Resource`], [`ObjectMetadata`], etc.
//! - **Business logic**: Staleness detection, statistics tracking, backup filtering
//! - **Services**: [`BackupService`] for catalog-to-storage backup, [`ListingService`] for storage inventory
//! - **Traits**: [`CatalogClient`], [`ObjectStore`] for dependency injection
//! - **Progress reporting**: [`ProgressReporter`] trait for decoupled logging/UI
//!
//! # Architecture
//!
//! This crate is designed to be reusable by different frontends. Business
//! logic is decoupled from I/O concerns through traits:
//!
//! - [`CatalogClient`] - abstracts catalog access (e.g., transport.data.gouv.fr)
//! - [`ObjectStore`] - abstracts S3-compatible storage (e.g., Cellar)
//!
//! # Example
//!
//! ```ignore
//! use resvault_core::{BackupService, ListingService};
//! use resvault_core::progress::TracingReporter;
//!
//! let backup = BackupService::new(catalog, store.clone());
//! let stats = backup.run_with_progress(&TracingReporter).await?;
//!
//! let listing = ListingService::new(store);
//! let summary = listing.report(&TracingReporter).await?;
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod listing;
pub mod models;
pub mod progress;
pub mod sync;
pub mod traits;

// Configuration
pub use config::{
    BackupConfig, CatalogConfig, ResvaultConfig, StorageConfig, default_config_path, load_config,
};

// Error handling
pub use error::AppError;

// Domain models
pub use models::{
    BackupRecord, BucketSummary, Dataset, InventoryItem, ObjectMetadata, ObjectSummary, Resource,
};

// Sync types and business logic
pub use sync::{
    BackupDecision, BackupResult, BackupStats, ResourceState, SyncOutcome, SyncStatus,
    needs_backup,
};

// Progress reporting
pub use progress::{BackupEvent, ListingEvent, ProgressReporter, SilentReporter, TracingReporter};

// Traits for dependency injection
pub use traits::{CatalogClient, ObjectStore};

// Services (generic over trait implementations)
pub use backup::BackupService;
pub use listing::{ListingService, ListingSummary};
