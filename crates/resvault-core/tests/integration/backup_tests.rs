//! Integration tests for BackupService.
//!
//! These tests verify the backup decision and failure policy using mock
//! implementations.

use resvault_core::backup::BackupService;
use resvault_core::models::metadata_keys;
use resvault_core::progress::{BackupEvent, ProgressReporter};
use resvault_core::{AppError, BackupConfig, SilentReporter, SyncStatus};
use tokio_util::sync::CancellationToken;

use crate::integration::common::{MockCatalog, MockObjectStore, dataset, resource, resource_url};

const T1: &str = "2024-05-01T08:00:00Z";
const T2: &str = "2024-06-01T08:00:00Z";

/// Test 1: A resource absent from storage is uploaded once.
///
/// The content object must carry the catalog timestamp, and a JSON sidecar
/// must be written next to it.
#[tokio::test]
async fn test_backup_uploads_absent_resource() {
    // Arrange
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![resource("Réseau urbain GTFS", "GTFS", T1)],
    )]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog.clone(), store.clone());

    // Act
    let stats = service.run().await.unwrap();

    // Assert
    assert_eq!(stats.created, 1, "Should have created 1 object");
    assert_eq!(stats.backed_up(), 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(catalog.download_count(), 1);
    assert_eq!(store.bucket_names(), vec!["dataset_ds1"]);

    let key = "Réseau_urbain_GTFS";
    let stored = store.get("dataset_ds1", key).expect("content object stored");
    assert_eq!(
        stored.content,
        format!("content of {}", resource_url("Réseau urbain GTFS"))
    );
    assert_eq!(
        store.source_updated("dataset_ds1", key).as_deref(),
        Some(T1)
    );
    assert_eq!(
        stored.metadata.get(metadata_keys::DATASET_ID).map(String::as_str),
        Some("ds1")
    );

    let sidecar = store
        .get("dataset_ds1", "_metadata/Réseau_urbain_GTFS.metadata.json")
        .expect("sidecar stored");
    let record: serde_json::Value = serde_json::from_slice(&sidecar.content).unwrap();
    assert_eq!(record["dataset_id"], "ds1");
    assert_eq!(record["updated"], T1);
}

/// Test 2: Running twice against an unchanged catalog uploads nothing the second time.
#[tokio::test]
async fn test_backup_is_idempotent() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![resource("a", "GTFS", T1), resource("b", "NETEX", T1)],
    )]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog.clone(), store.clone());

    let first = service.run().await.unwrap();
    assert_eq!(first.created, 2);
    let puts_after_first = store.put_count();

    let second = service.run().await.unwrap();
    assert_eq!(second.backed_up(), 0, "Second run should upload nothing");
    assert_eq!(second.unchanged, 2);
    assert_eq!(store.put_count(), puts_after_first);
    assert_eq!(catalog.download_count(), 2, "No download on the second run");
}

/// Test 3: A newer catalog timestamp triggers exactly one re-upload.
#[tokio::test]
async fn test_backup_reuploads_stale_resource() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![resource("a", "GTFS", T1), resource("b", "GTFS", T1)],
    )]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog.clone(), store.clone());
    service.run().await.unwrap();

    catalog.set_datasets(vec![dataset(
        "ds1",
        vec![resource("a", "GTFS", T2), resource("b", "GTFS", T1)],
    )]);
    let stats = service.run().await.unwrap();

    assert_eq!(stats.updated, 1);
    assert_eq!(stats.unchanged, 1);
    assert_eq!(store.source_updated("dataset_ds1", "a").as_deref(), Some(T2));
    assert_eq!(store.source_updated("dataset_ds1", "b").as_deref(), Some(T1));
}

/// Test 4: A stored copy newer than the catalog is left alone.
#[tokio::test]
async fn test_backup_skips_newer_stored_copy() {
    let catalog = MockCatalog::new(vec![dataset("ds1", vec![resource("a", "GTFS", T1)])]);
    let store = MockObjectStore::new();
    store.insert(
        "dataset_ds1",
        "a",
        "kept",
        &[(metadata_keys::SOURCE_UPDATED, T2)],
    );
    let service = BackupService::new(catalog.clone(), store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.unchanged, 1);
    assert_eq!(catalog.download_count(), 0);
    assert_eq!(store.get("dataset_ds1", "a").unwrap().content, "kept");
}

/// Test 5: Stored objects without a usable timestamp are treated as absent.
#[tokio::test]
async fn test_backup_overwrites_object_without_timestamp() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![resource("a", "GTFS", T1), resource("b", "GTFS", T1)],
    )]);
    let store = MockObjectStore::new();
    store.insert("dataset_ds1", "a", "legacy", &[]);
    store.insert(
        "dataset_ds1",
        "b",
        "legacy",
        &[(metadata_keys::SOURCE_UPDATED, "not a date")],
    );
    let service = BackupService::new(catalog, store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.created, 2);
    assert_eq!(store.source_updated("dataset_ds1", "a").as_deref(), Some(T1));
    assert_eq!(store.source_updated("dataset_ds1", "b").as_deref(), Some(T1));
}

/// Test 6: An upload failure is counted and later resources are still processed.
#[tokio::test]
async fn test_backup_continues_after_upload_failure() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![
            resource("first", "GTFS", T1),
            resource("broken", "GTFS", T1),
            resource("last", "GTFS", T1),
        ],
    )]);
    let store = MockObjectStore::new();
    store.fail_put("broken");
    let service = BackupService::new(catalog, store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.created, 2);
    assert_eq!(stats.failed, 1);
    assert!(store.get("dataset_ds1", "first").is_some());
    assert!(store.get("dataset_ds1", "broken").is_none());
    assert!(store.get("dataset_ds1", "last").is_some());
}

/// Test 7: A download failure leaves any earlier stored copy untouched.
#[tokio::test]
async fn test_backup_download_failure_keeps_previous_copy() {
    let catalog = MockCatalog::new(vec![dataset("ds1", vec![resource("a", "GTFS", T2)])]);
    catalog.fail_download(&resource_url("a"));
    let store = MockObjectStore::new();
    store.insert(
        "dataset_ds1",
        "a",
        "old",
        &[(metadata_keys::SOURCE_UPDATED, T1)],
    );
    let service = BackupService::new(catalog, store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(store.get("dataset_ds1", "a").unwrap().content, "old");
    assert_eq!(store.source_updated("dataset_ds1", "a").as_deref(), Some(T1));
}

/// Test 8: A resource without a parseable catalog timestamp fails alone.
#[tokio::test]
async fn test_backup_counts_bad_timestamp_as_failure() {
    let mut undated = resource("undated", "GTFS", T1);
    undated.updated = None;
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![undated, resource("garbled", "GTFS", "yesterday"), resource("ok", "GTFS", T1)],
    )]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog, store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.failed, 2);
    assert_eq!(stats.created, 1);
    assert!(store.get("dataset_ds1", "ok").is_some());
}

/// Test 9: An unreachable catalog aborts before any storage write.
#[tokio::test]
async fn test_backup_catalog_unreachable() {
    let catalog = MockCatalog::new(vec![dataset("ds1", vec![resource("a", "GTFS", T1)])]);
    catalog.set_unreachable();
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog, store.clone());

    let result = service.run().await;

    assert!(matches!(result, Err(AppError::NetworkError(_))));
    assert!(store.bucket_names().is_empty(), "No bucket should be created");
    assert_eq!(store.put_count(), 0);
}

/// Test 10: Rejected storage credentials abort the run.
#[tokio::test]
async fn test_backup_rejected_credentials_are_fatal() {
    let catalog = MockCatalog::new(vec![dataset("ds1", vec![resource("a", "GTFS", T1)])]);
    let store = MockObjectStore::new();
    store.reject_credentials();
    let service = BackupService::new(catalog.clone(), store);

    let result = service.run().await;

    match result {
        Err(e) => assert!(e.is_fatal(), "Expected a fatal error, got {}", e),
        Ok(stats) => panic!("Expected failure, got {:?}", stats),
    }
    assert_eq!(catalog.download_count(), 0);
}

/// Test 11: A bucket that cannot be created skips its dataset only.
#[tokio::test]
async fn test_backup_bucket_failure_skips_dataset() {
    let catalog = MockCatalog::new(vec![
        dataset("ds1", vec![resource("a", "GTFS", T1), resource("b", "GTFS", T1)]),
        dataset("ds2", vec![resource("c", "GTFS", T1)]),
    ]);
    let store = MockObjectStore::new();
    store.fail_bucket("dataset_ds1");
    let service = BackupService::new(catalog, store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.failed, 2, "Both resources of ds1 count as failed");
    assert_eq!(stats.created, 1);
    assert!(store.get("dataset_ds2", "c").is_some());
}

/// Test 12: The default filter keeps public-transit GTFS and NeTEx resources only.
#[tokio::test]
async fn test_backup_applies_default_filter() {
    let mut bikes = dataset("bikes", vec![resource("stations", "GTFS", T1)]);
    bikes.dataset_type = Some("bike-sharing".to_string());
    let mut no_url = resource("no-url", "GTFS", T1);
    no_url.url = None;

    let catalog = MockCatalog::new(vec![
        bikes,
        dataset(
            "ds1",
            vec![
                resource("feed", "gtfs", T1),
                resource("readme", "pdf", T1),
                no_url,
            ],
        ),
        dataset("empty", vec![resource("doc", "csv", T1)]),
    ]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog, store.clone());

    let stats = service.run().await.unwrap();

    assert_eq!(stats.created, 1);
    assert_eq!(stats.filtered, 4);
    assert_eq!(stats.total(), 5);
    assert_eq!(
        store.bucket_names(),
        vec!["dataset_ds1"],
        "Datasets without eligible resources get no bucket"
    );
}

/// Test 13: Dry runs decide without downloading or writing anything.
#[tokio::test]
async fn test_backup_dry_run_writes_nothing() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![resource("a", "GTFS", T1), resource("b", "GTFS", T2)],
    )]);
    let store = MockObjectStore::new();
    store.insert(
        "dataset_ds1",
        "a",
        "current",
        &[(metadata_keys::SOURCE_UPDATED, T1)],
    );
    let config = BackupConfig::default().with_dry_run();
    let service = BackupService::with_config(catalog.clone(), store.clone(), config);

    let stats = service.run().await.unwrap();

    assert_eq!(stats.unchanged, 1);
    assert_eq!(stats.created, 1, "Absent resource is reported as to be created");
    assert_eq!(catalog.download_count(), 0);
    assert_eq!(store.put_count(), 0);
    assert!(store.get("dataset_ds1", "b").is_none());
}

/// Test 14: Concurrent processing yields the same result as sequential.
#[tokio::test]
async fn test_backup_with_concurrency() {
    let resources = (0..8)
        .map(|i| resource(&format!("feed {}", i), "GTFS", T1))
        .collect();
    let catalog = MockCatalog::new(vec![dataset("ds1", resources)]);
    let store = MockObjectStore::new();
    store.fail_put("feed_3");
    let config = BackupConfig::default().with_concurrency(4);
    let service = BackupService::with_config(catalog, store.clone(), config);

    let stats = service.run().await.unwrap();

    assert_eq!(stats.created, 7);
    assert_eq!(stats.failed, 1);
    assert!(store.get("dataset_ds1", "feed_7").is_some());
}

/// Test 15: A token cancelled up front stops the run before any dataset.
#[tokio::test]
async fn test_backup_cancelled_before_start() {
    let catalog = MockCatalog::new(vec![dataset("ds1", vec![resource("a", "GTFS", T1)])]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog, store.clone());

    let token = CancellationToken::new();
    token.cancel();
    let result = service
        .run_cancellable(&SilentReporter, token)
        .await
        .unwrap();

    assert_eq!(result.status, SyncStatus::Cancelled);
    assert_eq!(result.stats.total(), 0);
    assert_eq!(store.put_count(), 0);
}

/// Reporter that cancels the run once the first resource is processed.
struct CancelAfterFirst {
    token: CancellationToken,
}

impl ProgressReporter for CancelAfterFirst {
    fn report(&self, event: BackupEvent<'_>) {
        if let BackupEvent::ResourceProcessed { .. } = event {
            self.token.cancel();
        }
    }
}

/// Test 16: Cancelling mid-run keeps the work already done.
#[tokio::test]
async fn test_backup_cancelled_mid_run() {
    let catalog = MockCatalog::new(vec![
        dataset("ds1", vec![resource("a", "GTFS", T1)]),
        dataset("ds2", vec![resource("b", "GTFS", T1)]),
    ]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog, store.clone());

    let token = CancellationToken::new();
    let reporter = CancelAfterFirst {
        token: token.clone(),
    };
    let result = service.run_cancellable(&reporter, token).await.unwrap();

    assert!(result.is_cancelled());
    assert_eq!(result.stats.created, 1);
    assert!(store.get("dataset_ds1", "a").is_some());
    assert!(store.bucket_names().iter().all(|b| b != "dataset_ds2"));
}

/// Test 17: A resource titled like a sidecar keeps its own object and timestamp.
#[tokio::test]
async fn test_backup_resource_named_like_sidecar_is_idempotent() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![
            resource("a.metadata.json", "GTFS", T1),
            resource("a", "GTFS", T1),
        ],
    )]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog.clone(), store.clone());

    let first = service.run().await.unwrap();
    assert_eq!(first.created, 2);

    let second = service.run().await.unwrap();
    assert_eq!(second.backed_up(), 0, "Sidecar of 'a' must not clobber 'a.metadata.json'");
    assert_eq!(second.unchanged, 2);
    assert_eq!(catalog.download_count(), 2);
    assert_eq!(
        store.source_updated("dataset_ds1", "a.metadata.json").as_deref(),
        Some(T1)
    );
    assert!(store.get("dataset_ds1", "_metadata/a.metadata.json").is_some());
    assert!(
        store
            .get("dataset_ds1", "_metadata/a.metadata.json.metadata.json")
            .is_some()
    );
}

/// Test 18: A token fired after the last resource still reports a completed run.
#[tokio::test]
async fn test_backup_cancelled_after_last_resource_completes() {
    let catalog = MockCatalog::new(vec![dataset("ds1", vec![resource("a", "GTFS", T1)])]);
    let store = MockObjectStore::new();
    let service = BackupService::new(catalog, store.clone());

    let token = CancellationToken::new();
    let reporter = CancelAfterFirst {
        token: token.clone(),
    };
    let result = service
        .run_cancellable(&reporter, token.clone())
        .await
        .unwrap();

    assert!(token.is_cancelled());
    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.stats.created, 1);
}

/// Test 19: Cancelling inside a dataset skips its remaining resources.
#[tokio::test]
async fn test_backup_cancelled_inside_dataset() {
    let catalog = MockCatalog::new(vec![dataset(
        "ds1",
        vec![resource("a", "GTFS", T1), resource("b", "GTFS", T1)],
    )]);
    let store = MockObjectStore::new();
    let config = BackupConfig::default().with_concurrency(1);
    let service = BackupService::with_config(catalog, store.clone(), config);
    assert_eq!(service.config().concurrency, 1);

    let token = CancellationToken::new();
    let reporter = CancelAfterFirst {
        token: token.clone(),
    };
    let result = service.run_cancellable(&reporter, token).await.unwrap();

    assert_eq!(result.status, SyncStatus::Cancelled);
    assert_eq!(result.stats.created, 1);
    assert_eq!(result.stats.total(), 1, "Skipped resources are not counted");
}
