//! Domain models shared by the catalog client, the storage client and the services.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// User-metadata keys attached to every backed-up object.
pub mod metadata_keys {
    /// Catalog last-modified timestamp of the backed-up version (RFC 3339, UTC).
    pub const SOURCE_UPDATED: &str = "source-updated";
    /// Download URL the content was fetched from.
    pub const SOURCE_URL: &str = "source-url";
    /// Catalog identifier of the owning dataset.
    pub const DATASET_ID: &str = "dataset-id";
}

/// Key prefix under which JSON sidecars are stored.
///
/// Content keys never contain `/`, so nothing under this prefix can collide
/// with a content object.
pub const SIDECAR_PREFIX: &str = "_metadata/";

/// Suffix of the JSON sidecar describing each content object.
pub const SIDECAR_SUFFIX: &str = ".metadata.json";

/// A catalog dataset, mapped 1:1 to a storage bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Catalog identifier (`datagouv_id`).
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Catalog dataset type, e.g. `public-transit`.
    pub dataset_type: Option<String>,
    /// Resources published under this dataset.
    pub resources: Vec<Resource>,
}

impl Dataset {
    /// Returns the bucket that holds this dataset's resources.
    ///
    /// # Examples
    ///
    /// ```
    /// use resvault_core::models::Dataset;
    ///
    /// let dataset = Dataset {
    ///     id: "5b3c2a".to_string(),
    ///     title: "Réseau urbain".to_string(),
    ///     dataset_type: None,
    ///     resources: vec![],
    /// };
    /// assert_eq!(dataset.bucket_name(), "dataset_5b3c2a");
    /// ```
    pub fn bucket_name(&self) -> String {
        format!("dataset_{}", self.id)
    }
}

/// A single downloadable file of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource name as published in the catalog.
    pub title: String,
    /// Download URL; resources without one cannot be backed up.
    pub url: Option<String>,
    /// Declared format, e.g. `GTFS`.
    pub format: Option<String>,
    /// Raw catalog last-modified timestamp.
    pub updated: Option<String>,
    /// All other fields returned by the catalog, kept for the sidecar.
    pub extras: serde_json::Map<String, Value>,
}

impl Resource {
    /// Derives the object key from the resource title.
    ///
    /// Spaces, slashes and apostrophes become underscores. Resources with an
    /// empty title fall back to their URL.
    pub fn object_key(&self) -> String {
        let source = if self.title.trim().is_empty() {
            self.url.as_deref().unwrap_or("unnamed")
        } else {
            self.title.as_str()
        };
        sanitize_key(source)
    }

    /// Key of the JSON sidecar describing this resource.
    pub fn sidecar_key(&self) -> String {
        format!("{}{}{}", SIDECAR_PREFIX, self.object_key(), SIDECAR_SUFFIX)
    }

    /// Parses the catalog timestamp.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ParseError` when the catalog omitted the timestamp
    /// or it is not a recognized date-time format.
    pub fn updated_at(&self) -> Result<DateTime<Utc>, AppError> {
        let raw = self.updated.as_deref().ok_or_else(|| {
            AppError::ParseError(format!("resource '{}' has no update timestamp", self.title))
        })?;
        parse_timestamp(raw)
    }
}

fn sanitize_key(raw: &str) -> String {
    raw.trim().replace([' ', '/', '\''], "_")
}

/// Parses a catalog or stored timestamp into UTC.
///
/// Accepts RFC 3339 and ISO 8601 date-times without offset, the latter read as UTC.
///
/// # Examples
///
/// ```
/// use resvault_core::models::parse_timestamp;
///
/// let a = parse_timestamp("2024-03-01T10:00:00+01:00").unwrap();
/// let b = parse_timestamp("2024-03-01T09:00:00").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::ParseError(format!("unrecognized timestamp '{}'", raw)))
}

/// Formats a timestamp the way it is stored in object metadata.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Metadata of a stored object, as returned by a head request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMetadata {
    /// User metadata attached at upload time (without the `x-amz-meta-` prefix).
    pub user: HashMap<String, String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub e_tag: Option<String>,
}

impl ObjectMetadata {
    /// Returns the recorded catalog timestamp, or None when absent or unparseable.
    pub fn source_updated(&self) -> Option<DateTime<Utc>> {
        self.user
            .get(metadata_keys::SOURCE_UPDATED)
            .and_then(|raw| parse_timestamp(raw).ok())
    }
}

/// A bucket as seen by the lister.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSummary {
    pub name: String,
    pub created: Option<DateTime<Utc>>,
}

/// An object as seen by the lister.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub e_tag: Option<String>,
}

/// One item of the storage inventory, buckets first then their objects.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryItem {
    Bucket(BucketSummary),
    Object {
        bucket: String,
        object: ObjectSummary,
    },
}

/// Contents of the JSON sidecar describing a backed-up resource.
#[derive(Debug, Clone, Serialize)]
pub struct BackupRecord<'a> {
    pub dataset_id: &'a str,
    pub dataset_title: &'a str,
    pub resource_title: &'a str,
    pub url: Option<&'a str>,
    pub format: Option<&'a str>,
    pub updated: String,
    pub backed_up_at: String,
    pub size: usize,
    pub catalog: &'a serde_json::Map<String, Value>,
}

impl<'a> BackupRecord<'a> {
    /// Builds the sidecar record for a resource backed up at `now`.
    pub fn new(
        dataset: &'a Dataset,
        resource: &'a Resource,
        updated: &DateTime<Utc>,
        now: &DateTime<Utc>,
        size: usize,
    ) -> Self {
        Self {
            dataset_id: &dataset.id,
            dataset_title: &dataset.title,
            resource_title: &resource.title,
            url: resource.url.as_deref(),
            format: resource.format.as_deref(),
            updated: format_timestamp(updated),
            backed_up_at: format_timestamp(now),
            size,
            catalog: &resource.extras,
        }
    }
}

/// Builds the user metadata attached to a content object.
pub fn object_user_metadata(
    dataset: &Dataset,
    resource: &Resource,
    updated: &DateTime<Utc>,
) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert(
        metadata_keys::SOURCE_UPDATED.to_string(),
        format_timestamp(updated),
    );
    metadata.insert(metadata_keys::DATASET_ID.to_string(), dataset.id.clone());
    if let Some(url) = &resource.url {
        metadata.insert(metadata_keys::SOURCE_URL.to_string(), url.clone());
    }
    metadata
}
