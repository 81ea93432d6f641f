//! Client for the transport.data.gouv.fr dataset catalog.
//!
//! The catalog publishes every dataset in a single JSON array at
//! `/api/datasets`; there is no pagination. Resource downloads go through the
//! same HTTP client so that the configured timeout and user agent apply.

use bytes::Bytes;
use reqwest::{Client, Url};
use resvault_core::CatalogConfig;
use resvault_core::error::AppError;
use resvault_core::models::{Dataset, Resource};
use resvault_core::traits::CatalogClient;
use serde::Deserialize;
use serde_json::Value;

/// Data Transfer Object for a catalog dataset.
///
/// # Examples
///
/// ```
/// use resvault_client::catalog::CatalogDataset;
///
/// let json = r#"{
///     "datagouv_id": "5b3c2a",
///     "title": "Réseau urbain",
///     "type": "public-transit",
///     "resources": [
///         {"title": "GTFS", "url": "https://example.com/gtfs.zip", "format": "GTFS", "updated": "2024-01-01T00:00:00Z", "filesize": 1024}
///     ]
/// }"#;
///
/// let dataset: CatalogDataset = serde_json::from_str(json).unwrap();
/// assert_eq!(dataset.datagouv_id.as_deref(), Some("5b3c2a"));
/// assert!(dataset.resources[0].extras.contains_key("filesize"));
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct CatalogDataset {
    pub datagouv_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub dataset_type: Option<String>,
    #[serde(default)]
    pub resources: Vec<CatalogResource>,
}

/// Data Transfer Object for a catalog resource.
///
/// Fields other than the ones used for the backup decision are kept in
/// `extras` and end up in the sidecar.
#[derive(Deserialize, Debug, Clone)]
pub struct CatalogResource {
    #[serde(default)]
    pub title: String,
    pub url: Option<String>,
    pub format: Option<String>,
    pub updated: Option<String>,
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

impl From<CatalogResource> for Resource {
    fn from(r: CatalogResource) -> Self {
        Resource {
            title: r.title,
            url: r.url,
            format: r.format,
            updated: r.updated,
            extras: r.extras,
        }
    }
}

impl CatalogDataset {
    /// Converts into the domain type; `None` when the dataset has no identifier.
    pub fn into_dataset(self) -> Option<Dataset> {
        let id = self.datagouv_id.filter(|id| !id.trim().is_empty())?;
        Some(Dataset {
            id,
            title: self.title,
            dataset_type: self.dataset_type,
            resources: self.resources.into_iter().map(Resource::from).collect(),
        })
    }
}

/// HTTP client for the dataset catalog.
///
/// # Examples
///
/// ```no_run
/// use resvault_client::TransportCatalogClient;
/// use resvault_core::CatalogConfig;
/// use resvault_core::traits::CatalogClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TransportCatalogClient::new(&CatalogConfig::default())?;
/// let datasets = client.list_datasets().await?;
/// println!("Found {} datasets", datasets.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TransportCatalogClient {
    client: Client,
    catalog_url: Url,
    timeout_secs: u64,
}

impl TransportCatalogClient {
    /// Creates a client for the catalog configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the catalog URL is malformed.
    /// Returns `AppError::NetworkError` if the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, AppError> {
        let catalog_url =
            Url::parse(&config.url).map_err(|_| AppError::InvalidUrl(config.url.clone()))?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::NetworkError(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            catalog_url,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn catalog_url(&self) -> &Url {
        &self.catalog_url
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, AppError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::ApiError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    fn map_request_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {}", e))
        } else {
            AppError::NetworkError(e.to_string())
        }
    }
}

/// Parses the catalog body, dropping datasets without an identifier.
fn parse_catalog(body: &[u8]) -> Result<Vec<Dataset>, AppError> {
    let raw: Vec<CatalogDataset> = serde_json::from_slice(body)
        .map_err(|e| AppError::ParseError(format!("Invalid catalog response: {}", e)))?;

    let total = raw.len();
    let datasets: Vec<Dataset> = raw
        .into_iter()
        .filter_map(CatalogDataset::into_dataset)
        .collect();

    if datasets.len() < total {
        tracing::warn!(
            skipped = total - datasets.len(),
            "Ignoring catalog datasets without datagouv_id"
        );
    }
    Ok(datasets)
}

impl CatalogClient for TransportCatalogClient {
    async fn list_datasets(&self) -> Result<Vec<Dataset>, AppError> {
        tracing::debug!(url = %self.catalog_url, "Fetching catalog");
        let resp = self.get(self.catalog_url.clone()).await?;
        let body = resp.bytes().await.map_err(|e| self.map_request_error(e))?;
        parse_catalog(&body)
    }

    async fn download(&self, url: &str) -> Result<Bytes, AppError> {
        let parsed = Url::parse(url).map_err(|_| AppError::InvalidUrl(url.to_string()))?;
        let resp = self.get(parsed).await?;
        let content = resp.bytes().await.map_err(|e| self.map_request_error(e))?;
        tracing::debug!(url, bytes = content.len(), "Downloaded resource");
        Ok(content)
    }
}
