use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while backing up
/// catalog resources. It uses the `thiserror` crate for ergonomic error handling.
///
/// The orchestrator relies on these variants to decide whether a failure is
/// local to a resource (logged and counted) or fatal to the whole run
/// (see [`AppError::is_fatal`]).
///
/// # Examples
///
/// ```no_run
/// use resvault_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Network or connection error.
    ///
    /// This error occurs when a network request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    ///
    /// This error occurs when a request takes longer than the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The remote service answered with a non-success HTTP status.
    #[error("API error: HTTP {status} from {url}")]
    ApiError {
        /// HTTP status code returned.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// A response body or a stored value could not be parsed.
    ///
    /// Covers malformed catalog JSON and timestamps that are neither
    /// RFC 3339 nor ISO 8601.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A bucket or object operation failed.
    #[error("Storage error during {operation} on {target}: {message}")]
    StorageError {
        /// The storage operation, e.g. `put_object`.
        operation: &'static str,
        /// Bucket or `bucket/key` the operation targeted.
        target: String,
        /// Message reported by the storage client.
        message: String,
    },

    /// The storage service rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// JSON serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration file error.
    ///
    /// This error occurs when reading or parsing the configuration file fails,
    /// such as when resvault.toml is malformed or contains invalid values.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Builds a [`AppError::StorageError`] from any displayable client error.
    pub fn storage(
        operation: &'static str,
        target: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        AppError::StorageError {
            operation,
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The catalog may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::ApiError { status, url } => {
                format!(
                    "The server answered HTTP {} for {}.\n   The catalog may be temporarily unavailable.",
                    status, url
                )
            }
            AppError::AuthenticationFailed(msg) => {
                format!(
                    "Storage rejected the credentials: {}\n   Check --api-key and --secret-key.",
                    msg
                )
            }
            AppError::ConfigError(msg) => {
                format!(
                    "Configuration error: {}\n   Check your configuration file.",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error must abort the whole run.
    ///
    /// Only credential failures qualify: every remaining storage call would
    /// fail the same way.
    ///
    /// # Examples
    ///
    /// ```
    /// use resvault_core::error::AppError;
    ///
    /// let err = AppError::AuthenticationFailed("InvalidAccessKeyId".to_string());
    /// assert!(err.is_fatal());
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(!err.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::AuthenticationFailed(_))
    }

    /// Returns true for connectivity failures (unreachable host, timeout).
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::NetworkError(_) | AppError::Timeout(_))
    }
}
