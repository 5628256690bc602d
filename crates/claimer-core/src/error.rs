use thiserror::Error;

/// Application-wide error types for the claimer.
#[derive(Error, Debug)]
pub enum AppError {
    /// The URL matches none of the known source patterns.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// The server answered 404 for this URL.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP request failed (non-success status or unreadable body).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A rendered page or structured response did not match any expected shape.
    #[error("Parsing failure for {url}: {reason}")]
    ParsingFailure { url: String, reason: ParseFailure },

    /// The rendering collaborator failed (navigation, query, or window handling).
    #[error("Renderer error: {0}")]
    RendererError(String),

    /// Reading or writing the persisted history failed.
    #[error("Store error: {0}")]
    StoreError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid run configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The run was interrupted before it completed.
    #[error("Run cancelled")]
    Cancelled,
}

/// The branch of a classification or extraction that did not match.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("page shape not recognized")]
    UnrecognizedPage,

    #[error("\"Download Now\" control with sale rate {0:?}")]
    InconsistentSaleRate(String),

    #[error("unexpected purchase control text {0:?}")]
    UnexpectedPurchaseControl(String),

    #[error("direct download control missing")]
    MissingDirectDownload,

    #[error("unexpected direct download control text {0:?}")]
    UnexpectedDirectDownload(String),

    #[error("claim button missing")]
    MissingClaimButton,

    #[error("unexpected claim button text {0:?}")]
    UnexpectedClaimButton(String),

    #[error("claim confirmation missing")]
    MissingConfirmation,

    #[error("unexpected claim confirmation {0:?}")]
    UnexpectedConfirmation(String),

    #[error("not a listing url")]
    InvalidListingUrl,

    #[error("malformed thread json: {0}")]
    MalformedThread(String),
}

impl AppError {
    pub fn parsing(url: impl Into<String>, reason: ParseFailure) -> Self {
        AppError::ParsingFailure {
            url: url.into(),
            reason,
        }
    }

    /// Returns true for failures of the network transport itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }

    /// Returns true if the error only concerns the listing being classified
    /// and the run may skip past it.
    pub fn is_per_listing(&self) -> bool {
        matches!(self, AppError::ParsingFailure { .. })
    }
}
