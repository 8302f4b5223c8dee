//! Error type definitions for meeple-core
//!
//! Errors are layered: the transport reports what went wrong on the wire, the
//! catalog wraps that into fetch or search failures, and parse errors stay
//! per-game so a batch can report them next to its successes.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Catalog layer errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while talking to the remote catalog over HTTP
#[derive(Error, Debug)]
pub enum TransportError {
    /// Non-success HTTP status
    #[error("HTTP error: {status} - {url}")]
    Status { status: u16, url: String },

    /// Upstream asked us to slow down (HTTP 429)
    #[error("Rate limited by {url} - retry after {retry_after:?} seconds")]
    RateLimited { url: String, retry_after: Option<u64> },

    /// Connection, timeout or other request-level failures
    #[error("Request failed: {url} - {message}")]
    Request { url: String, message: String },

    /// Response body could not be decoded
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// Request URL could not be built from the configured base URL
    #[error("Invalid URL: {url} - {message}")]
    InvalidUrl { url: String, message: String },
}

/// Per-game problems found while translating a remote record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameParseError {
    /// A required field was absent or empty
    #[error("Game {id}: missing required field '{field}'")]
    MissingField { id: String, field: &'static str },

    /// A required field was present but unusable
    #[error("Game {id}: invalid value '{value}' for field '{field}'")]
    InvalidField {
        id: String,
        field: &'static str,
        value: String,
    },

    /// The remote answered but did not include this id
    #[error("Game {id}: not returned by the catalog")]
    NotReturned { id: String },
}

impl GameParseError {
    /// Id of the game this error refers to
    pub fn id(&self) -> &str {
        match self {
            Self::MissingField { id, .. }
            | Self::InvalidField { id, .. }
            | Self::NotReturned { id } => id,
        }
    }
}

/// Errors surfaced by the game catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Batch exceeds the upstream id limit; raised before any I/O
    #[error("Too many ids requested: {requested} (max: {max})")]
    TooManyIds { requested: usize, max: usize },

    /// Fetching game details failed
    #[error("Game fetch failed: {message}")]
    Fetch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Searching games by name failed
    #[error("Game search failed: {message}")]
    Search {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl CatalogError {
    /// Create a fetch error without an underlying cause
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fetch error wrapping its cause
    pub fn fetch_caused_by<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search error wrapping its cause
    pub fn search_caused_by<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Search {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the failure happened before any network activity
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::TooManyIds { .. })
    }
}
