//! Centralized error handling for meeple-core
//!
//! The clustering engine has no failure modes, so every error here belongs to
//! the catalog side or to application setup.
//!
//! # Error Categories
//!
//! - **Transport Errors**: HTTP status failures, rate limiting, network issues
//! - **Catalog Errors**: batch validation, fetch and search failures
//! - **Parse Errors**: per-game record problems collected during batch fetches
//! - **Application Errors**: configuration and other top-level failures
//!
//! # Usage
//!
//! ```rust
//! use meeple_core::errors::{CatalogError, CatalogResult};
//!
//! fn check_batch(ids: &[&str]) -> CatalogResult<()> {
//!     if ids.len() > 20 {
//!         return Err(CatalogError::TooManyIds { requested: ids.len(), max: 20 });
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Convenience type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
