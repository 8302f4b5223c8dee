//! Remote board game catalog (BoardGameGeek XML API)
//!
//! [`GameCatalog`] resolves game ids and name searches through two caches in
//! front of a pluggable [`CatalogTransport`]. XML translation lives in
//! [`parser`] and search relevance in [`ranking`].

pub mod cache;
pub mod models;
pub mod parser;
pub mod ranking;
pub mod repository;
pub mod transport;

pub use cache::{CacheStats, Clock, ManualClock, SystemClock, TtlLruCache};
pub use models::{Game, GameBatch, GameSearchResult};
pub use repository::{CatalogStats, GameCatalog, MAX_IDS_PER_REQUEST, SearchKey};
pub use transport::{CatalogTransport, HttpCatalogTransport};
