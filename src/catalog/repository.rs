//! Cache-first access to the remote game catalog
//!
//! Game details and name searches each go through their own TTL + LRU cache.
//! Only cache misses reach the network, batched into a single `thing`
//! request, and only successful results are ever cached.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::{CacheStats, Clock, SystemClock, TtlLruCache};
use super::models::{Game, GameBatch, GameSearchResult};
use super::parser::{parse_search_document, parse_thing_document};
use super::ranking::rank_results;
use super::transport::{CatalogTransport, HttpCatalogTransport};
use crate::config::{CacheConfig, Config};
use crate::errors::{
    AppResult, CatalogError, CatalogResult, GameParseError, TransportError, TransportResult,
};

/// Upstream limit on ids per `thing` request
pub const MAX_IDS_PER_REQUEST: usize = 20;

const THING_RESOURCE: &str = "thing";
const SEARCH_RESOURCE: &str = "search";
const SEARCH_TYPE: &str = "boardgame";

/// Search cache key. The query is trimmed, and lowercased when matching
/// ignores case, so equivalent queries share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    query: String,
    ignore_case: bool,
    max_results: usize,
}

impl SearchKey {
    pub fn new(query: &str, max_results: usize, ignore_case: bool) -> Self {
        let query = query.trim();
        Self {
            query: if ignore_case {
                query.to_lowercase()
            } else {
                query.to_string()
            },
            ignore_case,
            max_results,
        }
    }
}

/// Counters for both catalog caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub games: CacheStats,
    pub searches: CacheStats,
}

pub struct GameCatalog {
    transport: Arc<dyn CatalogTransport>,
    base_url: Url,
    game_cache: TtlLruCache<String, Game>,
    search_cache: TtlLruCache<SearchKey, Vec<GameSearchResult>>,
}

impl GameCatalog {
    /// Build a catalog backed by the HTTP transport
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let transport = HttpCatalogTransport::from_config(&config.catalog)?;
        Self::new(Arc::new(transport), config.catalog.base_url()?, &config.cache)
    }

    pub fn new(
        transport: Arc<dyn CatalogTransport>,
        base_url: Url,
        cache: &CacheConfig,
    ) -> AppResult<Self> {
        Self::with_clock(transport, base_url, cache, Arc::new(SystemClock))
    }

    /// Same as [`GameCatalog::new`] with both caches reading time from `clock`
    pub fn with_clock(
        transport: Arc<dyn CatalogTransport>,
        base_url: Url,
        cache: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let game_cache = TtlLruCache::with_clock(
            "game",
            cache.game_capacity()?,
            cache.game_ttl,
            clock.clone(),
        );
        let search_cache = TtlLruCache::with_clock(
            "search",
            cache.search_capacity()?,
            cache.search_ttl,
            clock,
        );
        Ok(Self::with_caches(transport, base_url, game_cache, search_cache))
    }

    pub fn with_caches(
        transport: Arc<dyn CatalogTransport>,
        base_url: Url,
        game_cache: TtlLruCache<String, Game>,
        search_cache: TtlLruCache<SearchKey, Vec<GameSearchResult>>,
    ) -> Self {
        info!(
            "Game catalog at {} (game ttl {:?}, search ttl {:?})",
            base_url,
            game_cache.ttl(),
            search_cache.ttl()
        );
        Self {
            transport,
            base_url,
            game_cache,
            search_cache,
        }
    }

    /// Resolve a single game; any per-game problem becomes a fetch error
    pub async fn get_game_by_id(&self, id: &str) -> CatalogResult<Game> {
        let mut batch = self.get_games_by_id_with_errors(&[id]).await?;
        if let Some(error) = batch.errors.pop() {
            return Err(CatalogError::fetch_caused_by(
                format!("Failed to load game {id}"),
                error,
            ));
        }
        batch
            .games
            .pop()
            .ok_or_else(|| CatalogError::fetch(format!("Game {id} was not returned")))
    }

    /// Resolve up to [`MAX_IDS_PER_REQUEST`] ids, cache first.
    ///
    /// Games come back in request order. Ids that could not be resolved are
    /// listed in `errors`, once per distinct id. If nothing resolves at all
    /// the whole call fails.
    pub async fn get_games_by_id_with_errors<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> CatalogResult<GameBatch> {
        if ids.len() > MAX_IDS_PER_REQUEST {
            return Err(CatalogError::TooManyIds {
                requested: ids.len(),
                max: MAX_IDS_PER_REQUEST,
            });
        }
        if ids.is_empty() {
            return Ok(GameBatch::default());
        }

        let requested: Vec<String> = ids.iter().map(|id| id.as_ref().trim().to_string()).collect();
        let mut seen = HashSet::new();
        let unique: Vec<String> = requested
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut resolved: HashMap<String, Game> = HashMap::with_capacity(unique.len());
        let mut misses = Vec::new();
        for (id, cached) in self.game_cache.get_many(unique.iter()).await {
            match cached {
                Some(game) => {
                    resolved.insert(id, game);
                }
                None => misses.push(id),
            }
        }
        debug!(
            "Game lookup: {} cached, {} to fetch",
            resolved.len(),
            misses.len()
        );

        let failures = if misses.is_empty() {
            HashMap::new()
        } else {
            let (fetched, failed) = self.fetch_games(&misses).await?;
            self.game_cache
                .insert_many(fetched.iter().map(|(id, game)| (id.clone(), game.clone())))
                .await;
            resolved.extend(fetched);
            failed
        };

        let mut batch = GameBatch::default();
        let mut reported = HashSet::new();
        for id in &requested {
            if let Some(game) = resolved.get(id) {
                batch.games.push(game.clone());
            } else if let Some(error) = failures.get(id)
                && reported.insert(id.as_str())
            {
                batch.errors.push(error.clone());
            }
        }

        if batch.games.is_empty() {
            let message = format!("None of the requested games could be loaded: {}", unique.join(","));
            return Err(match batch.errors.into_iter().next() {
                Some(first) => CatalogError::fetch_caused_by(message, first),
                None => CatalogError::fetch(message),
            });
        }
        if batch.has_errors() {
            warn!(
                "Loaded {} games with {} failures",
                batch.games.len(),
                batch.errors.len()
            );
        }
        Ok(batch)
    }

    /// Search by name, ranked by relevance and cut to `max_results`
    pub async fn search_games_by_name(
        &self,
        query: &str,
        max_results: usize,
        ignore_case: bool,
    ) -> CatalogResult<Vec<GameSearchResult>> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let key = SearchKey::new(query, max_results, ignore_case);
        if let Some(results) = self.search_cache.get(&key).await {
            debug!("Search cache hit for '{}'", query.trim());
            return Ok(results);
        }

        let url = self.search_url(query.trim()).map_err(|e| {
            CatalogError::search_caused_by(format!("Cannot search for '{}'", query.trim()), e)
        })?;
        let body = self.transport.fetch_text(&url).await.map_err(|e| {
            CatalogError::search_caused_by(format!("Search for '{}' failed", query.trim()), e)
        })?;
        let results = parse_search_document(&body).map_err(|e| {
            CatalogError::search_caused_by("Catalog returned an unreadable search response", e)
        })?;

        let mut ranked = rank_results(results, query, ignore_case);
        ranked.truncate(max_results);
        debug!("Search for '{}' returned {} results", query.trim(), ranked.len());

        self.search_cache.insert(key, ranked.clone()).await;
        Ok(ranked)
    }

    pub async fn stats(&self) -> CatalogStats {
        CatalogStats {
            games: self.game_cache.stats().await,
            searches: self.search_cache.stats().await,
        }
    }

    pub async fn clear_caches(&self) {
        let before = self.stats().await;
        self.game_cache.clear().await;
        self.search_cache.clear().await;
        info!(
            "Cleared catalog caches ({} games, {} searches)",
            before.games.entries, before.searches.entries
        );
    }

    async fn fetch_games(
        &self,
        ids: &[String],
    ) -> CatalogResult<(HashMap<String, Game>, HashMap<String, GameParseError>)> {
        let joined = ids.join(",");
        let url = self
            .thing_url(&joined)
            .map_err(|e| CatalogError::fetch_caused_by(format!("Cannot fetch games {joined}"), e))?;
        let body = self
            .transport
            .fetch_text(&url)
            .await
            .map_err(|e| CatalogError::fetch_caused_by(format!("Fetching games {joined} failed"), e))?;
        let parsed = parse_thing_document(&body).map_err(|e| {
            CatalogError::fetch_caused_by("Catalog returned an unreadable game response", e)
        })?;

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut fetched = HashMap::new();
        let mut failed = HashMap::new();
        for (id, result) in parsed {
            if !wanted.contains(id.as_str()) {
                debug!("Ignoring unrequested game {} in catalog response", id);
                continue;
            }
            match result {
                Ok(game) => {
                    fetched.insert(id, game);
                }
                Err(e) => {
                    failed.insert(id, e);
                }
            }
        }
        for id in ids {
            if !fetched.contains_key(id) && !failed.contains_key(id) {
                failed.insert(id.clone(), GameParseError::NotReturned { id: id.clone() });
            }
        }
        Ok((fetched, failed))
    }

    fn thing_url(&self, ids: &str) -> TransportResult<Url> {
        let mut url = self.endpoint(THING_RESOURCE)?;
        url.query_pairs_mut().append_pair("id", ids);
        Ok(url)
    }

    fn search_url(&self, query: &str) -> TransportResult<Url> {
        let mut url = self.endpoint(SEARCH_RESOURCE)?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("type", SEARCH_TYPE);
        Ok(url)
    }

    fn endpoint(&self, resource: &str) -> TransportResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl {
                url: self.base_url.to_string(),
                message: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }
}
