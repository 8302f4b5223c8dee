//! Canonical catalog models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use crate::errors::GameParseError;

/// A board game as described by the remote catalog.
///
/// Optional numeric fields are `None` whenever the catalog has no usable
/// value, including when it reports `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub uid: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub min_players: u32,
    pub max_players: u32,
    pub recommended_players: Option<u32>,
    pub average_play_time: Option<u32>,
    pub min_age: Option<u32>,
    pub genres: BTreeSet<String>,
}

/// Lightweight hit returned by a name search
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameSearchResult {
    pub id: String,
    pub name: String,
}

impl GameSearchResult {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Outcome of a batch lookup: games in request order plus per-id failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameBatch {
    pub games: Vec<Game>,
    pub errors: Vec<GameParseError>,
}

impl GameBatch {
    pub fn is_empty(&self) -> bool {
        self.games.is_empty() && self.errors.is_empty()
    }

    /// Whether some requested ids could not be resolved
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
