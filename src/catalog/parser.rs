//! Translation layer from BoardGameGeek XML documents to catalog models
//!
//! Field mapping for `thing` responses:
//!
//! | Model field           | XML source                                                    | Required |
//! |-----------------------|---------------------------------------------------------------|----------|
//! | `uid`                 | `item/@id`                                                    | yes      |
//! | `name`                | `name[@type="primary"]/@value`                                | yes      |
//! | `description`         | `description` text                                            | yes      |
//! | `image_url`           | `thumbnail` text                                              | yes      |
//! | `min_players`         | `minplayers/@value`                                           | yes      |
//! | `max_players`         | `maxplayers/@value`                                           | yes      |
//! | `recommended_players` | first number in `poll-summary[@name="suggested_numplayers"]/result[@name="bestwith"]/@value` | no |
//! | `average_play_time`   | `playingtime/@value`                                          | no       |
//! | `min_age`             | `minage/@value`                                               | no       |
//! | `genres`              | `link[@type="boardgamecategory"]/@value`                      | no       |
//!
//! Optional numbers that are missing, unparseable or zero become `None`.
//! Mechanic links and every other link type are ignored.

use quick_xml::DeError;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::models::{Game, GameSearchResult};
use crate::errors::GameParseError;

const PRIMARY_NAME: &str = "primary";
const PLAYER_COUNT_POLL: &str = "suggested_numplayers";
const BEST_WITH_RESULT: &str = "bestwith";
const CATEGORY_LINK: &str = "boardgamecategory";

/// One parsed `<item>` of a thing response, keyed by the id it carried
pub type ParsedThing = (String, Result<Game, GameParseError>);

#[derive(Debug, Deserialize)]
struct ThingDocument {
    #[serde(rename = "item", default)]
    items: Vec<ThingItem>,
}

#[derive(Debug, Deserialize)]
struct ThingItem {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(rename = "name", default)]
    names: Vec<NameNode>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    minplayers: Option<ValueNode>,
    #[serde(default)]
    maxplayers: Option<ValueNode>,
    #[serde(rename = "poll-summary", default)]
    poll_summaries: Vec<PollSummary>,
    #[serde(default)]
    playingtime: Option<ValueNode>,
    #[serde(default)]
    minage: Option<ValueNode>,
    #[serde(rename = "link", default)]
    links: Vec<LinkNode>,
}

#[derive(Debug, Deserialize)]
struct NameNode {
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(rename = "@value", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueNode {
    #[serde(rename = "@value", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollSummary {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "result", default)]
    results: Vec<PollResult>,
}

#[derive(Debug, Deserialize)]
struct PollResult {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@value", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkNode {
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(rename = "@value", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    #[serde(rename = "item", default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "name", default)]
    names: Vec<NameNode>,
}

/// Parse a `thing` response into one result per item.
///
/// Fails only when the document itself is not valid XML; problems with a
/// single item are reported in that item's result. Items without an id
/// cannot be attributed to a request and are skipped.
pub fn parse_thing_document(xml: &str) -> Result<Vec<ParsedThing>, DeError> {
    let document: ThingDocument = from_str(xml)?;
    debug!("Parsed thing document with {} items", document.items.len());

    Ok(document
        .items
        .into_iter()
        .filter_map(|item| match non_empty(item.id.as_deref()) {
            Some(id) => {
                let id = id.to_string();
                let game = item.into_game(&id);
                if let Err(e) = &game {
                    warn!("Malformed catalog entry: {}", e);
                }
                Some((id, game))
            }
            None => {
                warn!("Catalog returned an item without an id; ignoring it");
                None
            }
        })
        .collect())
}

/// Parse a `search` response, skipping entries without an id or usable name
pub fn parse_search_document(xml: &str) -> Result<Vec<GameSearchResult>, DeError> {
    let document: SearchDocument = from_str(xml)?;

    let total = document.items.len();
    let results: Vec<GameSearchResult> = document
        .items
        .into_iter()
        .filter_map(|item| {
            let id = non_empty(item.id.as_deref())?.to_string();
            let name = preferred_name(&item.names)?;
            Some(GameSearchResult::new(id, name))
        })
        .collect();

    if results.len() < total {
        debug!("Skipped {} search entries without an id or name", total - results.len());
    }
    Ok(results)
}

impl ThingItem {
    fn into_game(self, id: &str) -> Result<Game, GameParseError> {
        let name = self
            .names
            .iter()
            .find(|n| n.kind.as_deref() == Some(PRIMARY_NAME))
            .and_then(|n| non_empty(n.value.as_deref()))
            .ok_or_else(|| missing(id, "name"))?
            .to_string();

        let description = non_empty(self.description.as_deref())
            .map(decode_residual_entities)
            .ok_or_else(|| missing(id, "description"))?;

        let image_url = non_empty(self.thumbnail.as_deref())
            .ok_or_else(|| missing(id, "thumbnail"))?
            .to_string();

        let min_players = required_number(id, "minplayers", self.minplayers.as_ref())?;
        let max_players = required_number(id, "maxplayers", self.maxplayers.as_ref())?;

        let recommended_players = self
            .poll_summaries
            .iter()
            .filter(|summary| summary.name.as_deref() == Some(PLAYER_COUNT_POLL))
            .flat_map(|summary| summary.results.iter())
            .find(|result| result.name.as_deref() == Some(BEST_WITH_RESULT))
            .and_then(|result| result.value.as_deref())
            .and_then(first_number);

        let genres: BTreeSet<String> = self
            .links
            .iter()
            .filter(|link| link.kind.as_deref() == Some(CATEGORY_LINK))
            .filter_map(|link| non_empty(link.value.as_deref()).map(str::to_string))
            .collect();

        Ok(Game {
            uid: id.to_string(),
            name,
            description,
            image_url,
            min_players,
            max_players,
            recommended_players,
            average_play_time: optional_number(self.playingtime.as_ref()),
            min_age: optional_number(self.minage.as_ref()),
            genres,
        })
    }
}

fn missing(id: &str, field: &'static str) -> GameParseError {
    GameParseError::MissingField {
        id: id.to_string(),
        field,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn preferred_name(names: &[NameNode]) -> Option<String> {
    names
        .iter()
        .find(|n| n.kind.as_deref() == Some(PRIMARY_NAME) && non_empty(n.value.as_deref()).is_some())
        .or_else(|| names.iter().find(|n| non_empty(n.value.as_deref()).is_some()))
        .and_then(|n| non_empty(n.value.as_deref()))
        .map(str::to_string)
}

fn required_number(
    id: &str,
    field: &'static str,
    node: Option<&ValueNode>,
) -> Result<u32, GameParseError> {
    let raw = node
        .and_then(|n| non_empty(n.value.as_deref()))
        .ok_or_else(|| missing(id, field))?;

    raw.parse::<u32>().map_err(|_| GameParseError::InvalidField {
        id: id.to_string(),
        field,
        value: raw.to_string(),
    })
}

fn optional_number(node: Option<&ValueNode>) -> Option<u32> {
    node.and_then(|n| non_empty(n.value.as_deref()))
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
}

/// First run of digits in free text such as "Best with 4 players"
fn first_number(text: &str) -> Option<u32> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()?;

    digits
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|value| *value > 0)
}

/// BoardGameGeek double-escapes descriptions, so `&#10;` and friends survive
/// the first XML decode.
fn decode_residual_entities(text: &str) -> String {
    match quick_xml::escape::unescape(text) {
        Ok(decoded) => decoded.trim().to_string(),
        Err(_) => text.to_string(),
    }
}
