//! Relevance ordering for name search results

use super::models::GameSearchResult;

/// How well a candidate name matches the query. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Exact,
    /// Char offset of the first occurrence of the query
    Contains(usize),
    /// Edit distance between query and name
    Distance(usize),
}

impl MatchRank {
    fn of(query: &str, name: &str) -> Self {
        if name == query {
            return Self::Exact;
        }
        match name.find(query) {
            Some(byte_offset) => Self::Contains(name[..byte_offset].chars().count()),
            None => Self::Distance(levenshtein(query, name)),
        }
    }
}

/// Sort search results by relevance to `query`.
///
/// Exact matches come first, then names containing the query (earlier
/// occurrence first), then everything else by Levenshtein distance. Ties are
/// broken by shorter name, then by the order the catalog returned them in.
pub fn rank_results(
    results: Vec<GameSearchResult>,
    query: &str,
    ignore_case: bool,
) -> Vec<GameSearchResult> {
    let fold = |s: &str| {
        if ignore_case {
            s.trim().to_lowercase()
        } else {
            s.trim().to_string()
        }
    };
    let query = fold(query);

    let mut keyed: Vec<(MatchRank, usize, usize, GameSearchResult)> = results
        .into_iter()
        .enumerate()
        .map(|(position, result)| {
            let name = fold(&result.name);
            let rank = MatchRank::of(&query, &name);
            (rank, name.chars().count(), position, result)
        })
        .collect();

    keyed.sort_unstable_by_key(|(rank, length, position, _)| (*rank, *length, *position));
    keyed.into_iter().map(|(_, _, _, result)| result).collect()
}

/// Levenshtein edit distance over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
