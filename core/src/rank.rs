use serde::Serialize;

use crate::importance::Importance;
use crate::index::InvertedIndex;
use crate::Address;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub address: Address,
    pub score: f64,
}

/// Answer a single-token query against `index`, ordered by importance.
///
/// The query is normalized like indexed text. Hits are sorted by score
/// descending with a stable sort, so addresses with equal (or absent)
/// scores keep their postings order. An unknown token yields an empty
/// result, not an error. No term frequency, proximity, or multi-token
/// combination is applied here.
pub fn search(
    query: &str,
    index: &InvertedIndex,
    importance: &impl Importance,
) -> Vec<Hit> {
    let mut hits: Vec<Hit> = index
        .lookup(query)
        .iter()
        .map(|address| Hit {
            address: address.clone(),
            score: importance.importance_of(address),
        })
        .collect();
    // stable sort keeps postings order on ties
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}
