use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::tokenizer::{normalize, tokenize};
use crate::Address;

/// One crawled page, as produced by a crawl visit and consumed by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub address: Address,
    pub content: String,
}

impl Document {
    pub fn new(address: impl Into<Address>, content: impl Into<String>) -> Self {
        Self { address: address.into(), content: content.into() }
    }
}

/// Postings for one token: addresses in first-seen order, with a set
/// alongside so the no-duplicate check stays O(1) instead of a linear scan.
#[derive(Debug, Default)]
struct Postings {
    order: Vec<Address>,
    members: HashSet<Address>,
}

impl Postings {
    fn insert(&mut self, address: &Address) -> bool {
        if !self.members.insert(address.clone()) {
            return false;
        }
        self.order.push(address.clone());
        true
    }
}

/// Token -> postings map. Accumulates state across repeated
/// `index_document` calls for the lifetime of a search session.
#[derive(Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Postings>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Index one document. Idempotent per (address, token): a postings list
    /// never holds the same address twice, no matter how often the document
    /// is re-indexed or a token repeats within it. Empty or whitespace-only
    /// content indexes nothing.
    pub fn index_document(&mut self, address: &Address, content: &str) {
        let mut appended = 0usize;
        for token in tokenize(content) {
            if self.postings.entry(token).or_default().insert(address) {
                appended += 1;
            }
        }
        tracing::debug!(%address, appended, "indexed document");
    }

    pub fn index(&mut self, doc: &Document) {
        self.index_document(&doc.address, &doc.content);
    }

    /// Addresses whose content contains `token`, in first-seen order.
    /// The token is normalized like indexed text; unknown tokens yield an
    /// empty slice, not an error.
    pub fn lookup(&self, token: &str) -> &[Address] {
        self.postings
            .get(&normalize(token))
            .map(|p| p.order.as_slice())
            .unwrap_or(&[])
    }

    /// All (token, postings) pairs, in arbitrary map order.
    pub fn tokens(&self) -> impl Iterator<Item = (&str, &[Address])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.order.as_slice()))
    }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }
}
