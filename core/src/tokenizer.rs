/// Tokenize text into lower-cased, whitespace-delimited units.
///
/// Deliberately raw: no stemming, no stopword filtering, no punctuation
/// stripping. Index keys and query terms must pass through the same
/// normalization so lookups stay case-insensitive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Normalize a single token or query term (lower-case only).
pub fn normalize(token: &str) -> String {
    token.to_lowercase()
}
