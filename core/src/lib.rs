pub mod frontier;
pub mod importance;
pub mod index;
pub mod rank;
pub mod tokenizer;

pub use frontier::{crawl, CrawlOutcome, Discover, Frontier, Page, SharedFrontier};
pub use importance::{Importance, StaticImportance};
pub use index::{Document, InvertedIndex};
pub use rank::{search, Hit};

/// Opaque page identifier. A URL in practice, but the pipeline only relies
/// on equality and hashing.
pub type Address = String;
