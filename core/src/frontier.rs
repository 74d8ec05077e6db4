use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

use crate::index::Document;
use crate::Address;

/// What link discovery yields for one address: the page text plus every
/// outbound address found on it.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub content: String,
    pub links: Vec<Address>,
}

/// Link discovery collaborator.
///
/// Implementations must degrade failures (network fault, non-HTML payload,
/// robots denial) to an empty `Page`: a failed discovery stops that branch
/// of the crawl and nothing else.
pub trait Discover {
    fn discover(&mut self, address: &Address) -> Page;
}

impl<F> Discover for F
where
    F: FnMut(&Address) -> Page,
{
    fn discover(&mut self, address: &Address) -> Page {
        self(address)
    }
}

/// Pending FIFO queue plus visited set for one crawl run.
///
/// Invariant: an address is inserted into the visited set at admission
/// time, before it is enqueued, and the visited set only grows for the
/// lifetime of the run.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<Address>,
    visited: HashSet<Address>,
}

impl Frontier {
    /// Start a frontier with `seed` already admitted.
    pub fn new(seed: impl Into<Address>) -> Self {
        let seed = seed.into();
        Self {
            queue: VecDeque::from([seed.clone()]),
            visited: HashSet::from([seed]),
        }
    }

    /// Test-and-set admission: marks `address` visited and enqueues it,
    /// returning true, only the first time it is seen. Self-links land here
    /// already visited and are absorbed without special-casing.
    pub fn admit(&mut self, address: impl Into<Address>) -> bool {
        let address = address.into();
        if !self.visited.insert(address.clone()) {
            return false;
        }
        self.queue.push_back(address);
        true
    }

    /// Next address to visit, FIFO.
    pub fn next(&mut self) -> Option<Address> {
        self.queue.pop_front()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn into_visited(self) -> HashSet<Address> {
        self.visited
    }
}

/// Result of one crawl run: every address ever admitted, plus one document
/// per address that was actually dequeued and visited.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub visited: HashSet<Address>,
    pub documents: Vec<Document>,
}

/// Bounded breadth-first crawl from `seed`.
///
/// Loops while the visited count is below `capacity` (clamped to at least 1)
/// and the queue holds work: dequeue one address, emit its document, admit
/// every link discovered on it. The capacity guard is re-checked between
/// outer iterations only, so the visited set may overshoot `capacity` by the
/// link burst of the last processed page. With `capacity == 1` the guard
/// stops the loop before the seed is dequeued: the visited set is exactly
/// the seed and no discovery occurs.
pub fn crawl<D: Discover>(
    seed: impl Into<Address>,
    capacity: usize,
    discovery: &mut D,
) -> CrawlOutcome {
    let capacity = capacity.max(1);
    let mut frontier = Frontier::new(seed);
    let mut documents = Vec::new();

    while frontier.visited_count() < capacity {
        let Some(address) = frontier.next() else { break };
        let page = discovery.discover(&address);
        tracing::debug!(%address, links = page.links.len(), "visited page");
        documents.push(Document::new(address, page.content));
        for link in page.links {
            frontier.admit(link);
        }
    }

    tracing::debug!(
        visited = frontier.visited_count(),
        documents = documents.len(),
        pending = frontier.pending(),
        "crawl finished"
    );
    CrawlOutcome {
        visited: frontier.into_visited(),
        documents,
    }
}

/// `Frontier` behind a single mutex, for concurrent producers.
///
/// Keeping queue and visited set under one lock makes admission a
/// linearizable test-and-set: two in-flight discoveries of the same address
/// never both see it as new.
pub struct SharedFrontier {
    inner: Mutex<Frontier>,
}

impl SharedFrontier {
    pub fn new(seed: impl Into<Address>) -> Self {
        Self { inner: Mutex::new(Frontier::new(seed)) }
    }

    pub fn admit(&self, address: impl Into<Address>) -> bool {
        self.inner.lock().admit(address)
    }

    pub fn next(&self) -> Option<Address> {
        self.inner.lock().next()
    }

    pub fn visited_count(&self) -> usize {
        self.inner.lock().visited_count()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().pending()
    }

    /// Snapshot of the visited set.
    pub fn visited(&self) -> HashSet<Address> {
        self.inner.lock().visited.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // Fixed link graph standing in for real discovery.
    fn graph(edges: &[(&str, &[&str])]) -> impl FnMut(&Address) -> Page {
        let map: HashMap<Address, Vec<Address>> = edges
            .iter()
            .map(|(from, to)| {
                (from.to_string(), to.iter().map(|s| s.to_string()).collect())
            })
            .collect();
        move |address: &Address| Page {
            content: format!("content of {address}"),
            links: map.get(address).cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn capacity_one_visits_only_the_seed() {
        let mut discovery = graph(&[("s", &["a", "b"])]);
        let out = crawl("s", 1, &mut discovery);
        assert_eq!(out.visited, HashSet::from(["s".to_string()]));
        assert!(out.documents.is_empty());
    }

    #[test]
    fn small_closed_graph_is_fully_visited() {
        let mut discovery = graph(&[
            ("s", &["a", "b"]),
            ("a", &["s", "b"]),
            ("b", &[]),
        ]);
        let out = crawl("s", 50, &mut discovery);
        let want: HashSet<Address> =
            ["s", "a", "b"].into_iter().map(String::from).collect();
        assert_eq!(out.visited, want);
        // one document per reachable page, in FIFO visit order
        let addrs: Vec<&str> =
            out.documents.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addrs, ["s", "a", "b"]);
    }

    #[test]
    fn self_links_are_absorbed() {
        let mut discovery = graph(&[("s", &["s", "a"]), ("a", &["a"])]);
        let out = crawl("s", 10, &mut discovery);
        assert_eq!(out.documents.len(), 2);
        assert_eq!(out.visited.len(), 2);
    }

    #[test]
    fn capacity_may_overshoot_by_one_link_burst() {
        // Visiting "s" admits four links in one burst; the guard only
        // re-checks afterwards, so visited ends at 5 with capacity 3.
        let mut discovery = graph(&[("s", &["a", "b", "c", "d"])]);
        let out = crawl("s", 3, &mut discovery);
        assert_eq!(out.visited.len(), 5);
        assert_eq!(out.documents.len(), 1);
    }

    #[test]
    fn shared_admit_is_test_and_set() {
        let frontier = SharedFrontier::new("s");
        assert!(frontier.admit("a"));
        assert!(!frontier.admit("a"));
        assert!(!frontier.admit("s"));
        assert_eq!(frontier.visited_count(), 2);
        assert_eq!(frontier.next(), Some("s".to_string()));
        assert_eq!(frontier.next(), Some("a".to_string()));
        assert_eq!(frontier.next(), None);
    }
}
