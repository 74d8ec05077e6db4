use searchpipe_core::{crawl, search, Address, InvertedIndex, Page, StaticImportance};
use std::collections::{HashMap, HashSet};

// Deterministic stand-in for link discovery: a fixed graph with one line of
// content per page.
fn site() -> impl FnMut(&Address) -> Page {
    let pages: HashMap<&'static str, (&'static str, &'static [&'static str])> =
        HashMap::from([
            (
                "http://example.com/start",
                ("Java is a powerful programming language", &["http://example.com/page1", "http://example.com/page2"][..]),
            ),
            (
                "http://example.com/page1",
                ("Java for distributed systems", &["http://example.com/start", "http://example.com/page3"][..]),
            ),
            (
                "http://example.com/page2",
                ("Python is great for data science", &[][..]),
            ),
            (
                "http://example.com/page3",
                ("Large scale systems often use Java", &["http://example.com/page3"][..]),
            ),
        ]);
    move |address: &Address| match pages.get(address.as_str()) {
        Some((content, links)) => Page {
            content: content.to_string(),
            links: links.iter().map(|s| s.to_string()).collect(),
        },
        None => Page::default(),
    }
}

fn build_index() -> InvertedIndex {
    let out = crawl("http://example.com/start", 100, &mut site());
    let mut index = InvertedIndex::new();
    for doc in &out.documents {
        index.index(doc);
    }
    index
}

#[test]
fn crawl_visits_the_whole_reachable_graph_when_under_capacity() {
    let out = crawl("http://example.com/start", 100, &mut site());
    let want: HashSet<Address> = [
        "http://example.com/start",
        "http://example.com/page1",
        "http://example.com/page2",
        "http://example.com/page3",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(out.visited, want);
    assert_eq!(out.documents.len(), 4);
}

#[test]
fn crawl_with_capacity_one_stays_on_the_seed() {
    let out = crawl("http://example.com/start", 1, &mut site());
    assert_eq!(
        out.visited,
        HashSet::from(["http://example.com/start".to_string()])
    );
    assert!(out.documents.is_empty());
}

#[test]
fn repeated_runs_index_identically() {
    let a = build_index();
    let b = build_index();
    for (token, postings) in a.tokens() {
        assert_eq!(postings, b.lookup(token), "postings differ for {token}");
    }
    assert_eq!(a.len(), b.len());
}

#[test]
fn postings_never_repeat_an_address() {
    let index = build_index();
    for (token, postings) in index.tokens() {
        let unique: HashSet<&Address> = postings.iter().collect();
        assert_eq!(unique.len(), postings.len(), "duplicate in {token}");
    }
}

#[test]
fn query_ranks_by_importance_with_stable_ties() {
    let index = build_index();
    let ranks = StaticImportance::new(HashMap::from([
        ("http://example.com/start".to_string(), 0.85),
        ("http://example.com/page1".to_string(), 0.70),
        ("http://example.com/page3".to_string(), 0.95),
    ]));

    let hits = search("Java", &index, &ranks);
    let order: Vec<&str> = hits.iter().map(|h| h.address.as_str()).collect();
    assert_eq!(
        order,
        [
            "http://example.com/page3",
            "http://example.com/start",
            "http://example.com/page1",
        ]
    );

    // page1 and page3 both contain "systems" and neither outranks the other
    // without scores, so postings (visit) order holds.
    let hits = search("systems", &index, &StaticImportance::default());
    let order: Vec<&str> = hits.iter().map(|h| h.address.as_str()).collect();
    assert_eq!(
        order,
        ["http://example.com/page1", "http://example.com/page3"]
    );
}

#[test]
fn unknown_query_returns_no_results() {
    let index = build_index();
    let hits = search("golang", &index, &StaticImportance::default());
    assert!(hits.is_empty());
}
