mod robots;

use anyhow::{anyhow, Result};
use clap::Parser;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use searchpipe_core::{crawl, Address, Discover, Page, SharedFrontier};
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use robots::RobotsCache;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl pages from a seed URL into a JSONL document store")]
struct Cli {
    /// Seed URL to start from
    #[arg(long)]
    seed: String,
    /// Maximum number of unique addresses one run may visit
    #[arg(long, default_value_t = 100)]
    capacity: usize,
    /// Output JSONL file path
    #[arg(long, default_value = "./sample_data/crawl.jsonl")]
    output: String,
    /// Concurrency (number of in-flight fetches)
    #[arg(long, default_value_t = 16)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string for robots.txt and page fetches
    #[arg(long, default_value = "searchpipe-bot/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// Only follow links that stay on the seed's host
    #[arg(long, default_value_t = true)]
    same_host_only: bool,
    /// Crawl a deterministic simulated site instead of the network
    #[arg(long, default_value_t = false)]
    simulate: bool,
    /// Seed for the simulated link generator
    #[arg(long, default_value_t = 42)]
    rng_seed: u64,
}

#[derive(Serialize)]
struct CrawlRecord<'a> {
    id: String,
    url: &'a str,
    title: &'a str,
    body: &'a str,
    timestamp: String,
}

/// One finished fetch: the visited address, its document text when the
/// fetch produced any, and the outbound links to admit.
struct Fetched {
    address: Address,
    doc: Option<(String, String)>,
    links: Vec<Address>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir).ok();
    }
    if args.simulate {
        run_simulated(&args)
    } else {
        run_http(&args).await
    }
}

async fn run_http(args: &Cli) -> Result<()> {
    let seed = Url::parse(&args.seed)
        .or_else(|_| Url::parse(&format!("https://{}", args.seed)))
        .map_err(|_| anyhow!("invalid seed url: {}", args.seed))?;
    let host_filter = args
        .same_host_only
        .then(|| seed.host_str().map(str::to_string))
        .flatten();
    let concurrency = args.concurrency.max(1);

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let robots = Arc::new(RobotsCache::new());
    let frontier = Arc::new(SharedFrontier::new(norm(&seed)));
    let mut out = BufWriter::new(File::create(&args.output)?);
    let mut inflight: JoinSet<Fetched> = JoinSet::new();
    let mut emitted = 0usize;

    tracing::info!(
        seed = %seed,
        capacity = args.capacity,
        concurrency,
        same_host_only = args.same_host_only,
        output = %args.output,
        "starting crawl"
    );

    loop {
        // Dispatch until workers are full; dispatching stops once the
        // visited count reaches capacity.
        while inflight.len() < concurrency && frontier.visited_count() < args.capacity {
            let Some(address) = frontier.next() else { break };
            inflight.spawn(fetch(
                client.clone(),
                robots.clone(),
                args.user_agent.clone(),
                address,
                host_filter.clone(),
            ));
        }

        match inflight.join_next().await {
            Some(Ok(fetched)) => {
                // The capacity stop is cooperative: a fetch that finishes
                // after the cap decision still writes its document, but
                // admits no further links.
                if frontier.visited_count() < args.capacity {
                    for link in fetched.links {
                        frontier.admit(link);
                    }
                }
                if let Some((title, body)) = fetched.doc {
                    write_record(&mut out, &fetched.address, &title, &body)?;
                    emitted += 1;
                    if emitted % 100 == 0 {
                        tracing::info!(
                            emitted,
                            visited = frontier.visited_count(),
                            pending = frontier.pending(),
                            "progress"
                        );
                    }
                }
            }
            Some(Err(err)) => tracing::warn!(%err, "fetch task failed"),
            None => {
                if frontier.pending() == 0 || frontier.visited_count() >= args.capacity {
                    break;
                }
            }
        }
    }

    out.flush()?;
    tracing::info!(
        emitted,
        visited = frontier.visited_count(),
        pending = frontier.pending(),
        output = %args.output,
        "crawl done"
    );
    Ok(())
}

/// Fetch one page. Every failure mode (robots denial, HTTP error, non-HTML
/// payload, oversized body) degrades to an empty result so the crawl just
/// stops growing along this branch.
async fn fetch(
    client: Client,
    robots: Arc<RobotsCache>,
    user_agent: String,
    address: Address,
    host_filter: Option<String>,
) -> Fetched {
    let empty = Fetched { address: address.clone(), doc: None, links: Vec::new() };
    let Ok(url) = Url::parse(&address) else { return empty };

    if !robots.allowed(&client, &url, &user_agent).await {
        tracing::debug!(%address, "blocked by robots.txt");
        return empty;
    }
    if let Some(delay) = robots.delay_ms(&url) {
        sleep(Duration::from_millis(delay)).await;
    }

    let resp = match client.get(url.clone()).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::debug!(%address, status = %r.status(), "skipping page");
            return empty;
        }
        Err(err) => {
            tracing::debug!(%address, %err, "fetch failed");
            return empty;
        }
    };
    if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
        if let Ok(v) = ct.to_str() {
            if !v.starts_with("text/html") {
                return empty;
            }
        }
    }
    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(_) => return empty,
    };
    if bytes.len() > 2 * 1024 * 1024 {
        return empty;
    }

    let html = String::from_utf8_lossy(&bytes);
    let (title, text, links) = extract(&html, &url, host_filter.as_deref());
    Fetched { address, doc: Some((title, text)), links }
}

/// Pull title, body text, and outbound links out of an HTML page.
/// Links are resolved against `base`, stripped of fragments, and filtered
/// to `host_filter` when one is set.
fn extract(html: &str, base: &Url, host_filter: Option<&str>) -> (String, String, Vec<Address>) {
    let sel_title = Selector::parse("title").unwrap();
    let sel_body = Selector::parse("body").unwrap();
    let sel_a = Selector::parse("a").unwrap();

    let doc = Html::parse_document(html);
    let title = doc
        .select(&sel_title)
        .next()
        .map(|n| n.text().collect::<String>())
        .unwrap_or_default();
    let text = doc
        .select(&sel_body)
        .next()
        .map(|n| n.text().collect::<String>())
        .unwrap_or_default();

    let mut links = Vec::new();
    for a in doc.select(&sel_a) {
        let Some(href) = a.value().attr("href") else { continue };
        let Ok(u) = Url::parse(href).or_else(|_| base.join(href)) else { continue };
        if !u.scheme().starts_with("http") {
            continue;
        }
        if let Some(host) = host_filter {
            if u.host_str() != Some(host) {
                continue;
            }
        }
        links.push(norm(&u));
    }
    (title.trim().to_string(), text.trim().to_string(), links)
}

fn norm(u: &Url) -> String {
    let mut u = u.clone();
    u.set_fragment(None);
    u.to_string()
}

fn write_record<W: Write>(out: &mut W, address: &str, title: &str, body: &str) -> Result<()> {
    let mut hasher = Sha1::new();
    hasher.update(address.as_bytes());
    let rec = CrawlRecord {
        id: format!("{:x}", hasher.finalize()),
        url: address,
        title,
        body,
        timestamp: time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    };
    serde_json::to_writer(&mut *out, &rec)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Deterministic stand-in for link discovery. Pages link into a bounded
/// pool of addresses plus themselves; an xorshift generator keyed by
/// --rng-seed keeps runs reproducible.
struct SimulatedSite {
    state: u64,
}

impl SimulatedSite {
    fn new(seed: u64) -> Self {
        // xorshift state must never be zero
        Self { state: seed | 1 }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl Discover for SimulatedSite {
    fn discover(&mut self, address: &Address) -> Page {
        let links = vec![
            format!("http://example.com/page{}", self.next() % 100),
            format!("http://example.com/page{}", self.next() % 100),
            format!("http://example.com/another-site/page{}", self.next() % 50),
            // pages link back to themselves
            address.clone(),
        ];
        Page {
            content: format!("simulated page {address} about distributed search systems"),
            links,
        }
    }
}

fn run_simulated(args: &Cli) -> Result<()> {
    let mut site = SimulatedSite::new(args.rng_seed);
    let outcome = crawl(args.seed.clone(), args.capacity, &mut site);

    let mut out = BufWriter::new(File::create(&args.output)?);
    for doc in &outcome.documents {
        write_record(&mut out, &doc.address, &doc.address, &doc.content)?;
    }
    out.flush()?;
    tracing::info!(
        visited = outcome.visited.len(),
        documents = outcome.documents.len(),
        output = %args.output,
        "simulated crawl done"
    );
    Ok(())
}
