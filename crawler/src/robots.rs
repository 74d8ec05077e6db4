use parking_lot::RwLock;
use reqwest::{header, Client, Url};
use std::collections::HashMap;

/// Parsed rules from one host's robots.txt, '*' group only.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    allows: Vec<String>,
    disallows: Vec<String>,
    crawl_delay_ms: Option<u64>,
}

/// Per-host robots.txt cache. Fetches each host's file once and answers
/// allow/delay questions from the cached rules afterwards.
#[derive(Default)]
pub struct RobotsCache {
    rules: RwLock<HashMap<String, Rules>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `url` may be fetched. An unreachable or missing robots.txt
    /// counts as allowing everything.
    pub async fn allowed(&self, client: &Client, url: &Url, user_agent: &str) -> bool {
        let Some(host) = url.host_str().map(str::to_string) else {
            return false;
        };
        let cached = { self.rules.read().get(&host).cloned() };
        let rules = match cached {
            Some(r) => r,
            None => {
                let fetched = self.fetch_rules(client, url, &host, user_agent).await;
                self.rules.write().insert(host, fetched.clone());
                fetched
            }
        };
        path_allowed(url.path(), &rules)
    }

    /// Crawl-delay for `url`'s host, if its robots.txt declared one.
    pub fn delay_ms(&self, url: &Url) -> Option<u64> {
        let host = url.host_str()?;
        self.rules.read().get(host).and_then(|r| r.crawl_delay_ms)
    }

    async fn fetch_rules(&self, client: &Client, url: &Url, host: &str, user_agent: &str) -> Rules {
        let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
        let txt = match client
            .get(&robots_url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        parse(&txt)
    }
}

/// Minimal robots.txt parser covering the `User-agent: *` group.
pub fn parse(txt: &str) -> Rules {
    let mut active = false;
    let mut rules = Rules::default();
    for line in txt.lines() {
        let l = line.trim();
        if l.is_empty() || l.starts_with('#') {
            continue;
        }
        let Some((k, v)) = l.split_once(':') else { continue };
        let key = k.trim().to_lowercase();
        let val = v.trim();
        match key.as_str() {
            "user-agent" => active = val == "*",
            "allow" if active => rules.allows.push(val.to_string()),
            "disallow" if active => rules.disallows.push(val.to_string()),
            "crawl-delay" if active => {
                if let Ok(n) = val.parse::<f64>() {
                    rules.crawl_delay_ms = Some((n * 1000.0) as u64);
                }
            }
            _ => {}
        }
    }
    rules
}

/// Longest matching Allow vs Disallow prefix wins; ties go to Allow.
/// An empty rule value matches nothing (a bare `Disallow:` allows all).
fn path_allowed(path: &str, rules: &Rules) -> bool {
    let best_allow = longest_prefix(path, &rules.allows);
    let best_dis = longest_prefix(path, &rules.disallows);
    match (best_allow, best_dis) {
        (Some(a), Some(d)) => a >= d,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => true,
    }
}

fn longest_prefix(path: &str, prefixes: &[String]) -> Option<usize> {
    prefixes
        .iter()
        .filter(|p| !p.is_empty() && path.starts_with(p.as_str()))
        .map(|p| p.len())
        .max()
}
