use anyhow::Result;
use clap::{Parser, Subcommand};
use searchpipe_core::{search, Address, InvertedIndex, StaticImportance};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    url: String,
    body: String,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the inverted index from crawl output and inspect it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every token with its postings list
    Dump {
        /// Input crawl JSON/JSONL (file or directory)
        #[arg(long)]
        input: String,
    },
    /// Rank documents matching each query term
    Query {
        /// Input crawl JSON/JSONL (file or directory)
        #[arg(long)]
        input: String,
        /// JSON file of address -> importance score
        #[arg(long)]
        importance: Option<String>,
        /// Query terms, one lookup each
        terms: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { input } => dump(&input),
        Commands::Query { input, importance, terms } => {
            query(&input, importance.as_deref(), &terms)
        }
    }
}

fn dump(input: &str) -> Result<()> {
    let index = build_index(input)?;
    // map order is arbitrary; sort for a stable dump
    let mut entries: Vec<(&str, &[Address])> = index.tokens().collect();
    entries.sort_by_key(|(token, _)| *token);
    println!("--- Inverted Index ---");
    for (token, postings) in entries {
        println!("'{token}' -> [{}]", postings.join(", "));
    }
    println!("----------------------");
    Ok(())
}

fn query(input: &str, importance: Option<&str>, terms: &[String]) -> Result<()> {
    let index = build_index(input)?;
    let ranks = match importance {
        Some(path) => StaticImportance::from_path(path)?,
        None => StaticImportance::default(),
    };

    for term in terms {
        println!("\nSearching for: \"{term}\"");
        let hits = search(term, &index, &ranks);
        if hits.is_empty() {
            println!("No results found.");
            continue;
        }
        println!("--- Search Results ---");
        for hit in hits {
            println!(" - {} (Rank: {:.2})", hit.address, hit.score);
        }
        println!("----------------------");
    }
    Ok(())
}

fn build_index(input: &str) -> Result<InvertedIndex> {
    let mut index = InvertedIndex::new();
    let mut docs = 0usize;
    for file in input_files(Path::new(input)) {
        docs += index_file(&file, &mut index)?;
    }
    tracing::info!(docs, tokens = index.len(), "index built");
    Ok(index)
}

/// A single file, or every .json/.jsonl under a directory. Sorted so the
/// indexing order (and with it postings order) is stable across runs.
fn input_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|s| s.to_str()),
                    Some("json" | "jsonl")
                )
        })
        .collect();
    files.sort();
    files
}

fn index_file(file: &Path, index: &mut InvertedIndex) -> Result<usize> {
    let reader = BufReader::new(File::open(file)?);
    let mut count = 0usize;
    if file.extension().and_then(|s| s.to_str()) == Some("json") {
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        match json {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    let doc: InputDoc = serde_json::from_value(v)?;
                    index.index_document(&doc.url, &doc.body);
                    count += 1;
                }
            }
            other => {
                let doc: InputDoc = serde_json::from_value(other)?;
                index.index_document(&doc.url, &doc.body);
                count += 1;
            }
        }
    } else {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: InputDoc = serde_json::from_str(&line)?;
            index.index_document(&doc.url, &doc.body);
            count += 1;
        }
    }
    Ok(count)
}
