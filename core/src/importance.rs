use anyhow::Result;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Source of precomputed importance scores, e.g. authority scores produced
/// by an offline link-analysis job. Total function: unmapped addresses
/// score 0.0, never an error.
pub trait Importance {
    fn importance_of(&self, address: &str) -> f64;
}

/// Fixed address -> score table.
#[derive(Debug, Default, Clone)]
pub struct StaticImportance {
    scores: HashMap<String, f64>,
}

impl StaticImportance {
    pub fn new(scores: HashMap<String, f64>) -> Self {
        Self { scores }
    }

    /// Read a JSON object of `address -> score` pairs.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let scores: HashMap<String, f64> = serde_json::from_reader(reader)?;
        Ok(Self { scores })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Importance for StaticImportance {
    fn importance_of(&self, address: &str) -> f64 {
        self.scores.get(address).copied().unwrap_or(0.0)
    }
}

impl Importance for HashMap<String, f64> {
    fn importance_of(&self, address: &str) -> f64 {
        self.get(address).copied().unwrap_or(0.0)
    }
}
