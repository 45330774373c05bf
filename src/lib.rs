use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub mod analyze;
pub mod collabs;
pub mod resolve;
pub mod scrape;

pub const RAW_AFFILIATIONS_FILE: &str = "raw_affiliations.json";
pub const UNIVERSITIES_FILE: &str = "universities.json";
pub const COLLABS_FILE: &str = "collabs.json";
pub const LINKS_FILE: &str = "links.json";
pub const ANALYSIS_FILE: &str = "analysis.json";

/// Affiliation text blocks and subject tags pulled from one article page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub affiliations: Vec<String>,
    pub subjects: Vec<String>,
}

/// Occurrence counts of verbatim affiliation strings across documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAffiliations(BTreeMap<String, u64>);

impl RawAffiliations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, affiliation: &str) {
        *self.0.entry(affiliation.to_string()).or_insert(0) += 1;
    }

    pub fn observe_document(&mut self, document: &Document) {
        for affiliation in &document.affiliations {
            self.observe(affiliation);
        }
    }

    pub fn get(&self, affiliation: &str) -> Option<u64> {
        self.0.get(affiliation).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u64)> for RawAffiliations {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut raw = Self::new();
        for (affiliation, count) in iter {
            *raw.0.entry(affiliation).or_insert(0) += count;
        }
        raw
    }
}

/// One deduplicated institution and the raw strings resolved to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub init_names: Vec<String>,
    pub count: u64,
}

impl CanonicalEntity {
    pub fn new(init_name: String, count: u64) -> Self {
        Self {
            init_names: vec![init_name],
            count,
        }
    }

    pub fn absorb(&mut self, other: CanonicalEntity) {
        self.init_names.extend(other.init_names);
        self.count += other.count;
    }
}

/// Canonical name -> entity, as persisted in `universities.json`.
pub type Universities = BTreeMap<String, CanonicalEntity>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("affiliation_graph=info".parse().expect("valid directive")),
        )
        .try_init();
}

pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
