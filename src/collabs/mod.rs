use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use crate::scrape::{discover, DocumentSource, SourceArgs};
use crate::{load_json, save_json, Document, Universities};
use crate::{COLLABS_FILE, LINKS_FILE, UNIVERSITIES_FILE};

mod mapping;
pub use mapping::NameMapping;

pub type SubjectWeights = BTreeMap<String, u64>;

/// entity -> partner -> subject -> number of shared documents, as persisted
/// in `collabs.json`. Each unordered pair lives under the orientation it was
/// first recorded with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collaborations(BTreeMap<String, BTreeMap<String, SubjectWeights>>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollabStats {
    pub nodes: usize,
    /// Entity pairs, ignoring subjects
    pub links: usize,
    /// Entity pair and subject combinations
    pub links_with_fields: usize,
}

impl Collaborations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, entity: &str) {
        self.0.entry(entity.to_string()).or_default();
    }

    pub fn increment(&mut self, a: &str, b: &str, subject: &str) {
        let reversed = self
            .0
            .get(b)
            .is_some_and(|partners| partners.contains_key(a));
        let (from, to) = if reversed { (b, a) } else { (a, b) };

        *self
            .0
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_insert(0) += 1;
    }

    /// Adds one document: its affiliations are mapped to entities (misses are
    /// skipped) and deduplicated, then every entity pair is counted once per
    /// subject. Returns the number of increments.
    pub fn record_document(&mut self, mapping: &NameMapping, document: &Document) -> usize {
        let mut entities: Vec<&str> = Vec::new();
        for affiliation in &document.affiliations {
            if let Some(entity) = mapping.lookup(affiliation) {
                if !entities.contains(&entity) {
                    entities.push(entity);
                }
            }
        }

        let mut increments = 0;
        for (i, a) in entities.iter().enumerate() {
            self.add_node(a);
            for b in &entities[i + 1..] {
                for subject in &document.subjects {
                    self.increment(a, b, subject);
                    increments += 1;
                }
            }
        }
        increments
    }

    /// Weight of one subject for the pair, whichever way it is stored.
    pub fn weight(&self, a: &str, b: &str, subject: &str) -> u64 {
        self.subjects(a, b)
            .and_then(|subjects| subjects.get(subject))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over all subjects for the pair (the "All" edge).
    pub fn total_weight(&self, a: &str, b: &str) -> u64 {
        self.subjects(a, b)
            .map(|subjects| subjects.values().sum())
            .unwrap_or(0)
    }

    pub fn subjects(&self, a: &str, b: &str) -> Option<&SubjectWeights> {
        self.0
            .get(a)
            .and_then(|partners| partners.get(b))
            .or_else(|| self.0.get(b).and_then(|partners| partners.get(a)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, SubjectWeights>)> {
        self.0.iter()
    }

    pub fn stats(&self) -> CollabStats {
        let mut stats = CollabStats {
            nodes: self.0.len(),
            ..CollabStats::default()
        };
        for partners in self.0.values() {
            stats.links += partners.len();
            stats.links_with_fields += partners.values().map(BTreeMap::len).sum::<usize>();
        }
        stats
    }
}

#[derive(Args)]
pub struct CollabsArgs {
    /// Working directory (reads universities.json, and links.json with --from-links)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Working directory (writes collabs.json)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Process the saved links instead of re-walking the listing
    #[arg(long)]
    pub from_links: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub async fn build_collaborations<S>(
    source: &S,
    mapping: &NameMapping,
    hrefs: &[String],
) -> Result<Collaborations>
where
    S: DocumentSource + Sync,
{
    let mut collabs = Collaborations::new();

    let pb = ProgressBar::new(hrefs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    for href in hrefs {
        match source.fetch_article(href).await {
            Ok(document) => {
                collabs.record_document(mapping, &document);
            }
            Err(e) => error!("Parse page {}: {:#}", href, e),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(collabs)
}

pub fn run(args: CollabsArgs) -> Result<()> {
    crate::init_tracing();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(args))
}

pub async fn run_async(args: CollabsArgs) -> Result<()> {
    fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let universities: Universities = load_json(args.input.join(UNIVERSITIES_FILE))?;
    let mapping = NameMapping::from_universities(&universities);
    info!(
        "Loaded {} entities covering {} raw affiliations",
        universities.len(),
        mapping.len()
    );

    let client = args.source.client()?;

    let hrefs: Vec<String> = if args.from_links {
        load_json(args.input.join(LINKS_FILE))?
    } else {
        let mut sampler = args.source.sampler();
        discover(&client, &mut sampler, args.source.max_pages)
            .await?
            .into_iter()
            .filter(|d| d.selected)
            .map(|d| d.href)
            .collect()
    };
    info!("Processing {} articles", hrefs.len());

    let collabs = build_collaborations(&client, &mapping, &hrefs).await?;
    save_json(args.output.join(COLLABS_FILE), &collabs)?;

    let stats = collabs.stats();
    info!(
        "Collaborations: {} nodes, {} links, {} links with fields",
        stats.nodes, stats.links, stats.links_with_fields
    );

    Ok(())
}
