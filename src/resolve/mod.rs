use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{load_json, save_json, CanonicalEntity, RawAffiliations, Universities};
use crate::{RAW_AFFILIATIONS_FILE, UNIVERSITIES_FILE};

mod classify;
mod embedder;
mod grouping;
mod similarity;
pub use classify::{classify, default_keywords, institution_name, Classified, INSTITUTION_KEYWORDS};
pub use embedder::{Embedder, HttpEmbedder, DEFAULT_MODEL};
pub use grouping::{greedy_groups, group_pairs, union_find_groups, GroupingMode};
pub use similarity::{candidate_pairs, cosine_similarity};

pub const DEFAULT_THRESHOLD: f32 = 0.92;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("embedding provider failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error("embedding provider returned {got} vectors for {expected} names")]
    VectorCount { expected: usize, got: usize },
    #[error("embedding for {name:?} has dimension {got}, expected {expected}")]
    Dimension {
        name: String,
        expected: usize,
        got: usize,
    },
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Working directory (reads raw_affiliations.json)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Working directory (writes universities.json)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Cosine similarity above which two names are merged
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f32,

    /// How candidate pairs are grouped
    #[arg(short, long, value_enum, default_value_t = GroupingMode::Greedy)]
    pub grouping: GroupingMode,

    /// Embedding API base URL (OpenAI-compatible /v1/embeddings)
    #[arg(short = 'u', long, default_value = "http://localhost:8080")]
    pub embedding_url: String,

    /// Sentence embedding model identifier
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Names per embedding request
    #[arg(short, long, default_value = "64")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "120")]
    pub timeout: u64,

    /// Additional institution keyword (repeatable)
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub keywords: Vec<String>,
    pub threshold: f32,
    pub grouping: GroupingMode,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            threshold: DEFAULT_THRESHOLD,
            grouping: GroupingMode::Greedy,
        }
    }
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub universities: Universities,
    pub rejected: Vec<String>,
    /// Entities absorbed into a surviving entity
    pub absorbed: usize,
}

pub struct Resolver<E> {
    embedder: E,
    config: ResolverConfig,
}

impl<E: Embedder + Sync> Resolver<E> {
    pub fn new(embedder: E, config: ResolverConfig) -> Self {
        Self { embedder, config }
    }

    /// Classifies raw affiliations by keyword, then merges provisional
    /// entities whose names embed close together.
    pub async fn resolve(&self, raw: &RawAffiliations) -> Result<Resolution, ResolveError> {
        let classified = classify(raw, &self.config.keywords);
        info!(
            "{} affiliations classified into {} provisional entities, {} rejected",
            raw.len() - classified.rejected.len(),
            classified.entities.len(),
            classified.rejected.len()
        );

        let mut resolution = self.merge_similar(classified.entities).await?;
        resolution.rejected = classified.rejected;
        Ok(resolution)
    }

    /// Runs only the similarity merge over an existing entity set.
    pub async fn refine(&self, universities: Universities) -> Result<Resolution, ResolveError> {
        self.merge_similar(universities.into_iter().collect()).await
    }

    async fn merge_similar(
        &self,
        entities: Vec<(String, CanonicalEntity)>,
    ) -> Result<Resolution, ResolveError> {
        let names: Vec<String> = entities.iter().map(|(name, _)| name.clone()).collect();
        let embeddings = self.embed_names(&names).await?;

        let pairs = candidate_pairs(&embeddings, self.config.threshold);
        debug!("{} candidate pairs above {}", pairs.len(), self.config.threshold);

        let groups = group_pairs(&pairs, self.config.grouping);
        Ok(merge_groups(entities, &groups))
    }

    async fn embed_names(&self, names: &[String]) -> Result<Vec<Vec<f32>>, ResolveError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .embedder
            .embed(names)
            .await
            .map_err(ResolveError::Embedding)?;
        validate_embeddings(names, &embeddings)?;
        Ok(embeddings)
    }
}

fn validate_embeddings(names: &[String], embeddings: &[Vec<f32>]) -> Result<(), ResolveError> {
    if embeddings.len() != names.len() {
        return Err(ResolveError::VectorCount {
            expected: names.len(),
            got: embeddings.len(),
        });
    }

    let expected = embeddings.first().map(Vec::len).unwrap_or(0);
    for (name, vector) in names.iter().zip(embeddings) {
        if vector.is_empty() || vector.len() != expected {
            return Err(ResolveError::Dimension {
                name: name.clone(),
                expected,
                got: vector.len(),
            });
        }
    }

    Ok(())
}

/// Absorbs every later group member into the group's first member, provided
/// both are still in the table, then trims the surviving names. Names that
/// collide after trimming are not merged; the last one is kept.
pub fn merge_groups(entities: Vec<(String, CanonicalEntity)>, groups: &[Vec<usize>]) -> Resolution {
    let mut table: Vec<Option<(String, CanonicalEntity)>> = entities.into_iter().map(Some).collect();
    let mut absorbed = 0;

    for group in groups {
        let Some((&survivor, members)) = group.split_first() else {
            continue;
        };

        for &member in members {
            if member == survivor || table[survivor].is_none() {
                continue;
            }
            if let Some((name, entity)) = table[member].take() {
                debug!("Merging {:?} into {:?}", name, table[survivor].as_ref().map(|(n, _)| n));
                if let Some((_, target)) = table[survivor].as_mut() {
                    target.absorb(entity);
                }
                absorbed += 1;
            }
        }
    }

    let mut universities = Universities::new();
    for (name, entity) in table.into_iter().flatten() {
        let trimmed = name.trim().to_string();
        // Later entries replace earlier ones under the same trimmed name.
        if let Some(replaced) = universities.insert(trimmed.clone(), entity) {
            warn!(
                "Duplicate entity name after trimming, dropping {} ({} occurrences): {:?}",
                trimmed, replaced.count, replaced.init_names
            );
        }
    }

    Resolution {
        universities,
        rejected: Vec::new(),
        absorbed,
    }
}

pub fn run(args: ResolveArgs) -> Result<()> {
    crate::init_tracing();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(args))
}

pub async fn run_async(args: ResolveArgs) -> Result<()> {
    fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let raw: RawAffiliations = load_json(args.input.join(RAW_AFFILIATIONS_FILE))?;
    info!("Loaded {} raw affiliations", raw.len());

    let embedder = HttpEmbedder::new(
        args.embedding_url.clone(),
        args.model.clone(),
        args.batch_size,
        args.timeout,
    )?;

    let mut keywords = default_keywords();
    keywords.extend(args.keywords);

    let resolver = Resolver::new(
        embedder,
        ResolverConfig {
            keywords,
            threshold: args.threshold,
            grouping: args.grouping,
        },
    );

    let resolution = resolver.resolve(&raw).await?;

    save_json(args.output.join(UNIVERSITIES_FILE), &resolution.universities)?;

    info!(
        "Resolved {} canonical entities ({} merged, {} affiliations rejected)",
        resolution.universities.len(),
        resolution.absorbed,
        resolution.rejected.len()
    );

    Ok(())
}
