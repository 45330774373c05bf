use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use crate::{save_json, RawAffiliations, LINKS_FILE, RAW_AFFILIATIONS_FILE};

mod client;
mod parser;
mod sampler;
pub use client::{DocumentSource, NatureClient, SearchQuery};
pub use parser::{parse_article, parse_listing};
pub use sampler::{subject_seed, Sampler, SeededSampler};

/// Search and sampling options shared by `scrape` and `collabs`.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Publisher base URL
    #[arg(short = 'u', long, default_value = "https://www.nature.com")]
    pub base_url: String,

    /// Journal filter of the search listing
    #[arg(long, default_value = "srep")]
    pub journal: String,

    /// Article type filter of the search listing
    #[arg(long, default_value = "research")]
    pub article_type: String,

    /// Subject filter of the search listing (also seeds the sampler)
    #[arg(long, default_value = "mathematics-and-computing")]
    pub subject: String,

    /// Date range filter of the search listing
    #[arg(long, default_value = "last_year")]
    pub date_range: String,

    /// Listing order
    #[arg(long, default_value = "relevance")]
    pub order: String,

    /// Probability that a discovered article is processed now
    #[arg(long, default_value = "0.5")]
    pub sample_rate: f64,

    /// Sampler seed (defaults to a hash of the subject)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many listing pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "30")]
    pub timeout: u64,
}

impl SourceArgs {
    pub fn client(&self) -> Result<NatureClient> {
        let query = SearchQuery {
            journal: self.journal.clone(),
            article_type: self.article_type.clone(),
            subject: self.subject.clone(),
            date_range: self.date_range.clone(),
            order: self.order.clone(),
        };
        NatureClient::new(self.base_url.clone(), query, self.timeout)
    }

    pub fn sampler(&self) -> SeededSampler {
        match self.seed {
            Some(seed) => SeededSampler::new(seed, self.sample_rate),
            None => SeededSampler::for_subject(&self.subject, self.sample_rate),
        }
    }
}

#[derive(Args)]
pub struct ScrapeArgs {
    /// Working directory (writes raw_affiliations.json and links.json)
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// One article link found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// 1-based position across the whole listing walk
    pub index: u64,
    pub href: String,
    pub selected: bool,
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    Ok(pb)
}

/// Walks listing pages from 1 until an empty page, asking the sampler about
/// every article. A failing listing page aborts the walk.
pub async fn discover<S, R>(
    source: &S,
    sampler: &mut R,
    max_pages: Option<u32>,
) -> Result<Vec<Discovered>>
where
    S: DocumentSource + Sync,
    R: Sampler,
{
    let mut discovered = Vec::new();
    let mut index = 1u64;
    let mut page = 1u32;

    loop {
        if max_pages.is_some_and(|max| page > max) {
            break;
        }

        let hrefs = source
            .fetch_listing(page)
            .await
            .with_context(|| format!("Failed to fetch listing page {}", page))?;

        if hrefs.is_empty() {
            break;
        }

        for href in hrefs {
            let selected = sampler.select(index);
            discovered.push(Discovered {
                index,
                href,
                selected,
            });
            index += 1;
        }
        page += 1;
    }

    info!(
        "Discovered {} articles on {} listing pages",
        discovered.len(),
        page - 1
    );
    Ok(discovered)
}

/// Fetches every href and counts its affiliations. Articles that fail to
/// fetch are logged and left out.
pub async fn aggregate_affiliations<S>(source: &S, hrefs: &[String]) -> Result<RawAffiliations>
where
    S: DocumentSource + Sync,
{
    let mut raw = RawAffiliations::new();
    let pb = spinner()?;

    for (done, href) in hrefs.iter().enumerate() {
        match source.fetch_article(href).await {
            Ok(document) => raw.observe_document(&document),
            Err(e) => error!("Parse page {}: {:#}", href, e),
        }
        pb.set_message(format!(
            "{} articles and {} affiliations found",
            done + 1,
            raw.len()
        ));
        pb.tick();
    }

    pb.finish_and_clear();
    Ok(raw)
}

pub fn run(args: ScrapeArgs) -> Result<()> {
    crate::init_tracing();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(args))
}

pub async fn run_async(args: ScrapeArgs) -> Result<()> {
    fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let client = args.source.client()?;
    let mut sampler = args.source.sampler();

    let discovered = discover(&client, &mut sampler, args.source.max_pages).await?;
    let (selected, saved): (Vec<_>, Vec<_>) = discovered.into_iter().partition(|d| d.selected);

    let selected: Vec<String> = selected.into_iter().map(|d| d.href).collect();
    let links: Vec<String> = saved.into_iter().map(|d| d.href).collect();

    let raw = aggregate_affiliations(&client, &selected).await?;

    save_json(args.output.join(RAW_AFFILIATIONS_FILE), &raw)?;
    save_json(args.output.join(LINKS_FILE), &links)?;

    info!(
        "Scraped {} articles: {} distinct affiliations, {} links saved",
        selected.len(),
        raw.len(),
        links.len()
    );
    info!("Output: {}", args.output.display());

    Ok(())
}
