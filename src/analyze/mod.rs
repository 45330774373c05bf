use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::collabs::{CollabStats, Collaborations};
use crate::{load_json, save_json, Universities};
use crate::{ANALYSIS_FILE, COLLABS_FILE, UNIVERSITIES_FILE};

mod degree;
pub use degree::{connected_components, degree_histogram, degree_sequence, degrees};

pub const ALL_SUBJECTS: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollabEdge {
    pub source: String,
    pub target: String,
    pub subject: String,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectWeight {
    pub subject: String,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeBucket {
    pub degree: usize,
    pub nodes: usize,
}

/// Plot data for the subject histogram and the degree figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub entities: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub top_subjects: Vec<SubjectWeight>,
    pub distinct_subjects: usize,
    pub degree_rank: Vec<usize>,
    pub degree_histogram: Vec<DegreeBucket>,
    pub component_count: usize,
    pub largest_component: Vec<String>,
    /// Entities present in the collaboration map without any edge
    pub isolated: Vec<String>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Working directory (reads universities.json and collabs.json)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Working directory (writes analysis.json)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of subjects shown in the histogram
    #[arg(short = 'n', long, default_value = "10")]
    pub top_n: usize,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Working directory (reads universities.json and collabs.json)
    #[arg(short, long)]
    pub input: PathBuf,
}

/// One edge per stored subject plus an "All" edge carrying the pair's total.
/// Pairs are deduplicated on the unordered pair, so a file holding both
/// orientations only yields the first one met.
pub fn build_edges(collabs: &Collaborations) -> Vec<CollabEdge> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut edges = Vec::new();

    for (u1, partners) in collabs.iter() {
        for (u2, subjects) in partners {
            let key = if u1 <= u2 {
                (u1.as_str(), u2.as_str())
            } else {
                (u2.as_str(), u1.as_str())
            };
            if !seen.insert(key) {
                continue;
            }

            let mut overall = 0;
            for (subject, &weight) in subjects {
                edges.push(CollabEdge {
                    source: u1.clone(),
                    target: u2.clone(),
                    subject: subject.clone(),
                    weight,
                });
                overall += weight;
            }

            edges.push(CollabEdge {
                source: u1.clone(),
                target: u2.clone(),
                subject: ALL_SUBJECTS.to_string(),
                weight: overall,
            });
        }
    }

    edges
}

/// Total weight per subject, "All" excluded, heaviest first (ties by name).
pub fn subject_distribution(edges: &[CollabEdge], top_n: usize) -> Vec<SubjectWeight> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for edge in edges.iter().filter(|e| e.subject != ALL_SUBJECTS) {
        *totals.entry(edge.subject.as_str()).or_insert(0) += edge.weight;
    }

    let mut ordered: Vec<SubjectWeight> = totals
        .into_iter()
        .map(|(subject, weight)| SubjectWeight {
            subject: subject.to_string(),
            weight,
        })
        .collect();
    // Stable sort keeps the alphabetical order among equal weights.
    ordered.sort_by(|a, b| b.weight.cmp(&a.weight));
    ordered.truncate(top_n);
    ordered
}

pub fn analyze(universities: &Universities, collabs: &Collaborations, top_n: usize) -> AnalysisReport {
    let edges = build_edges(collabs);
    let degrees = degrees(&edges);
    let sequence = degree_sequence(&degrees);
    let components = connected_components(&edges);

    let distinct_subjects: BTreeSet<&str> = edges
        .iter()
        .map(|e| e.subject.as_str())
        .filter(|s| *s != ALL_SUBJECTS)
        .collect();

    let isolated = collabs
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !degrees.contains_key(name.as_str()))
        .cloned()
        .collect();

    AnalysisReport {
        entities: universities.len(),
        graph_nodes: degrees.len(),
        graph_edges: edges.len(),
        top_subjects: subject_distribution(&edges, top_n),
        distinct_subjects: distinct_subjects.len(),
        degree_histogram: degree_histogram(&sequence)
            .into_iter()
            .map(|(degree, nodes)| DegreeBucket { degree, nodes })
            .collect(),
        degree_rank: sequence,
        component_count: components.len(),
        largest_component: components.into_iter().next().unwrap_or_default(),
        isolated,
    }
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    crate::init_tracing();

    fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let universities: Universities = load_json(args.input.join(UNIVERSITIES_FILE))?;
    let collabs: Collaborations = load_json(args.input.join(COLLABS_FILE))?;

    let report = analyze(&universities, &collabs, args.top_n);

    for (rank, subject) in report.top_subjects.iter().enumerate() {
        info!("{:>3}. {} ({})", rank + 1, subject.subject, subject.weight);
    }
    info!(
        "Graph: {} nodes, {} edges, {} components (largest {}), {} isolated entities",
        report.graph_nodes,
        report.graph_edges,
        report.component_count,
        report.largest_component.len(),
        report.isolated.len()
    );
    if let Some(max) = report.degree_rank.first() {
        info!("Max degree: {}", max);
    }

    let output_path = args.output.join(ANALYSIS_FILE);
    save_json(&output_path, &report)?;
    info!("Output: {}", output_path.display());

    Ok(())
}

pub fn stats(universities: &Universities, collabs: &Collaborations) -> CollabStats {
    CollabStats {
        nodes: universities.len(),
        ..collabs.stats()
    }
}

pub fn run_stats(args: StatsArgs) -> Result<()> {
    let universities: Universities = load_json(args.input.join(UNIVERSITIES_FILE))?;
    let collabs: Collaborations = load_json(args.input.join(COLLABS_FILE))?;

    let stats = stats(&universities, &collabs);
    eprintln!(
        "Number of nodes: {}\nNumber of links (without fields): {}\nNumber of links (with fields): {}",
        stats.nodes, stats.links, stats.links_with_fields
    );

    Ok(())
}
