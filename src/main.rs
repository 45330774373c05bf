use affiliation_graph::{analyze, collabs, resolve, scrape};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "affiliation-graph")]
#[command(about = "Scrape article affiliations, resolve institutions, build and analyze the collaboration graph")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk search listings, count raw affiliations and save unprocessed links
    Scrape(scrape::ScrapeArgs),
    /// Resolve raw affiliations into canonical institutions
    Resolve(resolve::ResolveArgs),
    /// Count institution co-occurrences per subject
    Collabs(collabs::CollabsArgs),
    /// Subject histogram and degree distribution of the collaboration graph
    Analyze(analyze::AnalyzeArgs),
    /// Print node and link counts
    Stats(analyze::StatsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    match cli.command {
        Commands::Scrape(args) => scrape::run(args),
        Commands::Resolve(args) => resolve::run(args),
        Commands::Collabs(args) => collabs::run(args),
        Commands::Analyze(args) => analyze::run(args),
        Commands::Stats(args) => analyze::run_stats(args),
    }
}
