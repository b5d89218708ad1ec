use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;
use wikirel_core::persist::{self, GraphPaths};
use wikirel_core::store::SledStore;
use wikirel_core::{
    CategoryGraphBuilder, CategoryMember, ExplanationFormatter, Language, LinkDirection, LocalPage, MilneWittenMetric, NameSpace,
    PageId, PageSource, SrResult,
};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One line of a `.jsonl` dump.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Record {
    Page {
        lang: Language,
        id: PageId,
        title: String,
        #[serde(default = "default_namespace")]
        namespace: NameSpace,
        #[serde(default)]
        redirect_to: Option<PageId>,
        #[serde(default)]
        disambig: bool,
    },
    Link {
        lang: Language,
        src: PageId,
        dst: PageId,
    },
    Member {
        lang: Language,
        member_id: PageId,
        category_id: PageId,
    },
}

fn default_namespace() -> NameSpace { NameSpace::Article }

#[derive(Debug, Default)]
struct LoadCounts {
    pages: usize,
    links: usize,
    members: usize,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load page dumps, build category graphs and query relatedness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load pages, links and category memberships from JSONL files or a directory
    Load {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Store directory
        #[arg(long)]
        store: String,
    },
    /// Build and persist the ranked category graph of one language
    BuildGraph {
        #[arg(long)]
        store: String,
        #[arg(long)]
        lang: Language,
        /// Output graph directory
        #[arg(long)]
        output: String,
    },
    /// Milne-Witten relatedness of two pages
    Relatedness {
        #[arg(long)]
        store: String,
        #[arg(long)]
        lang: Language,
        #[arg(long)]
        a: PageId,
        #[arg(long)]
        b: PageId,
        /// Compare out-links instead of in-links
        #[arg(long, default_value_t = false)]
        out_links: bool,
        #[arg(long, default_value_t = false)]
        explain: bool,
        /// Average in-link and out-link scores
        #[arg(long, default_value_t = false, conflicts_with = "out_links")]
        combined: bool,
    },
    /// Pages most related to a page
    MostSimilar {
        #[arg(long)]
        store: String,
        #[arg(long)]
        lang: Language,
        #[arg(long)]
        id: PageId,
        #[arg(long, default_value_t = 10)]
        n: usize,
        #[arg(long, default_value_t = false)]
        out_links: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Load { input, store } => {
            let store = SledStore::open(&store)?;
            let counts = load(Path::new(&input), &store)?;
            tracing::info!(pages = counts.pages, links = counts.links, members = counts.members, "load complete");
            Ok(())
        }
        Commands::BuildGraph { store, lang, output } => build_graph(&store, &lang, &output),
        Commands::Relatedness { store, lang, a, b, out_links, explain, combined } => {
            let direction = (!combined).then(|| LinkDirection::from_out_links(out_links));
            relatedness(&store, &lang, a, b, direction, explain)
        }
        Commands::MostSimilar { store, lang, id, n, out_links } => {
            most_similar(&store, &lang, id, n, LinkDirection::from_out_links(out_links))
        }
    }
}

fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn load(input: &Path, store: &SledStore) -> Result<LoadCounts> {
    let files = input_files(input);
    if files.is_empty() {
        bail!("no .jsonl input found at {}", input.display());
    }
    let mut counts = LoadCounts::default();
    for file in files {
        tracing::info!(file = %file.display(), "loading");
        let reader = BufReader::new(File::open(&file)?);
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Record =
                serde_json::from_str(&line).with_context(|| format!("{}:{}: bad record", file.display(), n + 1))?;
            ingest(record, store, &mut counts)?;
        }
    }
    store.flush()?;
    Ok(counts)
}

fn ingest(record: Record, store: &SledStore, counts: &mut LoadCounts) -> Result<()> {
    match record {
        Record::Page { lang, id, title, namespace, redirect_to, disambig } => {
            let mut page = LocalPage::new(lang, id, title, namespace);
            page.redirect_to = redirect_to;
            page.disambig = disambig;
            store.put_page(&page)?;
            counts.pages += 1;
        }
        Record::Link { lang, src, dst } => {
            store.put_link(&lang, src, dst)?;
            counts.links += 1;
        }
        Record::Member { lang, member_id, category_id } => {
            store.put_membership(&lang, CategoryMember { member_id, category_id })?;
            counts.members += 1;
        }
    }
    Ok(())
}

fn build_graph(store: &str, lang: &Language, output: &str) -> Result<()> {
    let store = SledStore::open(store)?;
    let graph = CategoryGraphBuilder::new(&store, &store).build(lang)?;
    let meta = persist::save(&GraphPaths::new(output), &graph)?;
    tracing::info!(
        categories = meta.num_categories,
        edges = meta.num_edges,
        min_cost = ?meta.min_cost,
        output,
        "graph build complete"
    );
    Ok(())
}

/// `direction` of `None` combines both directions.
fn relatedness(store: &str, lang: &Language, a: PageId, b: PageId, direction: Option<LinkDirection>, explain: bool) -> Result<()> {
    let store = Arc::new(SledStore::open(store)?);
    let metric = MilneWittenMetric::new(Arc::clone(&store));
    let result = match direction {
        Some(direction) => metric.similarity_by_id(lang, a, b, direction, explain)?,
        None => metric.combined_similarity_by_id(lang, a, b, explain)?,
    };
    let formatter = ExplanationFormatter::new(store.as_ref());
    let explanations = result
        .explanations()
        .iter()
        .map(|e| formatter.format(lang, e))
        .collect::<Result<Vec<_>, _>>()?;
    let out = json!({ "a": a, "b": b, "score": finite(&result), "explanations": explanations });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn most_similar(store: &str, lang: &Language, id: PageId, n: usize, direction: LinkDirection) -> Result<()> {
    let store = Arc::new(SledStore::open(store)?);
    let Some(page) = store.resolve(lang, id)? else {
        bail!("no page {id} in {lang}");
    };
    let metric = MilneWittenMetric::new(Arc::clone(&store));
    let results = metric.most_similar(&page, direction, n, None)?;
    for result in results {
        let Some(other) = result.id else { continue };
        let title = store.page(lang, other)?.map(|p| p.title).unwrap_or_default();
        println!("{}", json!({ "id": other, "title": title, "score": finite(&result) }));
    }
    Ok(())
}

fn finite(result: &SrResult) -> Option<f64> { result.is_valid().then(|| result.score()) }
