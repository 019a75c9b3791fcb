use anyhow::Result;
use clap::{Parser, Subcommand};
use quarry_core::persist::save_doc_meta;
use quarry_core::{build_index, BuildConfig, DocDisplay, IndexPaths};
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the inverted index and display metadata from a crawled corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index and document length table
    Build {
        /// Corpus directory of raw HTML files
        #[arg(long)]
        corpus: String,
        /// Output index directory
        #[arg(long)]
        index: String,
        /// File extension accepted as a document
        #[arg(long, default_value = "html")]
        extension: String,
    },
    /// Extract display titles and canonical URLs for the front end
    Meta {
        /// Corpus directory of raw HTML files
        #[arg(long)]
        corpus: String,
        /// Index directory receiving doc_meta.json
        #[arg(long)]
        index: String,
        /// File extension accepted as a document
        #[arg(long, default_value = "html")]
        extension: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            corpus,
            index,
            extension,
        } => {
            let mut config = BuildConfig::new(&corpus);
            config.extension = extension;
            let summary = build_index(&config, &IndexPaths::new(&index))?;
            tracing::info!(
                docs = summary.docs,
                terms = summary.terms,
                index,
                "index build complete"
            );
            Ok(())
        }
        Commands::Meta {
            corpus,
            index,
            extension,
        } => build_doc_meta(Path::new(&corpus), &IndexPaths::new(&index), &extension),
    }
}

fn build_doc_meta(corpus: &Path, paths: &IndexPaths, extension: &str) -> Result<()> {
    let sel_title = Selector::parse("title").expect("valid selector");
    let sel_canonical = Selector::parse(r#"link[rel="canonical"]"#).expect("valid selector");

    let mut meta: BTreeMap<String, DocDisplay> = BTreeMap::new();
    for entry in WalkDir::new(corpus)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(extension) {
            continue;
        }
        let Some(doc_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let raw = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unreadable document");
                continue;
            }
        };
        let doc = Html::parse_document(&String::from_utf8_lossy(&raw));
        let title = doc
            .select(&sel_title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| doc_id.to_string());
        let url = doc
            .select(&sel_canonical)
            .next()
            .and_then(|l| l.value().attr("href"))
            .unwrap_or_default()
            .to_string();
        meta.insert(doc_id.to_string(), DocDisplay { title, url });
    }

    tracing::info!(docs = meta.len(), "display metadata extracted");
    save_doc_meta(paths, &meta)?;
    Ok(())
}
