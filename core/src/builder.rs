use crate::index::{DocLengthTable, IndexMeta, InvertedIndex};
use crate::persist::{encode_pretty, write_atomic, IndexPaths, StoreError};
use crate::tokenizer::tokenize_html;
use sha1::{Digest, Sha1};
use std::fs;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use walkdir::WalkDir;

/// Where the raw corpus lives and which files in it count as documents.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub corpus_dir: PathBuf,
    pub extension: String,
}

impl BuildConfig {
    pub fn new<P: Into<PathBuf>>(corpus_dir: P) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            extension: "html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    pub docs: usize,
    pub terms: usize,
}

/// Build the inverted index and document length table in one pass over the
/// corpus directory. Each eligible file becomes one document keyed by its
/// file stem; a file that cannot be read is skipped, so one bad document
/// does not lose the rest of the corpus. Both artifacts plus the build
/// metadata are persisted atomically under `paths`.
pub fn build_index(config: &BuildConfig, paths: &IndexPaths) -> Result<BuildSummary, StoreError> {
    let mut index = InvertedIndex::new();
    let mut lengths = DocLengthTable::default();

    for entry in WalkDir::new(&config.corpus_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) != Some(config.extension.as_str()) {
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
        let terms = tokenize_html(&String::from_utf8_lossy(&raw));

        lengths.lengths.insert(doc_id.to_string(), terms.len() as u32);
        for term in terms {
            index.bump(term, doc_id);
        }
    }

    let summary = BuildSummary {
        docs: lengths.doc_count(),
        terms: index.num_terms(),
    };
    tracing::info!(docs = summary.docs, terms = summary.terms, "corpus pass complete");

    let index_bytes = encode_pretty("inverted index", &index)?;
    let length_bytes = encode_pretty("document lengths", &lengths)?;
    let meta = IndexMeta {
        num_docs: summary.docs as u32,
        num_terms: summary.terms as u32,
        fingerprint: fingerprint(&index_bytes, &length_bytes),
        created_at: time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        version: 1,
    };
    let meta_bytes = encode_pretty("index meta", &meta)?;

    fs::create_dir_all(&paths.root)?;
    write_atomic(&paths.inverted_index(), &index_bytes)?;
    write_atomic(&paths.doc_lengths(), &length_bytes)?;
    write_atomic(&paths.meta(), &meta_bytes)?;

    Ok(summary)
}

fn fingerprint(index_bytes: &[u8], length_bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(index_bytes);
    hasher.update(length_bytes);
    format!("{:x}", hasher.finalize())
}
