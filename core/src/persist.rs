use crate::index::{DocDisplay, DocLengthTable, IndexMeta, InvertedIndex};
use crate::norms::NormsFile;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index artifact missing: {path} (build the index first)")]
    MissingIndex { path: PathBuf },
    #[error("malformed index artifact {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid index artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("could not encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// All persisted artifacts live under one index directory; every operation
/// receives this explicitly rather than reading process-wide defaults.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
    pub fn inverted_index(&self) -> PathBuf {
        self.root.join("inverted_index.json")
    }
    pub fn doc_lengths(&self) -> PathBuf {
        self.root.join("doc_lengths.json")
    }
    pub fn doc_norms(&self) -> PathBuf {
        self.root.join("doc_norms.json")
    }
    pub fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
    pub fn doc_meta(&self) -> PathBuf {
        self.root.join("doc_meta.json")
    }
}

/// Write next to the destination and rename into place, so a concurrent
/// reader never observes a partially written snapshot.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

pub fn encode_pretty<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode { what, source })
}

fn load_json<T: DeserializeOwned>(path: PathBuf) -> Result<T, StoreError> {
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::MissingIndex { path })
        }
        Err(err) => return Err(err.into()),
    };
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex, StoreError> {
    let path = paths.inverted_index();
    let index: InvertedIndex = load_json(path.clone())?;
    index
        .validate()
        .map_err(|reason| StoreError::Invalid { path, reason })?;
    Ok(index)
}

pub fn load_doc_lengths(paths: &IndexPaths) -> Result<DocLengthTable, StoreError> {
    load_json(paths.doc_lengths())
}

pub fn load_meta(paths: &IndexPaths) -> Result<IndexMeta, StoreError> {
    load_json(paths.meta())
}

pub fn load_norms(paths: &IndexPaths) -> Result<NormsFile, StoreError> {
    load_json(paths.doc_norms())
}

pub fn save_norms(paths: &IndexPaths, file: &NormsFile) -> Result<(), StoreError> {
    fs::create_dir_all(&paths.root)?;
    let bytes =
        serde_json::to_vec(file).map_err(|source| StoreError::Encode { what: "document norms", source })?;
    write_atomic(&paths.doc_norms(), &bytes)?;
    Ok(())
}

pub fn load_doc_meta(paths: &IndexPaths) -> Result<BTreeMap<String, DocDisplay>, StoreError> {
    load_json(paths.doc_meta())
}

pub fn save_doc_meta(
    paths: &IndexPaths,
    meta: &BTreeMap<String, DocDisplay>,
) -> Result<(), StoreError> {
    fs::create_dir_all(&paths.root)?;
    let bytes = encode_pretty("display metadata", meta)?;
    write_atomic(&paths.doc_meta(), &bytes)?;
    Ok(())
}
