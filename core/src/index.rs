use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw term frequencies for one term, keyed by document id. Absent entries
/// mean frequency zero; stored frequencies are always >= 1.
pub type PostingMap = BTreeMap<String, u32>;

/// term -> document id -> raw term frequency. BTreeMaps keep serialization
/// key-ordered, so rebuilding an unchanged corpus reproduces the persisted
/// file byte for byte.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    pub terms: BTreeMap<String, PostingMap>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the (term, document) frequency counter by one.
    pub fn bump(&mut self, term: String, doc_id: &str) {
        *self
            .terms
            .entry(term)
            .or_default()
            .entry(doc_id.to_string())
            .or_insert(0) += 1;
    }

    /// Vocabulary size: count of distinct terms.
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Document frequency: how many documents contain `term`.
    pub fn df(&self, term: &str) -> usize {
        self.terms.get(term).map_or(0, |postings| postings.len())
    }

    pub fn validate(&self) -> Result<(), String> {
        for (term, postings) in &self.terms {
            if term.is_empty() {
                return Err("empty term".to_string());
            }
            if postings.is_empty() {
                return Err(format!("term {term:?} has no postings"));
            }
            for (doc_id, &tf) in postings {
                if tf == 0 {
                    return Err(format!("zero frequency for term {term:?} in {doc_id:?}"));
                }
            }
        }
        Ok(())
    }
}

/// document id -> token count. The canonical enumeration of all documents
/// known to the system.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocLengthTable {
    pub lengths: BTreeMap<String, u32>,
}

impl DocLengthTable {
    pub fn doc_count(&self) -> usize {
        self.lengths.len()
    }
}

/// Build summary persisted alongside the index. `fingerprint` hashes the
/// serialized index and length table and versions the norms cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub num_docs: u32,
    pub num_terms: u32,
    pub fingerprint: String,
    pub created_at: String,
    pub version: u32,
}

/// Display metadata for one document. Consumed only by the presentation
/// layer; the scoring core never reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDisplay {
    pub title: String,
    pub url: String,
}
