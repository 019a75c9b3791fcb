use crate::index::InvertedIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted norms cache. `fingerprint` records the index snapshot the norms
/// were computed against; a mismatch at load time means the index was
/// rebuilt and the cache must be recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormsFile {
    pub fingerprint: String,
    pub norms: BTreeMap<String, f64>,
}

/// TF-IDF vector magnitude per document:
/// w(t,d) = (1 + ln tf) * ln(N/df), ||d|| = sqrt(sum of w^2) over the terms
/// actually present in the document.
pub fn compute_doc_norms(index: &InvertedIndex, num_docs: usize) -> BTreeMap<String, f64> {
    let n = num_docs as f64;
    let mut norm_sq: BTreeMap<String, f64> = BTreeMap::new();

    for postings in index.terms.values() {
        let idf = (n / postings.len() as f64).ln();
        for (doc_id, &tf) in postings {
            let w = (1.0 + (tf as f64).ln()) * idf;
            *norm_sq.entry(doc_id.clone()).or_insert(0.0) += w * w;
        }
    }

    norm_sq
        .into_iter()
        .map(|(doc_id, sq)| (doc_id, sq.sqrt()))
        .collect()
}
