use crate::index::{DocLengthTable, IndexMeta, InvertedIndex};
use crate::norms::{compute_doc_norms, NormsFile};
use crate::persist::{self, IndexPaths, StoreError};
use crate::tokenizer::tokenize;
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub doc_id: String,
    pub score: f64,
}

/// Read-only view over one persisted index snapshot. Queries are stateless
/// against the loaded snapshot; the only mutable state is the lazily built
/// document norms cache shared across queries.
#[derive(Debug)]
pub struct Searcher {
    paths: IndexPaths,
    index: InvertedIndex,
    doc_lengths: DocLengthTable,
    meta: IndexMeta,
    norms: RwLock<Option<Arc<BTreeMap<String, f64>>>>,
}

impl Searcher {
    /// Load the persisted snapshot. Fails with `MissingIndex` when the index
    /// has not been built yet and with `Invalid` when the artifacts disagree
    /// with each other.
    pub fn open(paths: IndexPaths) -> Result<Self, StoreError> {
        let index = persist::load_index(&paths)?;
        let doc_lengths = persist::load_doc_lengths(&paths)?;
        let meta = persist::load_meta(&paths)?;

        for postings in index.terms.values() {
            for doc_id in postings.keys() {
                if !doc_lengths.lengths.contains_key(doc_id) {
                    return Err(StoreError::Invalid {
                        path: paths.inverted_index(),
                        reason: format!("posting references unknown document {doc_id:?}"),
                    });
                }
            }
        }

        Ok(Self {
            paths,
            index,
            doc_lengths,
            meta,
            norms: RwLock::new(None),
        })
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// TF-IDF cosine ranking. Only documents sharing at least one query term
    /// are candidates; a query with no letter tokens, or none that appear in
    /// the vocabulary, yields an empty result rather than an error.
    pub fn score_vsm(&self, query: &str, k: usize) -> Vec<Hit> {
        let q_tf = query_tf(query);
        if q_tf.is_empty() {
            return Vec::new();
        }
        let norms = self.doc_norms();
        let n = self.doc_lengths.doc_count() as f64;

        let mut dots: HashMap<&String, f64> = HashMap::new();
        let mut q_norm_sq = 0.0;
        for (term, &tf_q) in &q_tf {
            let Some(postings) = self.index.terms.get(term) else {
                continue;
            };
            let idf = (n / postings.len() as f64).ln();
            let w_q = (1.0 + (tf_q as f64).ln()) * idf;
            q_norm_sq += w_q * w_q;
            for (doc_id, &tf_d) in postings {
                let w_d = (1.0 + (tf_d as f64).ln()) * idf;
                *dots.entry(doc_id).or_insert(0.0) += w_q * w_d;
            }
        }

        let q_norm = q_norm_sq.sqrt();
        if q_norm == 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<Hit> = dots
            .into_iter()
            .filter_map(|(doc_id, dot)| {
                let d_norm = norms.get(doc_id).copied().unwrap_or(0.0);
                if d_norm == 0.0 {
                    return None;
                }
                Some(Hit {
                    doc_id: doc_id.clone(),
                    score: dot / (q_norm * d_norm),
                })
            })
            .collect();
        rank(&mut hits, k);
        hits
    }

    /// Laplace-smoothed query likelihood:
    /// score(d) = -|q| * ln(|d| + V) + sum over query terms of
    /// count_q(t) * ln(tf(t,d) + 1).
    /// Every known document receives the base score, since add-one smoothing
    /// leaves no term with zero probability; only the posting corrections
    /// are sparse.
    pub fn score_qlm(&self, query: &str, k: usize) -> Vec<Hit> {
        let q_tf = query_tf(query);
        if q_tf.is_empty() {
            return Vec::new();
        }
        let v = self.index.num_terms() as f64;
        let q_len: u32 = q_tf.values().sum();

        let mut scores: HashMap<&String, f64> = self
            .doc_lengths
            .lengths
            .iter()
            .map(|(doc_id, &len)| (doc_id, -(q_len as f64) * (len as f64 + v).ln()))
            .collect();
        for (term, &count) in &q_tf {
            let Some(postings) = self.index.terms.get(term) else {
                continue;
            };
            for (doc_id, &tf) in postings {
                if let Some(score) = scores.get_mut(doc_id) {
                    *score += count as f64 * (tf as f64 + 1.0).ln();
                }
            }
        }

        let mut hits: Vec<Hit> = scores
            .into_iter()
            .map(|(doc_id, score)| Hit {
                doc_id: doc_id.clone(),
                score,
            })
            .collect();
        rank(&mut hits, k);
        hits
    }

    /// Lazily loaded document norms. The persisted cache is reused only when
    /// its fingerprint matches the loaded index; a stale, missing, or
    /// unreadable cache is recomputed from the in-memory index and written
    /// back.
    fn doc_norms(&self) -> Arc<BTreeMap<String, f64>> {
        if let Some(norms) = self.norms.read().as_ref() {
            return Arc::clone(norms);
        }
        let mut slot = self.norms.write();
        if let Some(norms) = slot.as_ref() {
            return Arc::clone(norms);
        }
        let table = match persist::load_norms(&self.paths) {
            Ok(file) if file.fingerprint == self.meta.fingerprint => file.norms,
            Ok(_) => {
                tracing::info!("norms cache stale, recomputing");
                self.rebuild_norms_cache()
            }
            Err(StoreError::MissingIndex { .. }) => self.rebuild_norms_cache(),
            Err(err) => {
                tracing::warn!(%err, "norms cache unreadable, recomputing");
                self.rebuild_norms_cache()
            }
        };
        let table = Arc::new(table);
        *slot = Some(Arc::clone(&table));
        table
    }

    fn rebuild_norms_cache(&self) -> BTreeMap<String, f64> {
        let norms = compute_doc_norms(&self.index, self.doc_lengths.doc_count());
        let file = NormsFile {
            fingerprint: self.meta.fingerprint.clone(),
            norms,
        };
        // The cache is an optimization; the query is still answered from the
        // in-memory table if the write fails.
        if let Err(err) = persist::save_norms(&self.paths, &file) {
            tracing::warn!(%err, "could not persist norms cache");
        }
        file.norms
    }
}

fn query_tf(query: &str) -> HashMap<String, u32> {
    let mut tf = HashMap::new();
    for term in tokenize(query) {
        *tf.entry(term).or_insert(0) += 1;
    }
    tf
}

/// Descending score, equal scores by ascending document id, truncated to
/// `k`. Both scorers share this order so results are reproducible.
fn rank(hits: &mut Vec<Hit>, k: usize) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    hits.truncate(k);
}
