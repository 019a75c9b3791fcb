//! Retrieval core: tokenizer, index builder, persisted index artifacts, and
//! the two ranking models (TF-IDF cosine and Laplace-smoothed query
//! likelihood) that consume them.

pub mod builder;
pub mod index;
pub mod norms;
pub mod persist;
pub mod search;
pub mod tokenizer;

pub use builder::{build_index, BuildConfig, BuildSummary};
pub use index::{DocDisplay, DocLengthTable, IndexMeta, InvertedIndex};
pub use persist::{IndexPaths, StoreError};
pub use search::{Hit, Searcher};
