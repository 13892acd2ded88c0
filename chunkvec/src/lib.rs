//! chunkvec: embedded exact nearest-neighbor search over chunked corpora.
//!
//! Loads a binary file of text chunks and their embeddings into a single
//! arena, normalizes every embedding once, and answers top-k queries with a
//! linear scan using the widest vector kernel the build target supports.
//!
//! ```no_run
//! use chunkvec::prelude::*;
//!
//! let corpus = Corpus::load("chunks.bin")?;
//! let query = normalized(&[0.1, 0.7, 0.2, 0.0]);
//! for hit in corpus.search_ranked(&query, 5)? {
//!     if let Some(record) = corpus.record(hit.index as usize) {
//!         println!("{:.3} {}:{}", hit.score, record.file(), record.start_line());
//!     }
//! }
//! # Ok::<(), chunkvec::SearchError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `scalar-kernel`: use the scalar kernel even when the target has vector
//!   extensions.

pub use chunkvec_core as core;
pub use chunkvec_index as index;

pub use chunkvec_core::{
    ChunkvecConfig, DimensionCount, Hit, LoadConfig, SearchConfig, SearchError, SearchResult,
    TrailingBytesPolicy, rank_hits,
};
pub use chunkvec_index::{
    ACTIVE_LEVEL, ChunkRecord, Corpus, CorpusWriter, KernelLevel, Record, TopK, cosine_similarity,
    dot_product, l2_norm, normalize, normalized,
};

/// Common imports for corpus loading and search.
pub mod prelude {
    pub use chunkvec_core::{Hit, LoadConfig, SearchConfig, SearchError, SearchResult};
    pub use chunkvec_index::{Corpus, Record, normalized};
}
