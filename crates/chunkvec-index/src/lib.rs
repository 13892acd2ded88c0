//! Corpus loader, vector kernels and exact top-k search for chunkvec.
//!
//! This crate provides:
//! - **Corpus format**: length-prefixed chunk records with f32 embeddings, read
//!   into one arena and normalized in place at load time.
//! - **Vector kernels**: scalar, 4-, 8- and 16-lane implementations built on
//!   `wide`, one of which is selected at build time.
//! - **Top-k search**: single linear scan with a bounded min-heap, filtered by
//!   embedding dimension.

pub mod corpus;
pub mod search;
pub mod simd;
pub mod topk;
pub mod writer;

pub use corpus::{Corpus, MIN_RECORD_BYTES, Record};
pub use search::search_with;
pub use simd::{
    ACTIVE_LEVEL, ActiveKernel, F32Bytes, F32BytesMut, F32Lanes, F32LanesMut, KernelLevel,
    Lanes4Kernel, Lanes8Kernel, Lanes16Kernel, ScalarKernel, VectorKernel, cosine_similarity,
    dot_product, l2_norm, normalize, normalized,
};
pub use topk::TopK;
pub use writer::{ChunkRecord, CorpusWriter};
