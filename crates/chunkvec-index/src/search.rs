//! Exact top-k search: one linear scan over the corpus.

use std::time::Instant;

use chunkvec_core::tracing_config::{TARGET_PREFIX, field_names, span_names};
use chunkvec_core::{Hit, SearchConfig, SearchResult};
use tracing::{debug, field};

use crate::corpus::Corpus;
use crate::simd::{ActiveKernel, VectorKernel};
use crate::topk::TopK;

/// Scores every record whose dimension equals `query.len()` with kernel `K`
/// and returns at most `k` best hits in heap order. Use
/// [`Corpus::search_ranked`] for sorted output.
///
/// Records of any other dimension are skipped without error. The query is used
/// as given: it must already be unit-normalized for scores to be cosine
/// similarities (see [`crate::simd::normalized`]).
///
/// # Errors
///
/// `AllocationFailed` if the selector's `min(k, corpus.len())` slots cannot
/// be reserved.
pub fn search_with<K: VectorKernel>(
    corpus: &Corpus,
    query: &[f32],
    k: usize,
) -> SearchResult<Vec<Hit>> {
    let span = tracing::debug_span!(
        target: TARGET_PREFIX,
        span_names::SEARCH,
        dimension = query.len(),
        k = k,
        kernel = K::LEVEL.name(),
        scanned = field::Empty,
        eligible = field::Empty,
        result_count = field::Empty,
        duration_us = field::Empty,
    );
    let _enter = span.enter();
    let started = Instant::now();

    let Ok(dimension) = u32::try_from(query.len()) else {
        return Ok(Vec::new());
    };

    let mut topk = TopK::new(k.min(corpus.len()))?;
    let mut eligible = 0_usize;
    for (index, record_dimension, embedding) in corpus.embeddings() {
        if record_dimension != dimension {
            continue;
        }
        eligible += 1;
        topk.offer(K::dot_product(query, &embedding), index);
    }

    let hits = topk.into_hits();
    span.record(field_names::SCANNED, corpus.len());
    span.record(field_names::ELIGIBLE, eligible);
    span.record(field_names::RESULT_COUNT, hits.len());
    span.record(
        field_names::DURATION_US,
        u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
    );
    debug!(target: TARGET_PREFIX, "search complete");
    Ok(hits)
}

impl Corpus {
    /// Top-`k` records by dot product with `query`, using the build's active
    /// kernel. Hits come back in heap order.
    ///
    /// `query` must be unit length; it is not normalized here.
    ///
    /// # Errors
    ///
    /// `AllocationFailed` if the result selector cannot be reserved.
    pub fn search(&self, query: &[f32], k: usize) -> SearchResult<Vec<Hit>> {
        search_with::<ActiveKernel>(self, query, k)
    }

    /// Like [`Corpus::search`], sorted by descending score (ties by index).
    ///
    /// # Errors
    ///
    /// As [`Corpus::search`].
    pub fn search_ranked(&self, query: &[f32], k: usize) -> SearchResult<Vec<Hit>> {
        let mut hits = self.search(query, k)?;
        chunkvec_core::rank_hits(&mut hits);
        Ok(hits)
    }

    /// Ranked search returning `config.default_k` hits.
    ///
    /// # Errors
    ///
    /// As [`Corpus::search`].
    pub fn search_default(&self, query: &[f32], config: &SearchConfig) -> SearchResult<Vec<Hit>> {
        self.search_ranked(query, config.default_k)
    }
}
