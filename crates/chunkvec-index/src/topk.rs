//! Bounded top-k selection over a stream of scored candidates.

use chunkvec_core::{Hit, SearchError, SearchResult, rank_hits};

/// Retains the `k` highest-scoring candidates seen so far.
///
/// Storage is a min-heap keyed on score, so the weakest retained hit sits at
/// the root and each rejected candidate costs one comparison. The first `k`
/// candidates are appended without ordering; heap order is established once,
/// when the `k`-th arrives.
///
/// A candidate displaces the root only when strictly greater, so among equal
/// scores the first one offered is kept. NaN scores are never retained.
#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    items: Vec<Hit>,
}

impl TopK {
    /// Reserves storage for all `k` slots up front.
    ///
    /// # Errors
    ///
    /// `AllocationFailed` if `k` hits cannot be reserved.
    pub fn new(k: usize) -> SearchResult<Self> {
        let mut items = Vec::new();
        items
            .try_reserve_exact(k)
            .map_err(|_| SearchError::AllocationFailed {
                bytes: k.saturating_mul(std::mem::size_of::<Hit>()),
                what: "top-k selector",
            })?;
        Ok(Self { k, items })
    }

    /// Offers a candidate. Returns `true` if it is now retained.
    pub fn offer(&mut self, score: f64, index: u32) -> bool {
        if self.k == 0 || score.is_nan() {
            return false;
        }

        if self.items.len() < self.k {
            self.items.push(Hit::new(index, score));
            if self.items.len() == self.k {
                self.heapify();
            }
            return true;
        }

        if score > self.items[0].score {
            self.items[0] = Hit::new(index, score);
            self.sift_down(0);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of hits retained.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.k
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.k
    }

    /// Lowest retained score, or `None` when nothing is retained.
    #[must_use]
    pub fn min_score(&self) -> Option<f64> {
        if self.is_full() {
            return self.items.first().map(|hit| hit.score);
        }
        self.items.iter().map(|hit| hit.score).reduce(f64::min)
    }

    /// Consumes the selector, returning retained hits in heap order.
    #[must_use]
    pub fn into_hits(self) -> Vec<Hit> {
        self.items
    }

    /// Consumes the selector, returning hits by descending score (ties by
    /// ascending index).
    #[must_use]
    pub fn into_ranked(self) -> Vec<Hit> {
        let mut hits = self.items;
        rank_hits(&mut hits);
        hits
    }

    fn heapify(&mut self) {
        let len = self.items.len();
        if len < 2 {
            return;
        }
        for idx in (0..len / 2).rev() {
            self.sift_down(idx);
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < len && self.items[left].score < self.items[smallest].score {
                smallest = left;
            }
            if right < len && self.items[right].score < self.items[smallest].score {
                smallest = right;
            }

            if smallest == idx {
                break;
            }
            self.items.swap(idx, smallest);
            idx = smallest;
        }
    }
}
