use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search result types
// ---------------------------------------------------------------------------

/// A single top-k search result.
///
/// Carries only the positional record index and its score; resolve metadata
/// through the corpus that produced it. The index stays valid for as long as
/// that corpus is alive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Positional index of the record in the corpus.
    pub index: u32,
    /// Dot product between the query and the stored unit embedding. Equals the
    /// cosine similarity only when the query is unit-normalized as well.
    pub score: f64,
}

impl Hit {
    #[must_use]
    pub const fn new(index: u32, score: f64) -> Self {
        Self { index, score }
    }

    /// Ordering by score descending with NaN-safe semantics, ties broken by
    /// ascending index so ranked output is deterministic.
    #[must_use]
    pub fn cmp_by_score(&self, other: &Self) -> Ordering {
        let a = if self.score.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.score
        };
        let b = if other.score.is_nan() {
            f64::NEG_INFINITY
        } else {
            other.score
        };
        b.total_cmp(&a).then_with(|| self.index.cmp(&other.index))
    }
}

/// Sorts hits in place into rank order (best first).
pub fn rank_hits(hits: &mut [Hit]) {
    hits.sort_unstable_by(Hit::cmp_by_score);
}

/// Number of records sharing one embedding dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionCount {
    pub dimension: u32,
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_by_score_is_descending() {
        let high = Hit::new(3, 0.9);
        let low = Hit::new(1, 0.2);
        assert_eq!(high.cmp_by_score(&low), Ordering::Less);
        assert_eq!(low.cmp_by_score(&high), Ordering::Greater);
    }

    #[test]
    fn nan_sorts_last() {
        let real = Hit::new(0, -0.5);
        let nan = Hit::new(1, f64::NAN);
        assert_eq!(real.cmp_by_score(&nan), Ordering::Less);
    }

    #[test]
    fn ties_break_by_index() {
        let a = Hit::new(2, 0.5);
        let b = Hit::new(9, 0.5);
        assert_eq!(a.cmp_by_score(&b), Ordering::Less);
        assert_eq!(b.cmp_by_score(&a), Ordering::Greater);
    }

    #[test]
    fn rank_hits_orders_best_first() {
        let mut hits = vec![
            Hit::new(0, 0.1),
            Hit::new(1, 0.7),
            Hit::new(2, 0.4),
            Hit::new(3, 0.7),
        ];
        rank_hits(&mut hits);
        let order: Vec<u32> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn hit_serializes_to_json() {
        let hit = Hit::new(42, 0.75);
        let json = serde_json::to_string(&hit).expect("serialize");
        assert_eq!(json, r#"{"index":42,"score":0.75}"#);
        let back: Hit = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, hit);
    }
}
