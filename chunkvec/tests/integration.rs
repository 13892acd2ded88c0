//! End-to-end tests for chunkvec: config → write → load → search → close.
//!
//! Coverage:
//! 1. Mixed-dimension corpus scenario
//! 2. Query contract (caller normalizes)
//! 3. Config-driven loading and `search_default`
//! 4. Concurrent searches over one shared corpus
//! 5. Hit serialization for downstream consumers

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chunkvec::core::config::load_from_str;
use chunkvec::prelude::*;
use chunkvec::{ChunkRecord, CorpusWriter, TrailingBytesPolicy, l2_norm};

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn embedding(seed: u16, dim: u16) -> Vec<f32> {
    (0..dim)
        .map(|j| ((f32::from(seed) + 1.0) * 0.31 * (f32::from(j) + 0.5)).sin())
        .collect()
}

fn write_corpus(path: &Path, dims: &[u16]) {
    let mut writer = CorpusWriter::new();
    for (seed, &dim) in (0_u16..).zip(dims) {
        let id = format!("c{seed}");
        let text = format!("chunk number {seed}");
        let emb = embedding(seed, dim);
        writer
            .write_record(&ChunkRecord {
                id: &id,
                parent: "repo",
                file: "lib/search.rs",
                ext: "rs",
                start_line: u32::from(seed) * 20 + 1,
                end_line: u32::from(seed) * 20 + 20,
                text: &text,
                embedding: &emb,
            })
            .expect("write record");
    }
    writer.finish_to_path(path).expect("write corpus");
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenario
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn mixed_dimension_corpus_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chunks.bin");

    let mut writer = CorpusWriter::new();
    for (id, emb) in [
        ("x-axis", vec![1.0_f32, 0.0, 0.0, 0.0]),
        ("y-axis", vec![0.0, 1.0, 0.0, 0.0]),
        ("short", vec![1.0, 0.0]),
    ] {
        writer
            .write_record(&ChunkRecord {
                id,
                embedding: &emb,
                ..ChunkRecord::default()
            })
            .expect("write");
    }
    writer.finish_to_path(&path).expect("finish");

    let corpus = Corpus::load(&path).expect("load");
    let hits = corpus.search_ranked(&[1.0, 0.0, 0.0, 0.0], 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].index, 0);
    assert!((hits[0].score - 1.0).abs() < 1e-3);
    assert_eq!(hits[1].index, 1);
    assert!(hits[1].score.abs() < 1e-3);

    let ids: Vec<String> = hits
        .iter()
        .filter_map(|h| corpus.record(h.index as usize))
        .map(|r| r.id().into_owned())
        .collect();
    assert_eq!(ids, vec!["x-axis", "y-axis"]);

    let dims = corpus.dimensions();
    assert_eq!(dims.len(), 2);
    assert_eq!((dims[0].dimension, dims[0].records), (2, 1));
    assert_eq!((dims[1].dimension, dims[1].records), (4, 2));

    corpus.close();
}

#[test]
fn unnormalized_query_scales_scores() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chunks.bin");
    write_corpus(&path, &[16; 12]);
    let corpus = Corpus::load(&path).expect("load");

    let raw = embedding(5, 16);
    let unit = normalized(&raw);
    let raw_norm = f64::from(l2_norm(&raw));

    let unit_hits = corpus.search_ranked(&unit, 3).expect("search");
    let raw_hits = corpus.search_ranked(&raw, 3).expect("search");
    assert_eq!(unit_hits[0].index, 5);
    assert!((unit_hits[0].score - 1.0).abs() < 1e-3);
    for (u, r) in unit_hits.iter().zip(&raw_hits) {
        assert_eq!(u.index, r.index);
        assert!(
            (r.score - u.score * raw_norm).abs() < 1e-3 * raw_norm,
            "raw={} unit={} norm={raw_norm}",
            r.score,
            u.score
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn config_drives_load_and_search() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chunks.bin");
    write_corpus(&path, &[8; 20]);
    let mut bytes = std::fs::read(&path).expect("read");
    bytes.push(0);
    std::fs::write(&path, &bytes).expect("append trailing byte");

    let toml = r#"
        [load]
        trailing_bytes = "reject"

        [search]
        default_k = 4
    "#;
    let env: HashMap<String, String> = HashMap::new();
    let loaded = load_from_str(Some(toml), &env).expect("config");
    assert_eq!(loaded.config.load.trailing_bytes, TrailingBytesPolicy::Reject);
    let err = Corpus::load_with(&path, &loaded.config.load).expect_err("trailing byte");
    assert!(matches!(err, SearchError::CorpusTrailingBytes { remaining: 1, .. }));

    let env: HashMap<String, String> =
        HashMap::from([("CHUNKVEC_TRAILING_BYTES".to_owned(), "ignore".to_owned())]);
    let loaded = load_from_str(Some(toml), &env).expect("config");
    let corpus = Corpus::load_with(&path, &loaded.config.load).expect("env override");
    let hits = corpus
        .search_default(&normalized(&embedding(3, 8)), &loaded.config.search)
        .expect("search");
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].index, 3);
}

// ═══════════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn concurrent_searches_share_one_corpus() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chunks.bin");
    let dims: Vec<u16> = (0..64).map(|i| if i % 4 == 0 { 12 } else { 48 }).collect();
    write_corpus(&path, &dims);
    let corpus = Corpus::load(&path).expect("load");

    let queries: Vec<Vec<f32>> = (1_u16..=8).map(|s| normalized(&embedding(s, 48))).collect();
    let expected: Vec<Vec<Hit>> = queries
        .iter()
        .map(|q| corpus.search_ranked(q, 5).expect("search"))
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = queries
            .iter()
            .map(|q| {
                let corpus = &corpus;
                scope.spawn(move || {
                    (0..20)
                        .map(|_| corpus.search_ranked(q, 5).expect("search"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for (handle, want) in handles.into_iter().zip(&expected) {
            for got in handle.join().expect("search thread") {
                assert_eq!(&got, want);
            }
        }
    });
}

#[test]
fn corpus_moves_into_arc_for_shared_ownership() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chunks.bin");
    write_corpus(&path, &[6; 10]);
    let corpus = Arc::new(Corpus::load(&path).expect("load"));

    let workers: Vec<_> = (0_u16..4)
        .map(|seed| {
            let corpus = Arc::clone(&corpus);
            std::thread::spawn(move || {
                corpus
                    .search_ranked(&normalized(&embedding(seed, 6)), 1)
                    .expect("search")
            })
        })
        .collect();
    for (seed, worker) in (0_u32..).zip(workers) {
        let hits = worker.join().expect("worker");
        assert_eq!(hits[0].index, seed);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn hits_serialize_for_consumers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chunks.bin");
    write_corpus(&path, &[4; 3]);
    let corpus = Corpus::load(&path).expect("load");
    let hits = corpus
        .search_ranked(&normalized(&embedding(1, 4)), 2)
        .expect("search");

    let json = serde_json::to_string(&hits).expect("serialize");
    let back: Vec<Hit> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, hits);
    assert!(json.starts_with(r#"[{"index":1,"score":"#), "{json}");
}
