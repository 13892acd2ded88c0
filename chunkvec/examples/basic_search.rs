//! Basic search example: write a small corpus, load it, and query it.
//!
//! Embeddings here are toy 8-dim vectors built from keyword buckets, so the
//! example needs no embedding model.
//!
//! Run with: `cargo run --example basic_search`

use chunkvec::prelude::*;
use chunkvec::{ACTIVE_LEVEL, ChunkRecord, CorpusWriter};

const KEYWORDS: [&str; 8] = [
    "rust", "memory", "search", "vector", "network", "disk", "thread", "parse",
];

fn toy_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|kw| {
            let hits = lower.matches(kw).count();
            f32::from(u16::try_from(hits).unwrap_or(u16::MAX)) + 0.05
        })
        .collect()
}

fn main() -> SearchResult<()> {
    let chunks = [
        ("ownership", "src/borrow.rs", 1, 40, "Rust ownership keeps memory safe without a collector"),
        ("ann", "src/index.rs", 10, 88, "Vector search scans every vector and keeps the best"),
        ("io", "src/io.rs", 5, 31, "Read the whole file from disk into one buffer, then parse it"),
        ("pool", "src/pool.rs", 2, 57, "A thread pool spreads network requests across workers"),
        ("lexer", "src/lexer.rs", 1, 120, "Parse tokens with a hand written lexer in Rust"),
    ];

    let dir = std::env::temp_dir().join(format!("chunkvec-basic-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("chunks.bin");

    let mut writer = CorpusWriter::new();
    for (id, file, start_line, end_line, text) in chunks {
        let embedding = toy_embedding(text);
        writer.write_record(&ChunkRecord {
            id,
            parent: "demo",
            file,
            ext: "rs",
            start_line,
            end_line,
            text,
            embedding: &embedding,
        })?;
    }
    writer.finish_to_path(&path)?;

    let corpus = Corpus::load(&path)?;
    println!(
        "loaded {} chunks ({} bytes) with the {} kernel",
        corpus.len(),
        corpus.arena_len(),
        ACTIVE_LEVEL.name()
    );

    for question in ["how does rust manage memory", "search a vector", "parse a file from disk"] {
        let query = normalized(&toy_embedding(question));
        println!("\nquery: {question}");
        for hit in corpus.search_ranked(&query, 2)? {
            if let Some(record) = corpus.record(hit.index as usize) {
                println!(
                    "  {:.3}  {} {}:{}-{}  {}",
                    hit.score,
                    record.id(),
                    record.file(),
                    record.start_line(),
                    record.end_line(),
                    record.text()
                );
            }
        }
    }

    corpus.close();
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
