//! Binary chunk corpus: one owned byte arena plus a table of record spans.
//!
//! ## Layout
//!
//! ```text
//! File   := record_count:u32 Record*
//! Record := LPStr(id) LPStr(parent) LPStr(file) LPStr(ext)
//!           start_line:u32 end_line:u32
//!           LPStr(text)
//!           dim:u32 f32[dim]
//! LPStr  := len:u32 bytes[len]
//! ```
//!
//! Integers and floats are in native byte order; there is no magic, version or
//! checksum, so a corpus written on a machine of the other endianness is
//! unreadable. Every length is validated against the remaining buffer before it
//! is used.
//!
//! Embeddings are normalized to unit length in place, inside the arena, as soon
//! as each one is parsed. Search relies on this: a dot product between a unit
//! query and a stored embedding is their cosine similarity.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chunkvec_core::tracing_config::{TARGET_PREFIX, field_names, span_names};
use chunkvec_core::{DimensionCount, LoadConfig, SearchError, SearchResult, TrailingBytesPolicy};
use tracing::{debug, warn};

use crate::simd::{ACTIVE_LEVEL, ActiveKernel, F32Bytes, F32BytesMut, VectorKernel};

const U32_BYTES: usize = size_of::<u32>();
const F32_BYTES: usize = size_of::<f32>();

/// Smallest possible encoded record: five string lengths, two line numbers
/// and the dimension, all empty.
pub const MIN_RECORD_BYTES: usize = 8 * U32_BYTES;

/// `(offset, len)` window into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteSpan {
    offset: usize,
    len: usize,
}

impl ByteSpan {
    fn slice(self, arena: &[u8]) -> &[u8] {
        &arena[self.offset..self.offset + self.len]
    }
}

/// Parsed record descriptor; all variable-length fields point into the arena.
#[derive(Debug, Clone, Copy)]
struct RecordSpan {
    id: ByteSpan,
    parent: ByteSpan,
    file: ByteSpan,
    ext: ByteSpan,
    start_line: u32,
    end_line: u32,
    text: ByteSpan,
    dimension: u32,
    embedding: ByteSpan,
}

/// A loaded corpus.
///
/// Owns the file contents and the record table; both are released together
/// when the corpus is dropped or passed to [`Corpus::close`]. The corpus never
/// changes after loading, so any number of threads may search it at once.
pub struct Corpus {
    arena: Vec<u8>,
    records: Vec<RecordSpan>,
    path: Option<PathBuf>,
}

impl fmt::Debug for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Corpus")
            .field("path", &self.path)
            .field("records", &self.records.len())
            .field("arena_bytes", &self.arena.len())
            .finish()
    }
}

impl Corpus {
    /// Loads a corpus file with the default [`LoadConfig`].
    ///
    /// # Errors
    ///
    /// See [`Corpus::load_with`].
    pub fn load(path: impl AsRef<Path>) -> SearchResult<Self> {
        Self::load_with(path, &LoadConfig::default())
    }

    /// Loads a corpus file.
    ///
    /// The whole file is read into a single allocation, then parsed. On any
    /// error nothing is retained.
    ///
    /// # Errors
    ///
    /// - `CorpusNotFound` if no file exists at `path`.
    /// - `CorpusTooLarge` if the file exceeds `config.max_corpus_bytes`.
    /// - `AllocationFailed` if the arena or record table cannot be reserved.
    /// - `CorpusTruncated` / `CorpusTrailingBytes` for malformed contents.
    /// - `Io` for any other read failure.
    pub fn load_with(path: impl AsRef<Path>, config: &LoadConfig) -> SearchResult<Self> {
        let path = path.as_ref();
        let span = tracing::info_span!(
            target: TARGET_PREFIX,
            span_names::LOAD,
            path = %path.display(),
            record_count = tracing::field::Empty,
            arena_bytes = tracing::field::Empty,
            kernel = ACTIVE_LEVEL.name(),
            duration_us = tracing::field::Empty,
        );
        let _enter = span.enter();
        let started = Instant::now();

        let arena = read_arena(path, config)?;
        let mut corpus = Self::parse(arena, config)?;
        corpus.path = Some(path.to_path_buf());

        span.record(field_names::RECORD_COUNT, corpus.len());
        span.record(field_names::ARENA_BYTES, corpus.arena_len());
        span.record(
            field_names::DURATION_US,
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        );
        debug!(
            target: TARGET_PREFIX,
            records = corpus.len(),
            arena_bytes = corpus.arena_len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// Parses an in-memory corpus with the default [`LoadConfig`].
    ///
    /// # Errors
    ///
    /// See [`Corpus::from_bytes_with`].
    pub fn from_bytes(bytes: Vec<u8>) -> SearchResult<Self> {
        Self::from_bytes_with(bytes, &LoadConfig::default())
    }

    /// Parses an in-memory corpus. `bytes` becomes the arena without copying.
    ///
    /// `config.max_corpus_bytes` is not applied here; the buffer already
    /// exists.
    ///
    /// # Errors
    ///
    /// `CorpusTruncated`, `CorpusTrailingBytes` or `AllocationFailed`.
    pub fn from_bytes_with(bytes: Vec<u8>, config: &LoadConfig) -> SearchResult<Self> {
        Self::parse(bytes, config)
    }

    /// Releases the corpus. Equivalent to dropping it.
    pub fn close(self) {
        let _span = tracing::debug_span!(
            target: TARGET_PREFIX,
            span_names::CLOSE,
            record_count = self.records.len(),
            arena_bytes = self.arena.len(),
        )
        .entered();
        drop(self);
    }

    fn parse(mut arena: Vec<u8>, config: &LoadConfig) -> SearchResult<Self> {
        let mut reader = Reader::new(arena.len());
        let count = reader.u32(&arena, "record_count")?;
        let count = count as usize;

        let needed = count.saturating_mul(MIN_RECORD_BYTES);
        if needed > reader.remaining() {
            return Err(SearchError::CorpusTruncated {
                record: None,
                field: "record_table",
                offset: reader.pos,
                needed,
                available: reader.remaining(),
            });
        }

        let mut records = Vec::new();
        records
            .try_reserve_exact(count)
            .map_err(|_| SearchError::AllocationFailed {
                bytes: count.saturating_mul(size_of::<RecordSpan>()),
                what: "record table",
            })?;

        for index in 0..count {
            reader.record = u32::try_from(index).ok();
            let record = reader.record_span(&arena)?;
            normalize_embedding(&mut arena, record.embedding);
            records.push(record);
        }

        if reader.remaining() > 0 {
            let offset = reader.pos;
            let remaining = reader.remaining();
            match config.trailing_bytes {
                TrailingBytesPolicy::Ignore => {
                    warn!(
                        target: TARGET_PREFIX,
                        offset,
                        remaining,
                        "ignoring trailing bytes after last corpus record"
                    );
                }
                TrailingBytesPolicy::Reject => {
                    return Err(SearchError::CorpusTrailingBytes { offset, remaining });
                }
            }
        }

        Ok(Self {
            arena,
            records,
            path: None,
        })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the arena in bytes (the whole file).
    #[must_use]
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    /// Source path, `None` for corpora built from bytes.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record at positional `index`, or `None` when out of range.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        let span = self.records.get(index)?;
        Some(Record {
            arena: &self.arena,
            index: u32::try_from(index).ok()?,
            span,
        })
    }

    /// All records in file order.
    pub fn records(&self) -> impl ExactSizeIterator<Item = Record<'_>> + '_ {
        self.records.iter().enumerate().map(|(index, span)| Record {
            arena: &self.arena,
            // The table never holds more than u32::MAX records.
            index: u32::try_from(index).unwrap_or(u32::MAX),
            span,
        })
    }

    /// Distinct embedding dimensionalities, ascending, with how many records
    /// have each. A query is only matched against records of its own length.
    #[must_use]
    pub fn dimensions(&self) -> Vec<DimensionCount> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.dimension).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(dimension, records)| DimensionCount { dimension, records })
            .collect()
    }

    /// `(index, dimension, embedding)` for every record, in file order.
    pub(crate) fn embeddings(&self) -> impl Iterator<Item = (u32, u32, F32Bytes<'_>)> + '_ {
        self.records.iter().zip(0_u32..).map(|(span, index)| {
            (index, span.dimension, embedding_view(&self.arena, span.embedding))
        })
    }
}

/// Borrowed view of one record. Cannot outlive the corpus.
#[derive(Clone, Copy)]
pub struct Record<'a> {
    arena: &'a [u8],
    index: u32,
    span: &'a RecordSpan,
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("index", &self.index)
            .field("id", &self.id())
            .field("file", &self.file())
            .field("lines", &(self.start_line()..=self.end_line()))
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl<'a> Record<'a> {
    /// Positional index, as reported in search hits.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn id(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.id_bytes())
    }

    #[must_use]
    pub fn parent(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.parent_bytes())
    }

    /// Source file path.
    #[must_use]
    pub fn file(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.file_bytes())
    }

    /// File extension.
    #[must_use]
    pub fn ext(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.ext_bytes())
    }

    /// Chunk text.
    #[must_use]
    pub fn text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.text_bytes())
    }

    #[must_use]
    pub fn id_bytes(&self) -> &'a [u8] {
        self.span.id.slice(self.arena)
    }

    #[must_use]
    pub fn parent_bytes(&self) -> &'a [u8] {
        self.span.parent.slice(self.arena)
    }

    #[must_use]
    pub fn file_bytes(&self) -> &'a [u8] {
        self.span.file.slice(self.arena)
    }

    #[must_use]
    pub fn ext_bytes(&self) -> &'a [u8] {
        self.span.ext.slice(self.arena)
    }

    #[must_use]
    pub fn text_bytes(&self) -> &'a [u8] {
        self.span.text.slice(self.arena)
    }

    #[must_use]
    pub const fn start_line(&self) -> u32 {
        self.span.start_line
    }

    /// Not checked against `start_line`.
    #[must_use]
    pub const fn end_line(&self) -> u32 {
        self.span.end_line
    }

    /// Embedding dimensionality.
    #[must_use]
    pub const fn dimension(&self) -> u32 {
        self.span.dimension
    }

    /// Normalized embedding as raw native-endian bytes.
    #[must_use]
    pub fn embedding_bytes(&self) -> &'a [u8] {
        self.span.embedding.slice(self.arena)
    }

    /// Normalized embedding viewed as f32 lanes, without copying.
    #[must_use]
    pub fn embedding(&self) -> F32Bytes<'a> {
        embedding_view(self.arena, self.span.embedding)
    }

    /// Normalized embedding decoded into an owned vector.
    #[must_use]
    pub fn embedding_to_vec(&self) -> Vec<f32> {
        self.embedding().to_vec()
    }
}

// Embedding spans always cover whole f32 values.
fn embedding_view(arena: &[u8], span: ByteSpan) -> F32Bytes<'_> {
    F32Bytes::truncated(span.slice(arena))
}

fn normalize_embedding(arena: &mut [u8], span: ByteSpan) {
    let mut view = F32BytesMut::truncated(&mut arena[span.offset..span.offset + span.len]);
    ActiveKernel::normalize(&mut view);
}

fn read_arena(path: &Path, config: &LoadConfig) -> SearchResult<Vec<u8>> {
    let file = File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => SearchError::CorpusNotFound {
            path: path.to_path_buf(),
        },
        _ => SearchError::Io(err),
    })?;

    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(SearchError::Io(io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("{} is a directory, not a corpus file", path.display()),
        )));
    }
    let size = metadata.len();
    if size > config.max_corpus_bytes {
        return Err(SearchError::CorpusTooLarge {
            path: path.to_path_buf(),
            size,
            limit: config.max_corpus_bytes,
        });
    }

    let bytes = usize::try_from(size).map_err(|_| SearchError::AllocationFailed {
        bytes: usize::MAX,
        what: "corpus arena",
    })?;
    let mut arena = Vec::new();
    arena
        .try_reserve_exact(bytes)
        .map_err(|_| SearchError::AllocationFailed {
            bytes,
            what: "corpus arena",
        })?;

    // The file may have grown since `metadata`; never read past the limit.
    let limit = config.max_corpus_bytes.saturating_add(1);
    file.take(limit).read_to_end(&mut arena)?;
    let read = arena.len() as u64;
    if read > config.max_corpus_bytes {
        return Err(SearchError::CorpusTooLarge {
            path: path.to_path_buf(),
            size: read,
            limit: config.max_corpus_bytes,
        });
    }
    Ok(arena)
}

/// Bounds-checked forward cursor over the arena.
///
/// Holds only positions so the arena can be borrowed mutably between reads.
struct Reader {
    pos: usize,
    end: usize,
    record: Option<u32>,
}

impl Reader {
    const fn new(end: usize) -> Self {
        Self {
            pos: 0,
            end,
            record: None,
        }
    }

    const fn remaining(&self) -> usize {
        self.end - self.pos
    }

    fn take(&mut self, field: &'static str, needed: usize) -> SearchResult<ByteSpan> {
        let available = self.remaining();
        if needed > available {
            return Err(SearchError::CorpusTruncated {
                record: self.record,
                field,
                offset: self.pos,
                needed,
                available,
            });
        }
        let span = ByteSpan {
            offset: self.pos,
            len: needed,
        };
        self.pos += needed;
        Ok(span)
    }

    fn u32(&mut self, arena: &[u8], field: &'static str) -> SearchResult<u32> {
        let b = self.take(field, U32_BYTES)?.slice(arena);
        Ok(u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn lp_str(&mut self, arena: &[u8], field: &'static str) -> SearchResult<ByteSpan> {
        let len = self.u32(arena, field)? as usize;
        self.take(field, len)
    }

    fn record_span(&mut self, arena: &[u8]) -> SearchResult<RecordSpan> {
        let id = self.lp_str(arena, "id")?;
        let parent = self.lp_str(arena, "parent")?;
        let file = self.lp_str(arena, "file")?;
        let ext = self.lp_str(arena, "ext")?;
        let start_line = self.u32(arena, "start_line")?;
        let end_line = self.u32(arena, "end_line")?;
        let text = self.lp_str(arena, "text")?;
        let dimension = self.u32(arena, "dimension")?;
        let embedding_len = (dimension as usize)
            .checked_mul(F32_BYTES)
            .unwrap_or(usize::MAX);
        let embedding = self.take("embedding", embedding_len)?;
        Ok(RecordSpan {
            id,
            parent,
            file,
            ext,
            start_line,
            end_line,
            text,
            dimension,
            embedding,
        })
    }
}
