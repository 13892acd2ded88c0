//! Encoder for the chunk corpus format, for fixtures and small tools.
//!
//! Embeddings are written exactly as given; normalization happens when the
//! corpus is loaded.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chunkvec_core::tracing_config::TARGET_PREFIX;
use chunkvec_core::{SearchError, SearchResult};
use tracing::debug;

/// One chunk to encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkRecord<'a> {
    pub id: &'a str,
    pub parent: &'a str,
    pub file: &'a str,
    pub ext: &'a str,
    pub start_line: u32,
    pub end_line: u32,
    pub text: &'a str,
    pub embedding: &'a [f32],
}

/// Accumulates records in memory, then emits the encoded corpus.
///
/// ```
/// use chunkvec_index::{ChunkRecord, Corpus, CorpusWriter};
///
/// let mut writer = CorpusWriter::new();
/// writer.write_record(&ChunkRecord {
///     id: "c0",
///     embedding: &[3.0, 4.0],
///     ..ChunkRecord::default()
/// })?;
/// let corpus = Corpus::from_bytes(writer.finish())?;
/// assert_eq!(corpus.len(), 1);
/// # Ok::<(), chunkvec_core::SearchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CorpusWriter {
    buf: Vec<u8>,
    count: u32,
}

impl Default for CorpusWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            // Record count, patched in `finish`.
            buf: vec![0; 4],
            count: 0,
        }
    }

    /// Appends one record. On error the writer is left unchanged.
    ///
    /// # Errors
    ///
    /// `RecordTooLarge` when a field or the record count overflows u32.
    pub fn write_record(&mut self, record: &ChunkRecord<'_>) -> SearchResult<()> {
        let next_count = self
            .count
            .checked_add(1)
            .ok_or(SearchError::RecordTooLarge {
                field: "record_count",
                len: (self.count as usize).saturating_add(1),
            })?;
        let id = prefix("id", record.id.len())?;
        let parent = prefix("parent", record.parent.len())?;
        let file = prefix("file", record.file.len())?;
        let ext = prefix("ext", record.ext.len())?;
        let text = prefix("text", record.text.len())?;
        let dim = prefix("embedding", record.embedding.len())?;

        for (len, bytes) in [
            (id, record.id),
            (parent, record.parent),
            (file, record.file),
            (ext, record.ext),
        ] {
            self.buf.extend_from_slice(&len.to_ne_bytes());
            self.buf.extend_from_slice(bytes.as_bytes());
        }
        self.buf.extend_from_slice(&record.start_line.to_ne_bytes());
        self.buf.extend_from_slice(&record.end_line.to_ne_bytes());
        self.buf.extend_from_slice(&text.to_ne_bytes());
        self.buf.extend_from_slice(record.text.as_bytes());
        self.buf.extend_from_slice(&dim.to_ne_bytes());
        for value in record.embedding {
            self.buf.extend_from_slice(&value.to_ne_bytes());
        }

        self.count = next_count;
        Ok(())
    }

    /// Records written so far.
    #[must_use]
    pub const fn record_count(&self) -> u32 {
        self.count
    }

    /// Returns the encoded corpus.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.buf[..4].copy_from_slice(&self.count.to_ne_bytes());
        self.buf
    }

    /// Writes the encoded corpus to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be created or written.
    pub fn finish_to_path(self, path: impl AsRef<Path>) -> SearchResult<()> {
        let path = path.as_ref();
        let count = self.count;
        let bytes = self.finish();
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&bytes)?;
        out.flush()?;
        debug!(
            target: TARGET_PREFIX,
            path = %path.display(),
            records = count,
            bytes = bytes.len(),
            "corpus written"
        );
        Ok(())
    }
}

fn prefix(field: &'static str, len: usize) -> SearchResult<u32> {
    u32::try_from(len).map_err(|_| SearchError::RecordTooLarge { field, len })
}
