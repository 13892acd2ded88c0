use std::path::PathBuf;

/// Unified error type covering every failure mode of corpus loading and search.
///
/// Every variant carries enough context to act on. Loading either yields a
/// complete corpus or one of these errors; there is no partially loaded state.
/// A record whose dimensionality differs from the query is not an error at all:
/// search skips it silently.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    // === Load errors ===
    /// No corpus file exists at the given path.
    #[error("Corpus not found at {path}. Check the path or regenerate the chunk corpus.")]
    CorpusNotFound {
        /// Path that was attempted.
        path: PathBuf,
    },

    /// A length prefix, fixed-width field or embedding extends past the end of
    /// the buffer.
    #[error(
        "Corpus truncated while reading {field}{}: need {needed} bytes at offset {offset}, only {available} available. The file is corrupt or was cut short; regenerate it.",
        .record.map_or_else(String::new, |r| format!(" of record {r}"))
    )]
    CorpusTruncated {
        /// Record being parsed, `None` for the file header.
        record: Option<u32>,
        /// Which field overran.
        field: &'static str,
        /// Byte offset at which the field starts.
        offset: usize,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the buffer from `offset`.
        available: usize,
    },

    /// Bytes remain after the last declared record and the load policy rejects them.
    #[error(
        "Corpus has {remaining} trailing bytes after the last record (offset {offset}). Set load.trailing_bytes = \"ignore\" to accept them."
    )]
    CorpusTrailingBytes {
        /// Offset of the first unparsed byte.
        offset: usize,
        /// Number of unparsed bytes.
        remaining: usize,
    },

    /// The corpus file exceeds the configured size ceiling.
    #[error(
        "Corpus at {path} is {size} bytes, above the {limit}-byte limit. Raise load.max_corpus_bytes."
    )]
    CorpusTooLarge {
        /// Path of the oversized file.
        path: PathBuf,
        /// Actual file size.
        size: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// An allocation could not be satisfied.
    #[error("Failed to allocate {bytes} bytes for the {what}. Free memory or load a smaller corpus.")]
    AllocationFailed {
        /// Requested size in bytes.
        bytes: usize,
        /// What the allocation was for.
        what: &'static str,
    },

    /// A field or the record count does not fit the format's u32 length prefix.
    #[error("Cannot encode {field}: length {len} exceeds the u32 limit of the corpus format.")]
    RecordTooLarge {
        /// Which field overflowed.
        field: &'static str,
        /// Its length.
        len: usize,
    },

    // === Kernel errors ===
    /// Two vectors handed to a checked kernel entry point differ in length.
    #[error(
        "Dimension mismatch: expected {expected}-dim vector, found {found}-dim. Use vectors from the same embedder."
    )]
    DimensionMismatch {
        /// Length of the first operand.
        expected: usize,
        /// Length of the second operand.
        found: usize,
    },

    // === I/O errors ===
    /// Wraps `std::io::Error` for file operations.
    #[error("I/O error: {0}. Check file permissions.")]
    Io(#[from] std::io::Error),

    // === Configuration errors ===
    /// A configuration value is invalid.
    #[error("Invalid config: {field} = \"{value}\": {reason}")]
    InvalidConfig {
        /// Which config field.
        field: String,
        /// The invalid value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },
}

/// Convenience alias used throughout the chunkvec crates.
pub type SearchResult<T> = Result<T, SearchError>;
