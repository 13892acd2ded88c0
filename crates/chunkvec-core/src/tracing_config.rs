//! Tracing target, span and field names used by chunkvec.
//!
//! The library emits `tracing` spans and events but never installs a
//! subscriber; consumers bring their own and can filter on the target prefix:
//!
//! ```text
//! RUST_LOG=chunkvec=debug
//! ```

/// Target prefix used by all chunkvec tracing spans and events.
pub const TARGET_PREFIX: &str = "chunkvec";

/// Standard tracing span names.
pub mod span_names {
    /// Reading and parsing a corpus file.
    pub const LOAD: &str = "chunkvec::load";
    /// One top-k scan over a loaded corpus.
    pub const SEARCH: &str = "chunkvec::search";
    /// Explicit release of a corpus.
    pub const CLOSE: &str = "chunkvec::close";
}

/// Span fields declared empty and recorded once the work finishes.
pub mod field_names {
    pub const RECORD_COUNT: &str = "record_count";
    pub const ARENA_BYTES: &str = "arena_bytes";
    pub const SCANNED: &str = "scanned";
    pub const ELIGIBLE: &str = "eligible";
    pub const RESULT_COUNT: &str = "result_count";
    pub const DURATION_US: &str = "duration_us";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_names_share_target_prefix() {
        for name in [span_names::LOAD, span_names::SEARCH, span_names::CLOSE] {
            assert!(
                name.starts_with(&format!("{TARGET_PREFIX}::")),
                "{name} should start with {TARGET_PREFIX}::"
            );
        }
    }

    #[test]
    fn field_names_are_distinct_identifiers() {
        let names = [
            field_names::RECORD_COUNT,
            field_names::ARENA_BYTES,
            field_names::SCANNED,
            field_names::ELIGIBLE,
            field_names::RESULT_COUNT,
            field_names::DURATION_US,
        ];
        for (i, name) in names.iter().enumerate() {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} must match the identifier declared on the span"
            );
            assert!(!names[i + 1..].contains(name), "{name} is repeated");
        }
    }
}
