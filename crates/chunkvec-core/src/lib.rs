//! Shared types for the chunkvec exact nearest-neighbor engine.
//!
//! This crate defines the error type (`SearchError`), the search result type
//! (`Hit`), engine configuration and the tracing names used across every
//! other chunkvec crate. It has minimal external dependencies.

pub mod config;
pub mod error;
pub mod tracing_config;
pub mod types;

pub use config::{ChunkvecConfig, LoadConfig, SearchConfig, TrailingBytesPolicy};
pub use error::{SearchError, SearchResult};
pub use types::{DimensionCount, Hit, rank_hits};
