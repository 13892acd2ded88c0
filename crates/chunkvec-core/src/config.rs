//! Engine configuration with `env > file > defaults` precedence.
//!
//! ```toml
//! [load]
//! max_corpus_bytes = 1073741824
//! trailing_bytes = "reject"
//!
//! [search]
//! default_k = 8
//! ```

use std::collections::HashMap;
use std::fs;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{SearchError, SearchResult};

pub const ENV_MAX_CORPUS_BYTES: &str = "CHUNKVEC_MAX_CORPUS_BYTES";
pub const ENV_TRAILING_BYTES: &str = "CHUNKVEC_TRAILING_BYTES";
pub const ENV_DEFAULT_K: &str = "CHUNKVEC_DEFAULT_K";

const DEFAULT_MAX_CORPUS_BYTES: u64 = 4 * 1024 * 1024 * 1024;
const MAX_DEFAULT_K: usize = 10_000;

/// What to do with bytes left over after the last declared record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrailingBytesPolicy {
    /// Accept the corpus and log a warning.
    #[default]
    Ignore,
    /// Fail the load with `SearchError::CorpusTrailingBytes`.
    Reject,
}

impl FromStr for TrailingBytesPolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ignore" => Ok(Self::Ignore),
            "reject" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadConfig {
    /// Files larger than this are refused before any allocation happens.
    pub max_corpus_bytes: u64,
    pub trailing_bytes: TrailingBytesPolicy,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_corpus_bytes: DEFAULT_MAX_CORPUS_BYTES,
            trailing_bytes: TrailingBytesPolicy::Ignore,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of hits returned by `search_default`.
    pub default_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_k: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChunkvecConfig {
    pub load: LoadConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
struct LoadConfigPatch {
    max_corpus_bytes: Option<u64>,
    trailing_bytes: Option<TrailingBytesPolicy>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
struct SearchConfigPatch {
    default_k: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
struct ChunkvecConfigPatch {
    load: Option<LoadConfigPatch>,
    search: Option<SearchConfigPatch>,
}

/// A resolved configuration plus the sources that contributed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoadResult {
    pub config: ChunkvecConfig,
    pub config_file_used: Option<PathBuf>,
    pub env_keys_used: Vec<String>,
}

/// Load config from an optional TOML file and environment overrides.
///
/// A missing file is not an error; defaults apply.
///
/// # Errors
///
/// Returns `SearchError::InvalidConfig` for parse/validation failures and
/// `SearchError::Io` if reading a present file fails.
pub fn load_from_sources<S>(
    config_file: Option<&Path>,
    env: &HashMap<String, String, S>,
) -> SearchResult<ConfigLoadResult>
where
    S: BuildHasher,
{
    let (toml_contents, config_file_used) = match config_file {
        Some(path) if path.exists() => (Some(fs::read_to_string(path)?), Some(path)),
        Some(_) | None => (None, None),
    };

    let mut loaded = load_from_str(toml_contents.as_deref(), env)?;
    loaded.config_file_used = config_file_used.map(Path::to_path_buf);
    emit_config_loaded(&loaded);
    Ok(loaded)
}

/// Load config from raw TOML and environment overrides (`env > file > defaults`).
///
/// # Errors
///
/// Returns `SearchError::InvalidConfig` when parsing or validation fails.
pub fn load_from_str<S>(
    config_toml: Option<&str>,
    env: &HashMap<String, String, S>,
) -> SearchResult<ConfigLoadResult>
where
    S: BuildHasher,
{
    let mut config = ChunkvecConfig::default();

    if let Some(config_toml) = config_toml {
        let patch: ChunkvecConfigPatch =
            toml::from_str(config_toml).map_err(|error| SearchError::InvalidConfig {
                field: "config_file".into(),
                value: "<toml>".into(),
                reason: error.to_string(),
            })?;
        apply_patch(&mut config, patch);
    }

    let env_keys_used = apply_env_overrides(&mut config, env)?;
    validate_config(&config)?;

    Ok(ConfigLoadResult {
        config,
        config_file_used: None,
        env_keys_used,
    })
}

pub fn emit_config_loaded(loaded: &ConfigLoadResult) {
    info!(
        target: "chunkvec::config",
        config_file_used = ?loaded.config_file_used,
        env_keys_used = ?loaded.env_keys_used,
        max_corpus_bytes = loaded.config.load.max_corpus_bytes,
        default_k = loaded.config.search.default_k,
        "chunkvec configuration loaded"
    );
}

fn apply_patch(config: &mut ChunkvecConfig, patch: ChunkvecConfigPatch) {
    if let Some(load) = patch.load {
        if let Some(max_corpus_bytes) = load.max_corpus_bytes {
            config.load.max_corpus_bytes = max_corpus_bytes;
        }
        if let Some(trailing_bytes) = load.trailing_bytes {
            config.load.trailing_bytes = trailing_bytes;
        }
    }

    if let Some(search) = patch.search {
        if let Some(default_k) = search.default_k {
            config.search.default_k = default_k;
        }
    }
}

fn apply_env_overrides(
    config: &mut ChunkvecConfig,
    env: &HashMap<String, String, impl BuildHasher>,
) -> SearchResult<Vec<String>> {
    let mut keys_used = Vec::new();

    if let Some(value) = env.get(ENV_MAX_CORPUS_BYTES) {
        config.load.max_corpus_bytes = parse_u64(value, "load.max_corpus_bytes")?;
        keys_used.push(ENV_MAX_CORPUS_BYTES.into());
    }

    if let Some(value) = env.get(ENV_TRAILING_BYTES) {
        config.load.trailing_bytes =
            TrailingBytesPolicy::from_str(value).map_err(|()| SearchError::InvalidConfig {
                field: "load.trailing_bytes".into(),
                value: value.clone(),
                reason: "expected ignore|reject".into(),
            })?;
        keys_used.push(ENV_TRAILING_BYTES.into());
    }

    if let Some(value) = env.get(ENV_DEFAULT_K) {
        config.search.default_k = parse_usize(value, "search.default_k")?;
        keys_used.push(ENV_DEFAULT_K.into());
    }

    Ok(keys_used)
}

fn validate_config(config: &ChunkvecConfig) -> SearchResult<()> {
    // The record count header alone is four bytes.
    if config.load.max_corpus_bytes < 4 {
        return Err(SearchError::InvalidConfig {
            field: "load.max_corpus_bytes".into(),
            value: config.load.max_corpus_bytes.to_string(),
            reason: "must be at least 4".into(),
        });
    }

    if config.search.default_k > MAX_DEFAULT_K {
        return Err(SearchError::InvalidConfig {
            field: "search.default_k".into(),
            value: config.search.default_k.to_string(),
            reason: format!("must be at most {MAX_DEFAULT_K}"),
        });
    }

    Ok(())
}

fn parse_usize(value: &str, field: &str) -> SearchResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| SearchError::InvalidConfig {
            field: field.into(),
            value: value.into(),
            reason: "expected unsigned integer".into(),
        })
}

fn parse_u64(value: &str, field: &str) -> SearchResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| SearchError::InvalidConfig {
            field: field.into(),
            value: value.into(),
            reason: "expected unsigned integer".into(),
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn defaults_apply_without_sources() {
        let loaded = load_from_str(None, &no_env()).expect("defaults");
        assert_eq!(loaded.config, ChunkvecConfig::default());
        assert_eq!(loaded.config.search.default_k, 10);
        assert_eq!(loaded.config.load.trailing_bytes, TrailingBytesPolicy::Ignore);
        assert!(loaded.env_keys_used.is_empty());
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = r#"
            [load]
            max_corpus_bytes = 2048
            trailing_bytes = "reject"

            [search]
            default_k = 3
        "#;
        let loaded = load_from_str(Some(toml), &no_env()).expect("load");
        assert_eq!(loaded.config.load.max_corpus_bytes, 2048);
        assert_eq!(loaded.config.load.trailing_bytes, TrailingBytesPolicy::Reject);
        assert_eq!(loaded.config.search.default_k, 3);
    }

    #[test]
    fn env_overrides_file() {
        let toml = "[search]\ndefault_k = 3\n";
        let env = HashMap::from([
            (ENV_DEFAULT_K.to_owned(), "17".to_owned()),
            (ENV_TRAILING_BYTES.to_owned(), "reject".to_owned()),
        ]);
        let loaded = load_from_str(Some(toml), &env).expect("load");
        assert_eq!(loaded.config.search.default_k, 17);
        assert_eq!(loaded.config.load.trailing_bytes, TrailingBytesPolicy::Reject);
        assert!(loaded.env_keys_used.contains(&ENV_DEFAULT_K.to_owned()));
        assert!(loaded.env_keys_used.contains(&ENV_TRAILING_BYTES.to_owned()));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_from_str(Some("[search]\nfast_only = true\n"), &no_env())
            .expect_err("unknown key must fail");
        assert!(matches!(err, SearchError::InvalidConfig { .. }), "{err:?}");
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let env = HashMap::from([(ENV_DEFAULT_K.to_owned(), "many".to_owned())]);
        let err = load_from_str(None, &env).expect_err("must fail");
        assert!(err.to_string().contains("search.default_k"));

        let env = HashMap::from([(ENV_TRAILING_BYTES.to_owned(), "maybe".to_owned())]);
        let err = load_from_str(None, &env).expect_err("must fail");
        assert!(err.to_string().contains("ignore|reject"));
    }

    #[test]
    fn tiny_corpus_ceiling_fails_validation() {
        let env = HashMap::from([(ENV_MAX_CORPUS_BYTES.to_owned(), "3".to_owned())]);
        let err = load_from_str(None, &env).expect_err("must fail");
        assert!(err.to_string().contains("load.max_corpus_bytes"));
    }

    #[test]
    fn oversized_default_k_fails_validation() {
        let err = load_from_str(Some("[search]\ndefault_k = 10001\n"), &no_env())
            .expect_err("must fail");
        assert!(err.to_string().contains("at most"));
    }

    #[test]
    fn load_from_sources_reads_file_and_tolerates_missing_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[search]\ndefault_k = 4").expect("write");

        let loaded = load_from_sources(Some(file.path()), &no_env()).expect("load");
        assert_eq!(loaded.config.search.default_k, 4);
        assert_eq!(loaded.config_file_used.as_deref(), Some(file.path()));

        let missing = file.path().with_extension("absent.toml");
        let loaded = load_from_sources(Some(&missing), &no_env()).expect("load");
        assert_eq!(loaded.config, ChunkvecConfig::default());
        assert!(loaded.config_file_used.is_none());
    }
}
