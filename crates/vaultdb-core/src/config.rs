//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys split on `__`, e.g.
//! `APP_EMBEDDING__ENDPOINT`). Every component receives its section of
//! [`Settings`] through its constructor.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the current directory for the environment named by `RUST_ENV`.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if fake_embeddings_forced() {
            settings.embedding.fake = true;
        }
        Ok(settings)
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1|true` switches to the deterministic embedder.
pub fn fake_embeddings_forced() -> bool {
    env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingConfig,
    pub search: SearchSettings,
    pub vault: VaultSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let e = &self.embedding;
        if e.model.trim().is_empty() {
            return Err(Error::InvalidConfig("embedding.model must not be empty".into()));
        }
        if !(e.endpoint.starts_with("http://") || e.endpoint.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!("embedding.endpoint must be an http(s) URL, got '{}'", e.endpoint)));
        }
        if e.timeout_ms == 0 {
            return Err(Error::InvalidConfig("embedding.timeout_ms must be at least 1".into()));
        }
        if e.max_attempts == 0 {
            return Err(Error::InvalidConfig("embedding.max_attempts must be at least 1".into()));
        }
        if e.fake && e.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be at least 1".into()));
        }
        if self.index.max_concurrent_documents == 0 {
            return Err(Error::InvalidConfig("index.max_concurrent_documents must be at least 1".into()));
        }
        if self.index.queue_capacity == 0 {
            return Err(Error::InvalidConfig("index.queue_capacity must be at least 1".into()));
        }
        if !(-1.0..=1.0).contains(&self.search.min_score) {
            return Err(Error::InvalidConfig(format!("search.min_score must be within [-1, 1], got {}", self.search.min_score)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_ms: 30_000,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            fake: false,
            fake_dim: 384,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub db_path: String,
    pub table: String,
    pub cache_table: String,
    pub cache_enabled: bool,
}

impl StoreSettings {
    pub fn db_path(&self) -> PathBuf {
        expand_path(&self.db_path)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: "~/.local/share/vaultdb/lancedb".to_string(),
            table: "entries".to_string(),
            cache_table: "embedding_cache".to_string(),
            cache_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Documents reindexed at the same time, bounding load on the embedder.
    pub max_concurrent_documents: usize,
    pub queue_capacity: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { max_concurrent_documents: 4, queue_capacity: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_k: usize,
    pub min_score: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_k: 10, min_score: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    pub root: String,
    pub extensions: Vec<String>,
}

impl VaultSettings {
    pub fn root(&self) -> PathBuf {
        expand_path(&self.root)
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self { root: ".".to_string(), extensions: vec!["md".to_string()] }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
