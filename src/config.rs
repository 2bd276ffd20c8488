//! Configuration for factcheck.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FACTCHECK_HOME, FACTCHECK_FACTS, LLM_MODEL, OLLAMA_HOST)
//! 2. Config file (.factcheck/config.yaml)
//! 3. Defaults (~/.factcheck)
//!
//! Config file discovery:
//! - Searches current directory and parents for .factcheck/config.yaml
//! - `paths.home` is relative to the .factcheck/ directory
//! - `paths.facts` is relative to the project root (parent of .factcheck/)

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::embedding::{DEFAULT_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL};
use crate::adapters::ollama::DEFAULT_MODEL;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".factcheck";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,
    #[serde(default)]
    pub retrieval: Option<RetrievalConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data directory (relative to .factcheck/)
    pub home: Option<String>,
    /// Fact corpus CSV (relative to project root)
    pub facts: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    pub program: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: Option<EmbeddingBackend>,
    pub model: Option<String>,
    pub url: Option<String>,
    pub dimension: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub k: Option<usize>,
    pub reuse_snapshot: Option<bool>,
}

/// Which embedding implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local hashed bag-of-words, no network
    #[default]
    Hashed,
    /// Ollama `/api/embed`
    Ollama,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hashed => "hashed",
            Self::Ollama => "ollama",
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Data directory (snapshot lives in `<home>/index`)
    pub home: PathBuf,
    /// Fact corpus CSV
    pub facts: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub reasoning: ReasoningSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningSettings {
    pub program: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            program: "ollama".to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 120,
        }
    }
}

impl ReasoningSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub url: String,
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashed,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            url: DEFAULT_OLLAMA_URL.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub k: usize,
    pub reuse_snapshot: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: 3,
            reuse_snapshot: false,
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge defaults, an optional config file and environment lookups
fn resolve(
    default_home: PathBuf,
    config_file: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let config_dir = config_file.as_deref().and_then(Path::parent);
    // Project root is the parent of .factcheck/
    let base_dir = config_dir.and_then(Path::parent);

    let home = if let Some(env_home) = env("FACTCHECK_HOME") {
        PathBuf::from(env_home)
    } else if let (Some(dir), Some(home)) = (config_dir, file.as_ref().and_then(|f| f.paths.home.as_deref())) {
        resolve_path(dir, home)
    } else {
        default_home
    };

    let facts = if let Some(env_facts) = env("FACTCHECK_FACTS") {
        PathBuf::from(env_facts)
    } else if let (Some(dir), Some(facts)) = (base_dir, file.as_ref().and_then(|f| f.paths.facts.as_deref())) {
        resolve_path(dir, facts)
    } else {
        home.join("facts.csv")
    };

    let mut reasoning = ReasoningSettings::default();
    let mut embedding = EmbeddingSettings::default();
    let mut retrieval = RetrievalSettings::default();

    if let Some(file) = file {
        if let Some(r) = file.reasoning {
            reasoning.program = r.program.unwrap_or(reasoning.program);
            reasoning.model = r.model.unwrap_or(reasoning.model);
            reasoning.timeout_seconds = r.timeout_seconds.unwrap_or(reasoning.timeout_seconds);
        }
        if let Some(e) = file.embedding {
            embedding.backend = e.backend.unwrap_or(embedding.backend);
            embedding.model = e.model.unwrap_or(embedding.model);
            embedding.url = e.url.unwrap_or(embedding.url);
            embedding.dimension = e.dimension.unwrap_or(embedding.dimension);
        }
        if let Some(r) = file.retrieval {
            retrieval.k = r.k.unwrap_or(retrieval.k);
            retrieval.reuse_snapshot = r.reuse_snapshot.unwrap_or(retrieval.reuse_snapshot);
        }
    }

    if let Some(model) = env("LLM_MODEL").filter(|m| !m.trim().is_empty()) {
        reasoning.model = model;
    }
    if let Some(url) = env("OLLAMA_HOST").filter(|u| !u.trim().is_empty()) {
        embedding.url = url;
    }

    if retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be at least 1");
    }
    if embedding.dimension == 0 {
        anyhow::bail!("embedding.dimension must be at least 1");
    }

    Ok(ResolvedConfig {
        home,
        facts,
        config_file,
        reasoning,
        embedding,
        retrieval,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let config_file = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_file(&cwd));

    resolve(default_home, config_file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(PathBuf::from("/data/.factcheck"), None, no_env).unwrap();

        assert_eq!(config.home, PathBuf::from("/data/.factcheck"));
        assert_eq!(config.facts, PathBuf::from("/data/.factcheck/facts.csv"));
        assert!(config.config_file.is_none());
        assert_eq!(config.reasoning, ReasoningSettings::default());
        assert_eq!(config.embedding.backend, EmbeddingBackend::Hashed);
        assert_eq!(config.retrieval.k, 3);
        assert!(!config.retrieval.reuse_snapshot);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1.0"
paths:
  home: ./
  facts: data/facts.csv
reasoning:
  model: llama3
  timeout_seconds: 30
embedding:
  backend: ollama
  dimension: 768
retrieval:
  k: 5
  reuse_snapshot: true
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.version, "1.0");
        assert_eq!(file.paths.facts.as_deref(), Some("data/facts.csv"));

        let config = resolve(PathBuf::from("/unused"), Some(path.clone()), no_env).unwrap();
        assert_eq!(config.home, resolve_path(path.parent().unwrap(), "./"));
        assert_eq!(config.facts, temp.path().join("data/facts.csv"));
        assert_eq!(config.reasoning.program, "ollama");
        assert_eq!(config.reasoning.model, "llama3");
        assert_eq!(config.reasoning.timeout(), Duration::from_secs(30));
        assert_eq!(config.embedding.backend, EmbeddingBackend::Ollama);
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.retrieval.k, 5);
        assert!(config.retrieval.reuse_snapshot);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "version: \"1.0\"\nreasoning:\n  model: llama3\n",
        );
        let env: HashMap<&str, &str> = [
            ("FACTCHECK_HOME", "/env/home"),
            ("FACTCHECK_FACTS", "/env/facts.csv"),
            ("LLM_MODEL", "phi3"),
            ("OLLAMA_HOST", "http://gpu:11434"),
        ]
        .into_iter()
        .collect();

        let config = resolve(PathBuf::from("/unused"), Some(path), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.home, PathBuf::from("/env/home"));
        assert_eq!(config.facts, PathBuf::from("/env/facts.csv"));
        assert_eq!(config.reasoning.model, "phi3");
        assert_eq!(config.embedding.url, "http://gpu:11434");
    }

    #[test]
    fn test_zero_k_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1.0\"\nretrieval:\n  k: 0\n");

        assert!(resolve(PathBuf::from("/unused"), Some(path), no_env).is_err());
    }

    #[test]
    fn test_unknown_backend_fails_to_parse() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1.0\"\nembedding:\n  backend: openai\n");

        assert!(load_config_file(&path).is_err());
    }

    #[test]
    fn test_find_config_file_walks_parents() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "version: \"1.0\"");
        let nested = temp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(path));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
