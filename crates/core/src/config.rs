//! Configuration management for Snapseek.
//!
//! This module handles loading and merging configuration from multiple sources,
//! lowest precedence first:
//! - Built-in defaults
//! - Config file (`snapseek.yaml`, or the path given by `--config` / `SNAPSEEK_CONFIG`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "snapseek.yaml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    pub corpus: CorpusSettings,

    pub embedding: EmbeddingSettings,

    pub preprocess: PreprocessSettings,

    pub search: SearchSettings,

    pub build: BuildSettings,

    pub urls: UrlSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// Where the image corpus lives and how much of it to load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorpusSettings {
    pub directory: PathBuf,

    /// Maximum number of images to index; `None` means unbounded
    #[serde(default)]
    pub max_items: Option<usize>,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,
}

/// Embedding provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name, e.g. "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions (D)
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessSettings {
    /// Square edge length images are resized to
    pub image_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,

    /// Number of query vectors kept in the LRU cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildSettings {
    /// Log build progress every N items
    pub progress_interval: usize,
}

/// How corpus identifiers become externally reachable addresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UrlSettings {
    pub base_url: String,
    pub mount_path: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            max_items: None,
            recursive: false,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 512,
        }
    }
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self { image_size: 224 }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 20,
            cache_capacity: 1000,
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            progress_interval: 100,
        }
    }
}

impl Default for UrlSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            mount_path: "images".to_string(),
        }
    }
}

/// Full configuration file structure. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    corpus: Option<CorpusFile>,
    embedding: Option<EmbeddingFile>,
    preprocess: Option<PreprocessFile>,
    search: Option<SearchFile>,
    build: Option<BuildFile>,
    urls: Option<UrlFile>,
    logging: Option<LoggingFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusFile {
    directory: Option<PathBuf>,
    max_items: Option<usize>,
    recursive: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingFile {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreprocessFile {
    image_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFile {
    default_top_k: Option<usize>,
    max_top_k: Option<usize>,
    cache_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildFile {
    progress_interval: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UrlFile {
    base_url: Option<String>,
    mount_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingFile {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            corpus: CorpusSettings::default(),
            embedding: EmbeddingSettings::default(),
            preprocess: PreprocessSettings::default(),
            search: SearchSettings::default(),
            build: BuildSettings::default(),
            urls: UrlSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and process environment.
    ///
    /// Environment variables (legacy aliases in parentheses):
    /// - `SNAPSEEK_CONFIG`: Path to config file
    /// - `SNAPSEEK_CORPUS_DIR` (`IMAGE_DATA_DIR`): Corpus directory
    /// - `SNAPSEEK_MAX_ITEMS`: Maximum images to index
    /// - `SNAPSEEK_PROVIDER`: Embedding provider
    /// - `SNAPSEEK_MODEL` (`MODEL_NAME`): Embedding model identifier
    /// - `SNAPSEEK_EMBEDDING_DIM`: Embedding dimensions
    /// - `SNAPSEEK_IMAGE_SIZE` (`IMAGE_SIZE`): Preprocessing size
    /// - `SNAPSEEK_TOP_K` (`TOP_K`): Default result count
    /// - `SNAPSEEK_CACHE_CAPACITY`: Query cache size
    /// - `SNAPSEEK_BASE_URL` (`BACKEND_URL`): URL prefix for results
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use snapseek_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Corpus: {:?}", config.corpus.directory);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(config_file) = lookup("SNAPSEEK_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        config.apply_env(&lookup)?;

        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|key| lookup(key));

        if let Some(dir) = first(&["SNAPSEEK_CORPUS_DIR", "IMAGE_DATA_DIR"]) {
            self.corpus.directory = PathBuf::from(dir);
        }
        if let Some(max) = first(&["SNAPSEEK_MAX_ITEMS"]) {
            self.corpus.max_items = Some(parse_number("SNAPSEEK_MAX_ITEMS", &max)?);
        }
        if let Some(provider) = first(&["SNAPSEEK_PROVIDER"]) {
            self.embedding.provider = provider;
        }
        if let Some(model) = first(&["SNAPSEEK_MODEL", "MODEL_NAME"]) {
            self.embedding.model = model;
        }
        if let Some(dim) = first(&["SNAPSEEK_EMBEDDING_DIM"]) {
            self.embedding.dimensions = parse_number("SNAPSEEK_EMBEDDING_DIM", &dim)?;
        }
        if let Some(size) = first(&["SNAPSEEK_IMAGE_SIZE", "IMAGE_SIZE"]) {
            self.preprocess.image_size = parse_number("SNAPSEEK_IMAGE_SIZE", &size)?;
        }
        if let Some(k) = first(&["SNAPSEEK_TOP_K", "TOP_K"]) {
            self.search.default_top_k = parse_number("SNAPSEEK_TOP_K", &k)?;
        }
        if let Some(capacity) = first(&["SNAPSEEK_CACHE_CAPACITY"]) {
            self.search.cache_capacity = parse_number("SNAPSEEK_CACHE_CAPACITY", &capacity)?;
        }
        if let Some(base_url) = first(&["SNAPSEEK_BASE_URL", "BACKEND_URL"]) {
            self.urls.base_url = base_url;
        }

        self.log_level = lookup("RUST_LOG").or(self.log_level.take());

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(corpus) = file.corpus {
            if let Some(directory) = corpus.directory {
                result.corpus.directory = directory;
            }
            if corpus.max_items.is_some() {
                result.corpus.max_items = corpus.max_items;
            }
            if let Some(recursive) = corpus.recursive {
                result.corpus.recursive = recursive;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
        }

        if let Some(image_size) = file.preprocess.and_then(|p| p.image_size) {
            result.preprocess.image_size = image_size;
        }

        if let Some(search) = file.search {
            if let Some(k) = search.default_top_k {
                result.search.default_top_k = k;
            }
            if let Some(max) = search.max_top_k {
                result.search.max_top_k = max;
            }
            if let Some(capacity) = search.cache_capacity {
                result.search.cache_capacity = capacity;
            }
        }

        if let Some(interval) = file.build.and_then(|b| b.progress_interval) {
            result.build.progress_interval = interval;
        }

        if let Some(urls) = file.urls {
            if let Some(base_url) = urls.base_url {
                result.urls.base_url = base_url;
            }
            if let Some(mount_path) = urls.mount_path {
                result.urls.mount_path = mount_path;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        corpus_dir: Option<PathBuf>,
        max_items: Option<usize>,
        base_url: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(corpus_dir) = corpus_dir {
            self.corpus.directory = corpus_dir;
        }

        if max_items.is_some() {
            self.corpus.max_items = max_items;
        }

        if let Some(base_url) = base_url {
            self.urls.base_url = base_url;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Validate the numeric bounds the engine relies on.
    pub fn validate(&self) -> AppResult<()> {
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }

        if self.preprocess.image_size == 0 {
            return Err(AppError::Config(
                "preprocess.imageSize must be greater than 0".to_string(),
            ));
        }

        if self.search.cache_capacity == 0 {
            return Err(AppError::Config(
                "search.cacheCapacity must be greater than 0".to_string(),
            ));
        }

        if self.search.default_top_k == 0 || self.search.default_top_k > self.search.max_top_k {
            return Err(AppError::Config(format!(
                "search.defaultTopK must be within 1..={}, got {}",
                self.search.max_top_k, self.search.default_top_k
            )));
        }

        if self.build.progress_interval == 0 {
            return Err(AppError::Config(
                "build.progressInterval must be greater than 0".to_string(),
            ));
        }

        if self.urls.base_url.trim().is_empty() {
            return Err(AppError::Config("urls.baseUrl must not be empty".to_string()));
        }

        Ok(())
    }
}

fn parse_number<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid value for {}: {:?} ({})", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.corpus.directory, PathBuf::from("data"));
        assert_eq!(config.corpus.max_items, None);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.preprocess.image_size, 224);
        assert_eq!(config.search.default_top_k, 5);
        assert_eq!(config.search.max_top_k, 20);
        assert_eq!(config.search.cache_capacity, 1000);
        assert_eq!(config.build.progress_interval, 100);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.yaml");
        let missing = missing.to_string_lossy().to_string();
        let lookup = env(&[("SNAPSEEK_CONFIG", missing.as_str())]);

        assert!(matches!(
            AppConfig::load_with(lookup),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_env_values_applied() {
        let mut config = AppConfig::default();
        let lookup = env(&[
            ("IMAGE_DATA_DIR", "/srv/images"),
            ("SNAPSEEK_MAX_ITEMS", "50"),
            ("TOP_K", "3"),
            ("BACKEND_URL", "https://img.example.com"),
            ("NO_COLOR", "1"),
        ]);
        config.apply_env(&lookup).unwrap();

        assert_eq!(config.corpus.directory, PathBuf::from("/srv/images"));
        assert_eq!(config.corpus.max_items, Some(50));
        assert_eq!(config.search.default_top_k, 3);
        assert_eq!(config.urls.base_url, "https://img.example.com");
        assert!(config.no_color);
    }

    #[test]
    fn test_prefixed_env_wins_over_alias() {
        let mut config = AppConfig::default();
        let lookup = env(&[
            ("SNAPSEEK_CORPUS_DIR", "/primary"),
            ("IMAGE_DATA_DIR", "/legacy"),
        ]);
        config.apply_env(&lookup).unwrap();
        assert_eq!(config.corpus.directory, PathBuf::from("/primary"));
    }

    #[test]
    fn test_invalid_numeric_env() {
        let mut config = AppConfig::default();
        let lookup = env(&[("SNAPSEEK_CACHE_CAPACITY", "lots")]);
        let result = config.apply_env(&lookup);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_yaml_then_env_layering() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapseek.yaml");
        std::fs::write(
            &path,
            r#"
corpus:
  directory: /from/yaml
  maxItems: 10
embedding:
  dimensions: 64
search:
  defaultTopK: 4
  cacheCapacity: 16
urls:
  baseUrl: http://yaml.local
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let path_str = path.to_string_lossy().to_string();
        let lookup = env(&[
            ("SNAPSEEK_CONFIG", path_str.as_str()),
            ("SNAPSEEK_MAX_ITEMS", "25"),
        ]);
        let config = AppConfig::load_with(lookup).unwrap();

        assert_eq!(config.corpus.directory, PathBuf::from("/from/yaml"));
        assert_eq!(config.corpus.max_items, Some(25));
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.search.default_top_k, 4);
        assert_eq!(config.search.cache_capacity, 16);
        assert_eq!(config.urls.base_url, "http://yaml.local");
        assert_eq!(config.log_level, Some("warn".to_string()));
        assert!(config.no_color);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some(PathBuf::from("/cli/images")),
            Some(7),
            Some("http://cli.local".to_string()),
            None,
            true,
            false,
            false,
        );

        assert_eq!(overridden.corpus.directory, PathBuf::from("/cli/images"));
        assert_eq!(overridden.corpus.max_items, Some(7));
        assert_eq!(overridden.urls.base_url, "http://cli.local");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut config = AppConfig::default();
        config.search.default_top_k = 30;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.search.cache_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.urls.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
