//! Configuration for docsift.
//!
//! `PipelineOptions` is what the pipeline runs with. `Config` is the optional
//! on-disk layer (TOML, YAML or JSON) discovered through prefer and overlaid
//! onto the defaults before command-line flags are applied.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{DEFAULT_SAMPLE_SIZE, DEFAULT_TEXT_THRESHOLD};

/// Default maximum source file size (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Megabytes as given in config files and flags, saturating at `u64::MAX`.
pub fn mib_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

const DEFAULT_OUTPUT_SUBDIR: &str = "text";

/// Runtime options for a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Pages to process per document, counted from the first.
    pub pages: u32,
    /// Render resolution for OCR.
    pub dpi: u32,
    /// Write a `.txt` artifact per document.
    pub save_as_text_file: bool,
    /// Normalise text for downstream training.
    pub normalise: bool,
    pub max_file_size_bytes: u64,
    /// Documents processed concurrently.
    pub max_file_workers: usize,
    /// OCR engine calls allowed at once, across all documents.
    pub max_ocr_workers: usize,
    /// Limit per OCR engine call, measured from when it gets an OCR permit.
    pub task_timeout: Duration,
    /// Pages sampled by the classifier.
    pub sample_size: u32,
    /// Trimmed characters a sampled page needs to count as digital.
    pub digital_text_threshold: usize,
    /// Page tasks submitted per dispatch round. Capped at `max_ocr_workers`.
    pub ocr_batch_size: Option<usize>,
    /// Pause between dispatch rounds.
    pub batch_pause: Duration,
    /// Where text artifacts are written.
    pub output_dir: PathBuf,
    /// Tesseract language.
    pub language: String,
    /// Keep preprocessed page images here when set.
    pub save_images_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        // ~/Documents/docsift/text, falling back to home then the current dir
        let output_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docsift")
            .join(DEFAULT_OUTPUT_SUBDIR);

        Self {
            pages: 10,
            dpi: 300,
            save_as_text_file: false,
            normalise: false,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            max_file_workers: 2,
            max_ocr_workers: 2,
            task_timeout: Duration::from_secs(30),
            sample_size: DEFAULT_SAMPLE_SIZE,
            digital_text_threshold: DEFAULT_TEXT_THRESHOLD,
            ocr_batch_size: None,
            batch_pause: Duration::from_millis(100),
            output_dir,
            language: "eng".to_string(),
            save_images_dir: None,
        }
    }
}

impl PipelineOptions {
    /// Batch size actually used for dispatch.
    pub fn effective_ocr_batch_size(&self) -> usize {
        let max = self.max_ocr_workers.max(1);
        self.ocr_batch_size.unwrap_or(max).clamp(1, max)
    }
}

/// Settings file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_as_text_file: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalise: Option<bool>,
    /// Maximum source size in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ocr_workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digital_text_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_pause_ms: Option<u64>,
    /// Relative paths resolve against the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_images_dir: Option<String>,

    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to an empty config when nothing is found or parsing fails.
    pub async fn load() -> Self {
        match prefer::load("docsift").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file, by extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Directory relative paths resolve against: the config file's parent.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved against `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Overlay every value present in the file onto `options`.
    pub fn apply_to_options(&self, options: &mut PipelineOptions, base_dir: &Path) {
        if let Some(pages) = self.pages {
            options.pages = pages;
        }
        if let Some(dpi) = self.dpi {
            options.dpi = dpi;
        }
        if let Some(save) = self.save_as_text_file {
            options.save_as_text_file = save;
        }
        if let Some(normalise) = self.normalise {
            options.normalise = normalise;
        }
        if let Some(mb) = self.max_file_size_mb {
            options.max_file_size_bytes = mib_to_bytes(mb);
        }
        if let Some(workers) = self.max_file_workers {
            options.max_file_workers = workers;
        }
        if let Some(workers) = self.max_ocr_workers {
            options.max_ocr_workers = workers;
        }
        if let Some(secs) = self.task_timeout_secs {
            options.task_timeout = Duration::from_secs(secs);
        }
        if let Some(sample) = self.sample_size {
            options.sample_size = sample;
        }
        if let Some(threshold) = self.digital_text_threshold {
            options.digital_text_threshold = threshold;
        }
        if let Some(size) = self.ocr_batch_size {
            options.ocr_batch_size = Some(size);
        }
        if let Some(ms) = self.batch_pause_ms {
            options.batch_pause = Duration::from_millis(ms);
        }
        if let Some(ref dir) = self.output_dir {
            options.output_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref lang) = self.language {
            options.language = lang.clone();
        }
        if let Some(ref dir) = self.save_images_dir {
            options.save_images_dir = Some(self.resolve_path(dir, base_dir));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = PipelineOptions::default();
        assert_eq!(options.pages, 10);
        assert_eq!(options.dpi, 300);
        assert_eq!(options.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(options.max_file_workers, 2);
        assert_eq!(options.max_ocr_workers, 2);
        assert_eq!(options.task_timeout, Duration::from_secs(30));
        assert_eq!(options.sample_size, 3);
        assert_eq!(options.effective_ocr_batch_size(), 2);
        assert!(!options.save_as_text_file);
        assert!(!options.normalise);
    }

    #[test]
    fn test_batch_size_is_capped_by_ocr_workers() {
        let options = PipelineOptions {
            max_ocr_workers: 3,
            ocr_batch_size: Some(8),
            ..PipelineOptions::default()
        };
        assert_eq!(options.effective_ocr_batch_size(), 3);

        let options = PipelineOptions {
            ocr_batch_size: Some(0),
            ..PipelineOptions::default()
        };
        assert_eq!(options.effective_ocr_batch_size(), 1);
    }

    #[tokio::test]
    async fn test_load_toml_and_apply() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docsift.toml");
        std::fs::write(
            &path,
            "pages = 4\nmax_ocr_workers = 3\nnormalise = true\noutput_dir = \"out\"\ntask_timeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));

        let mut options = PipelineOptions::default();
        let base = config.base_dir().unwrap();
        config.apply_to_options(&mut options, &base);

        assert_eq!(options.pages, 4);
        assert_eq!(options.max_ocr_workers, 3);
        assert!(options.normalise);
        assert_eq!(options.task_timeout, Duration::from_secs(5));
        assert_eq!(options.output_dir, temp.path().join("out"));
        // untouched values keep their defaults
        assert_eq!(options.dpi, 300);
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let temp = TempDir::new().unwrap();
        let yaml = temp.path().join("docsift.yaml");
        std::fs::write(&yaml, "dpi: 200\nlanguage: deu\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.dpi, Some(200));
        assert_eq!(config.language.as_deref(), Some("deu"));

        let json = temp.path().join("docsift.json");
        std::fs::write(&json, r#"{"max_file_size_mb": 10, "batch_pause_ms": 0}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        let mut options = PipelineOptions::default();
        config.apply_to_options(&mut options, temp.path());
        assert_eq!(options.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(options.batch_pause, Duration::ZERO);
    }

    #[test]
    fn test_huge_size_limit_saturates() {
        let config = Config {
            max_file_size_mb: Some(u64::MAX / 2),
            ..Config::default()
        };
        let mut options = PipelineOptions::default();
        config.apply_to_options(&mut options, Path::new("/base"));
        assert_eq!(options.max_file_size_bytes, u64::MAX);
        assert_eq!(mib_to_bytes(3), 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_bad_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docsift.toml");
        std::fs::write(&path, "pages = \"many\"").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[test]
    fn test_resolve_path() {
        let config = Config::default();
        let base = Path::new("/base");
        assert_eq!(config.resolve_path("/abs/out", base), PathBuf::from("/abs/out"));
        assert_eq!(config.resolve_path("rel", base), PathBuf::from("/base/rel"));
        let home = config.resolve_path("~/x", base);
        assert!(!home.starts_with("~"));
    }
}
