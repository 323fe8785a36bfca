//! Configuration file for the bioid CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bioid_recognizer::RecognizerConfig;
use serde::Deserialize;

/// One store configuration per modality.
///
/// Fields left out of a section keep that modality's defaults, so the face
/// and voice stores never share a file unless both paths are set to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub face: RecognizerConfig,
    pub voice: RecognizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            face: RecognizerConfig::face(),
            voice: RecognizerConfig::voice(),
        }
    }
}

/// On-disk layout of [`Config`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    face: Section,
    voice: Section,
}

/// A modality section as written; `None` means "keep the default".
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Section {
    store_path: Option<PathBuf>,
    match_threshold: Option<f32>,
    embedding_dimension: Option<usize>,
}

impl Section {
    fn apply(self, mut cfg: RecognizerConfig) -> RecognizerConfig {
        if let Some(path) = self.store_path {
            cfg.store_path = path;
        }
        if let Some(threshold) = self.match_threshold {
            cfg.match_threshold = threshold;
        }
        if self.embedding_dimension.is_some() {
            cfg.embedding_dimension = self.embedding_dimension;
        }
        cfg
    }
}

impl Config {
    /// Loads a YAML or JSON config file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let data =
            std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let file: ConfigFile = match ext {
            "json" => serde_json::from_slice(&data)?,
            "yaml" | "yml" => serde_yaml::from_slice(&data)?,
            _ => bail!("unsupported config format: {}", path.display()),
        };
        Ok(file.into())
    }
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        Self {
            face: file.face.apply(RecognizerConfig::face()),
            voice: file.voice.apply(RecognizerConfig::voice()),
        }
    }
}
