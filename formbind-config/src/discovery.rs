//! Configuration file discovery
//!
//! Looks for `formbind.{toml,yaml,yml,json}` in one directory. When several
//! exist they are all returned, in the order TOML, YAML, JSON, so JSON wins
//! when figment merges them.

use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Base name of configuration files.
pub const CONFIG_FILE_STEM: &str = "formbind";

const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// A discovered configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Full path to the configuration file
    pub path: PathBuf,
    /// Format detected from the extension
    pub format: ConfigFormat,
}

/// Configuration file format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Finds configuration files in a directory.
pub struct FileDiscovery {
    dir: PathBuf,
}

impl FileDiscovery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Discover files in merge order (lowest precedence first).
    pub fn discover_all(&self) -> Vec<ConfigFile> {
        let files: Vec<ConfigFile> = EXTENSIONS
            .iter()
            .filter_map(|ext| self.candidate(ext))
            .collect();

        debug!(
            dir = %self.dir.display(),
            found = files.len(),
            "discovered configuration files"
        );
        files
    }

    fn candidate(&self, ext: &str) -> Option<ConfigFile> {
        let path = self.dir.join(format!("{CONFIG_FILE_STEM}.{ext}"));
        if !is_file(&path) {
            return None;
        }
        trace!("Found config: {}", path.display());
        Some(ConfigFile {
            format: ConfigFormat::from_extension(ext)?,
            path,
        })
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
