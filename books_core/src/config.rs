//! Library configuration

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where books live and which rule set / language to load
///
/// ```toml
/// books_path = "books"
/// system = "ose"
/// language = "es"
/// singular = "un"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_books_path")]
    pub books_path: PathBuf,
    /// Rule system, selects `<system>_<language>` under the books path
    #[serde(default = "default_system")]
    pub system: String,
    /// Play mode, selects `<mode>_<language>` under the books path
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Word substituted for `#` in table templates when the count is one
    #[serde(default = "default_singular")]
    pub singular: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            books_path: default_books_path(),
            system: default_system(),
            mode: default_mode(),
            language: default_language(),
            singular: default_singular(),
        }
    }
}

fn default_books_path() -> PathBuf {
    PathBuf::from("books")
}
fn default_system() -> String {
    "ve".to_string()
}
fn default_mode() -> String {
    "default".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_singular() -> String {
    "one".to_string()
}

impl LibraryConfig {
    /// Load configuration from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: LibraryConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Directories to load books from: the base path, then the
    /// system and mode directories for the active language if they exist
    pub fn library_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.books_path.clone()];
        for key in [&self.system, &self.mode] {
            let sub_path = self.books_path.join(format!("{}_{}", key, self.language));
            if sub_path.is_dir() {
                paths.push(sub_path);
            }
        }
        tracing::info!("Library paths: {:?}", paths);
        paths
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            singular: self.singular.clone(),
        }
    }
}

/// Settings applied while building books
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub singular: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            singular: default_singular(),
        }
    }
}
