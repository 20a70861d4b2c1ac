//! Site configuration (`site.toml`).
//!
//! ```toml
//! [site]
//! templates_dir = "templates"
//! pages_dir = "pages"
//! out_dir = "dist"
//! ```
//!
//! Every field has a default, so a missing file means "build the
//! conventional layout in the current directory".

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read site config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site config TOML ({path}): {source}")]
    Toml {
        path: PathBuf,
        source: toml_edit::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteSection {
    pub templates_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            pages_dir: PathBuf::from("pages"),
            out_dir: PathBuf::from("dist"),
        }
    }
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SiteConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml_edit::de::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: SiteConfig = toml_edit::de::from_str("[site]\npages_dir = \"src\"").unwrap();
        assert_eq!(config.site.pages_dir, PathBuf::from("src"));
        assert_eq!(config.site.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.site.out_dir, PathBuf::from("dist"));
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config: SiteConfig = toml_edit::de::from_str("").unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_reports_missing_path() {
        assert!(matches!(
            load_from_path("/nonexistent/site.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
