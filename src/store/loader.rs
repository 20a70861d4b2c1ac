//! Template directory loading.
//!
//! `.html` files become template fragments keyed by their normalized
//! relative path; sibling `.json` files are flat key/value objects merged
//! verbatim into the default variable tier. Walk order is sorted so repeated
//! loads of the same tree are deterministic.

use crate::store::errors::StoreError;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

pub(crate) struct RawLoad {
    pub templates: Vec<(String, String)>,
    pub defaults: IndexMap<String, String>,
}

pub(crate) fn load_tree(root: &Path) -> Result<RawLoad, StoreError> {
    if !root.is_dir() {
        return Err(StoreError::TemplateRoot {
            path: root.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let mut templates = Vec::new();
    let mut defaults = IndexMap::new();

    for path in files {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("html") => {
                let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
                let rel = path.strip_prefix(root).unwrap_or(&path);
                templates.push((normalize_key(rel), text));
            }
            Some("json") => {
                let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
                let object: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(&text).map_err(|source| StoreError::Json {
                        path: path.clone(),
                        source,
                    })?;
                for (name, value) in object {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    defaults.insert(name, value);
                }
            }
            _ => {}
        }
    }

    info!(
        templates = templates.len(),
        defaults = defaults.len(),
        root = %root.display(),
        "loaded template tree"
    );

    Ok(RawLoad {
        templates,
        defaults,
    })
}

/// Normalized template key: extension stripped, path separators become `-`,
/// spaces become `_`, leading `-` stripped.
pub(crate) fn normalize_key(rel: &Path) -> String {
    let stem = rel.with_extension("");
    let mut key = String::new();
    for component in stem.components() {
        if !key.is_empty() {
            key.push('-');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key.replace(' ', "_").trim_start_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalization() {
        assert_eq!(normalize_key(Path::new("header.html")), "header");
        assert_eq!(normalize_key(Path::new("nav/top.html")), "nav-top");
        assert_eq!(
            normalize_key(Path::new("nav bar/top menu.html")),
            "nav_bar-top_menu"
        );
    }

    #[test]
    fn load_tree_reads_templates_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("partials")).unwrap();
        fs::write(dir.path().join("base.html"), "<main></main>").unwrap();
        fs::write(dir.path().join("partials/nav.html"), "<nav></nav>").unwrap();
        fs::write(
            dir.path().join("site.json"),
            r#"{"title": "My Site", "depth": 3}"#,
        )
        .unwrap();

        let raw = load_tree(dir.path()).unwrap();
        let keys: Vec<_> = raw.templates.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["base", "partials-nav"]);
        assert_eq!(raw.defaults.get("title").unwrap(), "My Site");
        // Non-string values merge as their compact JSON serialization
        assert_eq!(raw.defaults.get("depth").unwrap(), "3");
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_tree(&missing),
            Err(StoreError::TemplateRoot { .. })
        ));
    }

    #[test]
    fn bad_json_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("vars.json"), "{ not json").unwrap();
        match load_tree(dir.path()) {
            Err(StoreError::Json { path, .. }) => {
                assert!(path.ends_with("vars.json"));
            }
            Err(other) => panic!("expected Json error, got {other}"),
            Ok(_) => panic!("expected Json error"),
        }
    }
}
