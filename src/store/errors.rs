use crate::splice::SpliceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("template root is not a directory: {path}")]
    TemplateRoot { path: PathBuf },

    #[error("failed to read template source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid variable file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("template reference cycle involving '{key}'")]
    TemplateCycle { key: String },

    #[error("splice failed during template finalization: {0}")]
    Splice(#[from] SpliceError),
}
