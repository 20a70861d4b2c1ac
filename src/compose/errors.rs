use crate::splice::SpliceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("template reference cycle involving '{key}'")]
    TemplateCycle { key: String },

    #[error("splice failed: {0}")]
    Splice(#[from] SpliceError),
}
