use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("empty compound token at position {position}")]
    EmptyToken { position: usize },

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unterminated '{open}' starting at position {position}")]
    Unterminated { open: char, position: usize },

    #[error("unknown pseudo-class ':{name}'")]
    UnknownPseudo { name: String },

    #[error("'!' must follow a compound token")]
    DanglingBang,
}
