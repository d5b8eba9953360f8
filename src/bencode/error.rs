use thiserror::Error;

#[derive(Debug, Error)]
pub enum BencodeError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    #[error("invalid string length at byte {0}")]
    InvalidStringLength(usize),

    #[error("unexpected character {found:?} at byte {pos}")]
    UnexpectedChar { found: char, pos: usize },

    #[error("dictionary key must be a byte string (byte {0})")]
    NonStringKey(usize),

    #[error("{0} trailing bytes after value")]
    TrailingData(usize),

    #[error("nesting too deep")]
    NestingTooDeep,

    #[error("missing key {0:?}")]
    MissingKey(String),

    #[error("key {key:?} has the wrong type, expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("expected a dictionary")]
    NotADict,
}
