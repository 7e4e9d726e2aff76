use thiserror::Error;

/// Errors produced while turning user input into domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    #[error("empty language code")]
    Empty,

    #[error("unknown language code: {0}")]
    Unknown(String),
}

impl LanguageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty_language",
            Self::Unknown(_) => "unknown_language",
        }
    }
}
