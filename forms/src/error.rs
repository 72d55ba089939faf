use std::fmt;

pub type Result<T> = std::result::Result<T, FormError>;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid fragment")]
    Parse(#[from] ParseError),

    #[error("fragment {name:?} is not registered")]
    UnknownFragment { name: String },

    #[error("fragment {name:?} is already registered")]
    DuplicateFragment { name: String },

    #[error("expected exactly one fragment, found {found}")]
    FragmentCount { found: usize },

    #[error("{action} is only available when editing a document")]
    RequiresEditMode { action: &'static str },
}

/// Fragment syntax error, positions are 1-based
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}
