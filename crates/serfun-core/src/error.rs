use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A conversion was attempted against an incompatible value variant.
    #[error("wrong variant: cannot use {actual} value as {attempted}")]
    WrongVariant {
        attempted: &'static str,
        actual: &'static str,
    },

    #[error("bad wiring: {0}")]
    BadWiring(String),

    #[error("compile error: {0}")]
    Compile(String),

    /// A factory rejected its argument list before any value flowed.
    #[error("argument error: {0}")]
    ArityOrType(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl Error {
    pub(crate) fn wrong(attempted: &'static str, actual: &'static str) -> Self {
        Error::WrongVariant { attempted, actual }
    }
}
